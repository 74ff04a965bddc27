use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use rest_conventions::{app, load_from_str, resolve, AppState, DataStore, MemoryStore, Record, Scope, StoreError};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const CONFIG: &str = r#"{
    "versions": [1, 2],
    "current_version": 2,
    "docs_url": "https://docs.example.org",
    "resources": [
        { "name": "magazines", "properties": ["title", "year", "tags"], "labels": ["tags"],
          "validation": { "title": { "required": true } } },
        { "name": "articles", "properties": ["title", "author"],
          "parent": { "resource": "magazines", "key": "magazine_id" } },
        { "name": "users", "operations": ["list", "read"] }
    ]
}"#;

fn record(v: Value) -> Record {
    v.as_object().cloned().expect("object")
}

fn app_from(config: &str, store: Arc<dyn DataStore>) -> Router {
    let model = resolve(&load_from_str(config).unwrap()).unwrap();
    app(AppState::new(model, store))
}

fn app_with(store: Arc<dyn DataStore>) -> Router {
    app_from(CONFIG, store)
}

fn seeded(n: usize) -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store
        .seed("magazines", (0..n).map(|i| record(json!({ "title": format!("Magazine {}", i), "year": 2000 + i }))))
        .unwrap();
    (app_with(store.clone()), store)
}

struct Reply {
    status: StatusCode,
    content_type: String,
    text: String,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap_or_else(|e| panic!("not JSON ({e}): {}", self.text))
    }
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Reply {
    let body = match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
    };
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    Reply {
        status,
        content_type,
        text: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

fn assert_error(reply: &Reply, status: u16, code: u64) {
    assert_eq!(reply.status.as_u16(), status, "{}", reply.text);
    let v = reply.json();
    assert_eq!(v["status"], status);
    assert_eq!(v["errorCode"], code);
    assert!(v["developerMessage"].as_str().is_some_and(|s| !s.is_empty()));
    assert_eq!(v["moreInfo"], format!("https://docs.example.org/errors/{}", code));
}

#[tokio::test]
async fn default_envelope_for_json_suffix() {
    let (app, _) = seeded(123);
    let reply = send(&app, Method::GET, "/api/v1/magazines.json", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.content_type.starts_with("application/json"));
    let v = reply.json();
    assert_eq!(v["metadata"]["resultset"], json!({ "count": 123, "offset": 0, "limit": 10 }));
    assert_eq!(v["results"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn pagination_window_over_227_records() {
    let (app, _) = seeded(227);
    let reply = send(&app, Method::GET, "/api/v1/magazines?limit=10&offset=25", None).await;
    let v = reply.json();
    assert_eq!(v["metadata"]["resultset"], json!({ "count": 227, "offset": 25, "limit": 10 }));
    let results = v["results"].as_array().unwrap();
    assert_eq!(results.len(), 10);
    assert_eq!(results[0]["title"], "Magazine 25");
}

#[tokio::test]
async fn count_never_below_results_length() {
    let (app, _) = seeded(37);
    for (limit, offset) in [(10, 0), (10, 30), (100, 0), (5, 36), (10, 37), (10, 500)] {
        let reply = send(&app, Method::GET, &format!("/api/v1/magazines?limit={limit}&offset={offset}"), None).await;
        let v = reply.json();
        let count = v["metadata"]["resultset"]["count"].as_u64().unwrap();
        let len = v["results"].as_array().unwrap().len() as u64;
        assert_eq!(count, 37);
        assert!(count >= len);
        assert_eq!(len, (limit as u64).min(37u64.saturating_sub(offset as u64)));
    }
}

#[tokio::test]
async fn empty_collection_still_has_resultset() {
    let app = app_with(Arc::new(MemoryStore::new()));
    let v = send(&app, Method::GET, "/api/v1/magazines", None).await.json();
    assert_eq!(v, json!({ "metadata": { "resultset": { "count": 0, "offset": 0, "limit": 10 } }, "results": [] }));
}

#[tokio::test]
async fn unknown_identifier_is_a_client_error() {
    let (app, _) = seeded(3);
    let reply = send(&app, Method::GET, "/api/v1/magazines/999", None).await;
    assert_error(&reply, 400, 2002);
    assert_eq!(reply.json()["userMessage"], "The requested item could not be found.");
}

#[tokio::test]
async fn create_then_read_returns_every_property() {
    let app = app_with(Arc::new(MemoryStore::new()));
    let body = json!({ "title": "Wired", "year": 1993, "tags": [{ "id": 1, "name": "tech" }] });
    let created = send(&app, Method::POST, "/api/v2/magazines", Some(body)).await;
    assert_eq!(created.status, StatusCode::OK, "{}", created.text);
    let id = created.json()["id"].as_str().unwrap().to_string();

    let read = send(&app, Method::GET, &format!("/api/v2/magazines/{id}"), None).await.json();
    assert_eq!(read["id"], id);
    assert_eq!(read["title"], "Wired");
    assert_eq!(read["year"], 1993);
    assert_eq!(read["tags"], json!([{ "id": "1", "name": "tech" }]));
}

#[tokio::test]
async fn tags_are_never_object_keys() {
    let app = app_with(Arc::new(MemoryStore::new()));
    let body = json!({ "title": "Byte", "tags": { "10": "computing", "11": "retro" } });
    let created = send(&app, Method::POST, "/api/v1/magazines", Some(body)).await.json();
    assert_eq!(
        created["tags"],
        json!([{ "id": "10", "name": "computing" }, { "id": "11", "name": "retro" }])
    );
    let listed = send(&app, Method::GET, "/api/v1/magazines", None).await.json();
    assert!(listed["results"][0]["tags"].is_array());

    let bad = send(&app, Method::POST, "/api/v1/magazines", Some(json!({ "title": "x", "tags": "news" }))).await;
    assert_error(&bad, 400, 2001);
}

#[tokio::test]
async fn repeated_put_is_idempotent() {
    let app = app_with(Arc::new(MemoryStore::new()));
    let body = json!({ "title": "Omni", "year": 1978 });
    let first = send(&app, Method::PUT, "/api/v1/magazines/omni", Some(body.clone())).await;
    assert_eq!(first.status, StatusCode::OK, "{}", first.text);
    let second = send(&app, Method::PUT, "/api/v1/magazines/omni", Some(body)).await;
    assert_eq!(first.json(), second.json());
    let read = send(&app, Method::GET, "/api/v1/magazines/omni", None).await.json();
    assert_eq!(read, json!({ "id": "omni", "title": "Omni", "year": 1978 }));
}

#[tokio::test]
async fn post_article_array_under_magazine() {
    let store = Arc::new(MemoryStore::new());
    store.insert("magazines", "1234", record(json!({ "title": "Wired" }))).await.unwrap();
    let app = app_with(store);

    let body = json!([{ "title": "Sample Title", "author": "Sample Author" }]);
    let reply = send(&app, Method::POST, "/api/v1/magazines/1234/articles", Some(body)).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.text);
    let v = reply.json();
    let article = &v["results"][0];
    let id = article["id"].as_str().unwrap();
    assert!(!id.is_empty());
    assert_eq!(article["magazine_id"], "1234");

    let scoped = send(&app, Method::GET, "/api/v1/magazines/1234/articles", None).await.json();
    assert_eq!(scoped["metadata"]["resultset"]["count"], 1);

    let canonical = send(&app, Method::GET, &format!("/api/v1/articles/{id}"), None).await.json();
    assert_eq!(canonical["title"], "Sample Title");
}

#[tokio::test]
async fn field_projection_keeps_id() {
    let (app, _) = seeded(2);
    let v = send(&app, Method::GET, "/api/v1/magazines/1?fields=year", None).await.json();
    assert_eq!(v, json!({ "id": "1", "year": 2000 }));
}

#[tokio::test]
async fn delete_then_read_is_not_found() {
    let (app, _) = seeded(2);
    let deleted = send(&app, Method::DELETE, "/api/v1/magazines/2", None).await;
    assert_eq!(deleted.json(), json!({ "id": "2", "deleted": true }));
    let again = send(&app, Method::DELETE, "/api/v1/magazines/2", None).await;
    assert_error(&again, 400, 2002);
}

#[tokio::test]
async fn csv_and_html_representations() {
    let (app, _) = seeded(2);
    let csv = send(&app, Method::GET, "/api/v1/magazines.csv", None).await;
    assert_eq!(csv.status, StatusCode::OK);
    assert!(csv.content_type.starts_with("text/csv"));
    assert!(csv.text.starts_with("id,title,year\r\n1,Magazine 0,2000\r\n"));

    let html = send(&app, Method::GET, "/api/v1/magazines/1.html", None).await;
    assert!(html.content_type.starts_with("text/html"));
    assert!(html.text.contains("<td>Magazine 0</td>"));
}

#[tokio::test]
async fn client_errors_use_the_error_payload() {
    let (app, _) = seeded(1);
    assert_error(&send(&app, Method::POST, "/api/v1/magazines/1", Some(json!({}))).await, 400, 1007);
    assert_error(&send(&app, Method::PATCH, "/api/v1/magazines/1", Some(json!({}))).await, 400, 1007);
    assert_error(&send(&app, Method::DELETE, "/api/v1/users/1", None).await, 400, 1007);
    assert_error(&send(&app, Method::GET, "/api/v1/magazines/1/articles/2", None).await, 400, 1003);
    assert_error(&send(&app, Method::GET, "/api/v1/widgets", None).await, 400, 1004);
    assert_error(&send(&app, Method::GET, "/api/v7/magazines", None).await, 400, 1005);
    assert_error(&send(&app, Method::GET, "/api/v1/magazines.xml", None).await, 400, 1006);
    assert_error(&send(&app, Method::GET, "/api/v1/magazines?limit=abc", None).await, 400, 1002);
    assert_error(&send(&app, Method::GET, "/elsewhere", None).await, 400, 1004);
}

#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let (app, _) = seeded(0);
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/magazines")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let empty = send(&app, Method::POST, "/api/v1/magazines", None).await;
    assert_error(&empty, 400, 1001);
}

struct FailingStore;

#[async_trait]
impl DataStore for FailingStore {
    async fn list(&self, _: &str, _: &[(String, String)], _: u32, _: u32) -> Result<(Vec<Record>, u64), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn read(&self, _: &str, _: &str) -> Result<Record, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn create(&self, _: &str, _: Record) -> Result<String, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn insert(&self, _: &str, _: &str, _: Record) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn update(&self, _: &str, _: &str, _: Record) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn delete(&self, _: &str, _: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn replace_all(&self, _: &str, _: Option<Scope<'_>>, _: Vec<Record>) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn delete_all(&self, _: &str, _: Option<Scope<'_>>) -> Result<u64, StoreError> {
        panic!("delete_all exploded")
    }
}

#[tokio::test]
async fn collaborator_failures_are_server_errors() {
    let app = app_with(Arc::new(FailingStore));
    let reply = send(&app, Method::GET, "/api/v1/magazines", None).await;
    assert_error(&reply, 500, 5001);
    assert!(reply.json()["userMessage"].as_str().is_some());
    assert_error(&send(&app, Method::PUT, "/api/v1/magazines/1", Some(json!({ "title": "t" }))).await, 500, 5001);
}

#[tokio::test]
async fn panics_become_internal_errors() {
    let app = app_with(Arc::new(FailingStore));
    let reply = send(&app, Method::DELETE, "/api/v1/magazines", None).await;
    assert_error(&reply, 500, 5003);
}

#[tokio::test]
async fn health_and_version() {
    let (app, _) = seeded(0);
    let health = send(&app, Method::GET, "/health", None).await.json();
    assert_eq!(health, json!({ "status": "ok" }));
    let version = send(&app, Method::GET, "/version", None).await.json();
    assert_eq!(version["api_versions"], json!([1, 2]));
    assert_eq!(version["current_version"], 2);
}

#[tokio::test]
async fn common_routes_reject_other_verbs_with_payload() {
    let (app, _) = seeded(0);
    for (method, uri) in [(Method::POST, "/health"), (Method::DELETE, "/version"), (Method::PUT, "/info")] {
        assert_error(&send(&app, method, uri, Some(json!({}))).await, 400, 1007);
    }
}

#[tokio::test]
async fn version_has_a_single_spelling() {
    let (app, _) = seeded(1);
    assert_eq!(send(&app, Method::GET, "/api/v1/magazines", None).await.status, StatusCode::OK);
    assert_error(&send(&app, Method::GET, "/api/v+1/magazines", None).await, 400, 1005);
    assert_error(&send(&app, Method::GET, "/api/v01/magazines", None).await, 400, 1005);
}

#[tokio::test]
async fn encoded_identifiers_round_trip() {
    let app = app_with(Arc::new(MemoryStore::new()));
    let body = json!([{ "id": "a b", "title": "Spaced" }, { "id": "café", "title": "Accent" }]);
    let replaced = send(&app, Method::PUT, "/api/v1/magazines", Some(body)).await;
    assert_eq!(replaced.status, StatusCode::OK, "{}", replaced.text);

    let read = send(&app, Method::GET, "/api/v1/magazines/a%20b", None).await;
    assert_eq!(read.status, StatusCode::OK, "{}", read.text);
    assert_eq!(read.json()["title"], "Spaced");
    let read = send(&app, Method::GET, "/api/v1/magazines/caf%C3%A9", None).await.json();
    assert_eq!(read["id"], "café");

    let put = send(&app, Method::PUT, "/api/v1/magazines/one%20two", Some(json!({ "title": "Two" }))).await.json();
    assert_eq!(put["id"], "one two");

    for bad in ["x/y", "feed.csv"] {
        let reply = send(&app, Method::PUT, "/api/v1/magazines", Some(json!([{ "id": bad, "title": "t" }]))).await;
        assert_error(&reply, 400, 1008);
    }
    assert_error(&send(&app, Method::GET, "/api/v1/magazines/x%2Fy", None).await, 400, 1008);
}

#[tokio::test]
async fn top_level_article_writes_need_their_magazine() {
    let store = Arc::new(MemoryStore::new());
    store.insert("magazines", "1", record(json!({ "title": "Wired" }))).await.unwrap();
    let app = app_with(store);

    let orphan = send(&app, Method::POST, "/api/v1/articles", Some(json!({ "title": "x" }))).await;
    assert_error(&orphan, 400, 2001);
    let dangling = send(&app, Method::PUT, "/api/v1/articles/9", Some(json!({ "magazine_id": "nope" }))).await;
    assert_error(&dangling, 400, 2001);

    let linked = send(&app, Method::POST, "/api/v1/articles", Some(json!({ "title": "x", "magazine_id": "1" }))).await;
    assert_eq!(linked.status, StatusCode::OK, "{}", linked.text);
    let scoped = send(&app, Method::GET, "/api/v1/magazines/1/articles", None).await.json();
    assert_eq!(scoped["metadata"]["resultset"]["count"], 1);
}

#[tokio::test]
async fn replace_all_under_a_magazine_keeps_other_magazines() {
    let store = Arc::new(MemoryStore::new());
    for id in ["1", "2"] {
        store.insert("magazines", id, record(json!({ "title": format!("M{id}") }))).await.unwrap();
    }
    let app = app_with(store);
    let two = json!([{ "title": "a" }, { "title": "b" }]);
    assert_eq!(send(&app, Method::POST, "/api/v1/magazines/1/articles", Some(two)).await.status, StatusCode::OK);
    let one = json!([{ "title": "c" }]);
    assert_eq!(send(&app, Method::POST, "/api/v1/magazines/2/articles", Some(one)).await.status, StatusCode::OK);

    let reply = send(&app, Method::PUT, "/api/v1/magazines/1/articles", Some(json!([{ "title": "fresh" }]))).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.text);
    let v = reply.json();
    assert_eq!(v["metadata"]["resultset"]["count"], 1);
    assert_eq!(v["results"][0]["title"], "fresh");
    assert_eq!(v["results"][0]["magazine_id"], "1");

    let other = send(&app, Method::GET, "/api/v1/magazines/2/articles", None).await.json();
    assert_eq!(other["metadata"]["resultset"]["count"], 1);
    assert_eq!(other["results"][0]["title"], "c");
    let all = send(&app, Method::GET, "/api/v1/articles", None).await.json();
    assert_eq!(all["metadata"]["resultset"]["count"], 2);
}

const SMALL_LIMITS: &str = r#"{
    "docs_url": "https://docs.example.org",
    "limits": { "max_batch": 2, "max_body_bytes": 512 },
    "resources": [{ "name": "magazines", "properties": ["title"] }]
}"#;

#[tokio::test]
async fn oversized_bodies_and_batches_are_client_errors() {
    let app = app_from(SMALL_LIMITS, Arc::new(MemoryStore::new()));

    let big = json!({ "title": "x".repeat(1024) });
    assert_error(&send(&app, Method::POST, "/api/v1/magazines", Some(big)).await, 400, 1001);

    let three = json!([{ "title": "a" }, { "title": "b" }, { "title": "c" }]);
    assert_error(&send(&app, Method::POST, "/api/v1/magazines", Some(three.clone())).await, 400, 1001);
    assert_error(&send(&app, Method::PUT, "/api/v1/magazines", Some(three)).await, 400, 1001);

    let two = json!([{ "title": "a" }, { "title": "b" }]);
    let ok = send(&app, Method::POST, "/api/v1/magazines", Some(two)).await;
    assert_eq!(ok.status, StatusCode::OK, "{}", ok.text);
    let listed = send(&app, Method::GET, "/api/v1/magazines", None).await.json();
    assert_eq!(listed["metadata"]["resultset"]["count"], 2);
}
