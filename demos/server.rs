//! Demo server: loads the API config (REST_CONFIG_PATH, default demos/sample/api.json),
//! seeds an in-memory store with sample magazines and serves the façade.

use rest_conventions::config::CONFIG_PATH_ENV;
use rest_conventions::{app, load_from_env, load_from_path, resolve, AppState, MemoryStore};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "demos/sample/api.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rest_conventions=info,tower_http=info")),
        )
        .init();

    let config = if std::env::var_os(CONFIG_PATH_ENV).is_some() {
        load_from_env().await?
    } else {
        load_from_path(DEFAULT_CONFIG).await?
    };
    let model = resolve(&config)?;

    let store = MemoryStore::new();
    let magazines = (1..=123).map(|i| {
        json!({
            "title": format!("Magazine {}", i),
            "year": 1990 + (i % 30),
            "tags": [{ "id": "1", "name": "print" }]
        })
    });
    store.seed(
        "magazines",
        magazines.filter_map(|v| v.as_object().cloned()),
    )?;

    let state = AppState::new(model, Arc::new(store));
    let addr = std::env::var("REST_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
