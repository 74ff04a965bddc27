//! Common routes: health, version, info.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{OriginalUri, State},
    http::Method,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn version(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "api_versions": state.model.versions.iter().collect::<Vec<_>>(),
        "current_version": state.model.current_version,
    }))
}

/// Other verbs on a known path get the error payload instead of a bare 405.
async fn method_not_allowed(State(state): State<AppState>, method: Method, OriginalUri(uri): OriginalUri) -> Response {
    AppError::MethodNotSupported {
        method: method.to_string(),
        target: uri.path().to_string(),
    }
    .into_response_with_docs(&state.model.docs_url)
}

/// Common routes: GET /health, GET /version, GET /info.
pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/info", get(version))
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
}
