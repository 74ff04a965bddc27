//! Resource routes: every method under `{base_path}/*path` goes through the resource router.

use crate::handlers::{dispatch, fallback};
use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, routing::any, Router};

pub fn resource_routes(state: AppState) -> Router {
    let pattern = format!("{}/*path", state.model.base_path);
    Router::new()
        .route(&pattern, any(dispatch))
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(state.model.limits.max_body_bytes))
        .with_state(state)
}
