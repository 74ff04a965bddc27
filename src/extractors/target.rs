//! Extract the classified [`RequestTarget`] from method and URL.

use crate::router::{classify, RequestTarget};
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::request::Parts,
    response::Response,
};

#[async_trait]
impl FromRequestParts<AppState> for RequestTarget {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Nested routers strip their prefix from `parts.uri`; classify the full path.
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|o| o.0.clone())
            .unwrap_or_else(|| parts.uri.clone());
        classify(&parts.method, &uri, &state.model)
            .map_err(|e| e.into_response_with_docs(&state.model.docs_url))
    }
}
