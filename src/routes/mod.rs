//! Route assembly.

mod common;
mod resource;

pub use common::common_routes;
pub use resource::resource_routes;

use crate::error::AppError;
use crate::state::AppState;
use axum::Router;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

/// Full application: common routes, resource routes, request tracing, and panics as 500 payloads.
pub fn app(state: AppState) -> Router {
    let docs_url = state.model.docs_url.clone();
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(resource_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(move |_panic: Box<dyn std::any::Any + Send + 'static>| {
            AppError::Internal("request handler panicked".into()).into_response_with_docs(&docs_url)
        }))
}
