//! Resource handler: one entry point for every classified request under the API base path.

use crate::error::AppError;
use crate::render::render;
use crate::router::{Intent, RequestTarget};
use crate::service::ResourceService;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, OriginalUri, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use serde_json::Value;

fn parse_body(body: Result<Bytes, BytesRejection>) -> Result<Value, AppError> {
    let bytes = body.map_err(|e| AppError::BadRequest(format!("unreadable body: {}", e.body_text())))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest("request body required".into()));
    }
    serde_json::from_slice(&bytes).map_err(|e| AppError::BadRequest(format!("malformed JSON body: {}", e)))
}

async fn execute(
    state: &AppState,
    target: &RequestTarget,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    let body = match target.intent {
        Intent::Create | Intent::ReplaceAll | Intent::Update => Some(parse_body(body)?),
        _ => None,
    };
    let out = ResourceService::execute(state.store.as_ref(), &state.model, target, body).await?;
    let text = render(&out, target.format, &target.resource)
        .map_err(|e| AppError::Internal(format!("render: {}", e)))?;
    Ok(([(CONTENT_TYPE, target.format.content_type())], text).into_response())
}

/// `ANY {base_path}/*path`. Success is always 200; failures render the error payload.
pub async fn dispatch(
    State(state): State<AppState>,
    target: RequestTarget,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    match execute(&state, &target, body).await {
        Ok(resp) => resp,
        Err(e) => e.into_response_with_docs(&state.model.docs_url),
    }
}

/// Anything outside the routed API surface.
pub async fn fallback(State(state): State<AppState>, OriginalUri(uri): OriginalUri) -> Response {
    AppError::UnknownResource(uri.path().to_string()).into_response_with_docs(&state.model.docs_url)
}
