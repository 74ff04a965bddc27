//! Typed errors and HTTP mapping. Every failure resolves to 400 or 500 with an [`ErrorPayload`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Documentation root used for `moreInfo` links when no configuration is at hand.
pub const DEFAULT_DOCS_URL: &str = "https://developer.example.com/docs";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate resource: {0}")]
    DuplicateResource(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Failures reported by the data-access collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{resource} '{id}' not found")]
    NotFound { resource: String, id: String },
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("path has {0} segments; at most resource/identifier/resource is supported")]
    PathTooDeep(usize),
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error("unsupported API version: {0}")]
    UnsupportedVersion(String),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("method {method} not supported on {target}")]
    MethodNotSupported { method: String, target: String },
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store: {0}")]
    Store(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => AppError::NotFound(e.to_string()),
            StoreError::Validation(m) => AppError::Validation(m),
            StoreError::Conflict(m) => AppError::Conflict(m),
            StoreError::Unavailable(_) => AppError::Store(e.to_string()),
        }
    }
}

impl AppError {
    /// Only 400 and 500 are ever produced.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Store(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable internal error code; documented under `{docs_url}/errors/{code}`.
    pub fn error_code(&self) -> u32 {
        match self {
            AppError::BadRequest(_) => 1001,
            AppError::InvalidQuery(_) => 1002,
            AppError::PathTooDeep(_) => 1003,
            AppError::UnknownResource(_) => 1004,
            AppError::UnsupportedVersion(_) => 1005,
            AppError::UnsupportedFormat(_) => 1006,
            AppError::MethodNotSupported { .. } => 1007,
            AppError::InvalidIdentifier(_) => 1008,
            AppError::Validation(_) => 2001,
            AppError::NotFound(_) => 2002,
            AppError::Conflict(_) => 2003,
            AppError::Store(_) => 5001,
            AppError::Config(_) => 5002,
            AppError::Internal(_) => 5003,
        }
    }

    fn user_message(&self) -> Option<&'static str> {
        match self {
            AppError::Validation(_) => Some("Some of the submitted values are not valid."),
            AppError::NotFound(_) => Some("The requested item could not be found."),
            AppError::Conflict(_) => Some("The request conflicts with existing data."),
            AppError::Config(_) | AppError::Store(_) | AppError::Internal(_) => {
                Some("Something went wrong on our side. Please try again later.")
            }
            _ => None,
        }
    }

    pub fn payload(&self, docs_url: &str) -> ErrorPayload {
        let code = self.error_code();
        ErrorPayload {
            status: self.status().as_u16(),
            developer_message: self.to_string(),
            user_message: self.user_message().map(String::from),
            error_code: code,
            more_info: format!("{}/errors/{}", docs_url.trim_end_matches('/'), code),
        }
    }

    /// Render with links rooted at `docs_url` (the configured documentation site).
    pub fn into_response_with_docs(self, docs_url: &str) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, code = self.error_code(), "request failed");
        } else {
            tracing::debug!(error = %self, code = self.error_code(), "request rejected");
        }
        (status, Json(self.payload(docs_url))).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub status: u16,
    pub developer_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    pub error_code: u32,
    pub more_info: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_response_with_docs(DEFAULT_DOCS_URL)
    }
}
