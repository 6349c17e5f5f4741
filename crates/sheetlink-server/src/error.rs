//! Error types for the HTTP layer.

use std::net::{AddrParseError, SocketAddr};

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use sheetlink_core::{ErrorKind, SheetError};
use thiserror::Error;

/// Failures while bootstrapping or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid host address '{host}': {source}")]
    BindAddress {
        host: String,
        #[source]
        source: AddrParseError,
    },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Store initialization failed: {0}")]
    Store(#[from] SheetError),

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// HTTP status for a service error.
pub fn status_for(err: &SheetError) -> StatusCode {
    match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::TypeMismatch => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::DataIntegrity => StatusCode::CONFLICT,
        ErrorKind::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        ErrorKind::StorageFailure if err.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error response rendered as `{"error": "<message>"}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<SheetError> for ApiError {
    fn from(err: SheetError) -> Self {
        let status = status_for(&err);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Storage details stay in the logs.
            tracing::error!(error = %err, "Request failed");
            return Self::new(status, "Internal Server Error");
        }
        if status.is_server_error() {
            tracing::warn!(error = %err, "Request failed");
        } else {
            tracing::debug!(error = %err, "Request rejected");
        }
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        SheetError::Validation(rejection.body_text()).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
