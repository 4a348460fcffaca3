//! Error types for nashir-ai
//!
//! Same shape as the content server's error type, plus an `Upstream`
//! variant for LLM provider failures. Provider errors always reach the
//! client as a generic localized message; the provider detail goes to
//! the log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Main error type for nashir-ai handlers
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid session
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Valid session but insufficient role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// LLM provider failure (502). The String is the localized message
    /// shown to the user; the provider detail is logged where the
    /// failure happened.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type for handlers
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<nashir_common::Error> for ApiError {
    fn from(err: nashir_common::Error) -> Self {
        match err {
            nashir_common::Error::Database(e) => ApiError::Database(e),
            nashir_common::Error::NotFound(msg) => ApiError::NotFound(msg),
            nashir_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            nashir_common::Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Database(e) => {
                // Never leak SQL details to clients
                error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
