//! HTTP error taxonomy
//!
//! Every route failure is returned as a `{"error": "..."}` JSON envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::auth::SessionError;
use crate::commerce::CommerceError;

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Route errors, one variant per status class
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input (400)
    #[error("{0}")]
    Validation(String),

    /// Unknown slug or product (404)
    #[error("{0}")]
    NotFound(String),

    /// Disallowed proxy origin (403)
    #[error("{0}")]
    Forbidden(String),

    /// Bad credentials (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Request body over the upload limit (413)
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Backend or upstream failure, 500 unless propagated
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },
}

impl ApiError {
    /// Generic internal failure
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Upstream {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream { status, .. } => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

// Backend detail stays in the log, the client gets a generic message.
impl From<CommerceError> for ApiError {
    fn from(e: CommerceError) -> Self {
        error!("commerce backend error: {}", e);
        ApiError::internal("Internal server error")
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        error!("session error: {}", e);
        ApiError::internal("Internal server error")
    }
}
