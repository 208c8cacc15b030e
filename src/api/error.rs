//! API error types with `{"error": "..."}` JSON bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub const NO_FILE_PROVIDED: &str = "No file provided";
pub const NO_CONTENT_PROVIDED: &str = "No content provided";
pub const FAILED_TO_PROCESS_PDF: &str = "Failed to process PDF";
pub const FAILED_TO_REGENERATE: &str = "Failed to regenerate content";
pub const FAILED_TO_EXPORT: &str = "Failed to export mind map";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Payload too large")]
    PayloadTooLarge,
    /// `message` goes to the client, `detail` only to the log.
    #[error("{message}: {detail}")]
    Internal { message: &'static str, detail: String },
}

impl ApiError {
    pub fn internal(message: &'static str, detail: impl ToString) -> Self {
        ApiError::Internal {
            message,
            detail: detail.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Upload exceeds the size limit".to_string(),
            ),
            ApiError::Internal { message, detail } => {
                tracing::error!(detail = %detail, "{message}");
                (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
