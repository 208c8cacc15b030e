//! Document upload endpoint.
//!
//! `POST /process-pdf`: multipart upload with the document in field `pdf`,
//! answered with the generated mind map document.

use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::{ApiError, FAILED_TO_PROCESS_PDF, NO_FILE_PROVIDED};
use crate::api::types::ApiContext;
use crate::models::MindMapDocument;
use crate::pipeline::GenerationError;

/// Multipart field carrying the document.
pub const UPLOAD_FIELD: &str = "pdf";

pub async fn process_pdf(
    State(ctx): State<ApiContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MindMapDocument>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::internal(FAILED_TO_PROCESS_PDF, e))?;

    // First `pdf` field wins; later ones are ignored.
    let mut upload: Option<Bytes> = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(UPLOAD_FIELD) {
            upload = Some(field.bytes().await.map_err(multipart_error)?);
            break;
        }
    }
    let bytes = upload
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::BadRequest(NO_FILE_PROVIDED.into()))?;

    tracing::info!(upload_bytes = bytes.len(), "Generating mind map");

    let processor = ctx.processor.clone();
    let result = tokio::task::spawn_blocking(move || processor.generate(&bytes))
        .await
        .map_err(|e| ApiError::internal(FAILED_TO_PROCESS_PDF, format!("task join: {e}")))?;

    match result {
        Ok(map) => Ok(Json(map.into())),
        Err(GenerationError::EmptyDocument) => {
            Err(ApiError::BadRequest("Document contains no text".into()))
        }
        Err(e) => Err(ApiError::internal(FAILED_TO_PROCESS_PDF, e)),
    }
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::internal(FAILED_TO_PROCESS_PDF, e.body_text())
    }
}
