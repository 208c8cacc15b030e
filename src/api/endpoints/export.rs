//! Export endpoints: `POST /export/pdf` and `POST /export/jpeg`.

use axum::body::Bytes;
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::api::error::{ApiError, FAILED_TO_EXPORT};
use crate::export::{export, ExportError, ExportRequest};
use crate::models::ExportFormat;

pub async fn pdf(body: Bytes) -> Result<Response, ApiError> {
    render(body, ExportFormat::Pdf).await
}

pub async fn jpeg(body: Bytes) -> Result<Response, ApiError> {
    render(body, ExportFormat::Jpeg).await
}

async fn render(body: Bytes, format: ExportFormat) -> Result<Response, ApiError> {
    let request: ExportRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid mind map document: {e}")))?;

    let bytes = tokio::task::spawn_blocking(move || export(&request, format))
        .await
        .map_err(|e| ApiError::internal(FAILED_TO_EXPORT, format!("task join: {e}")))?
        .map_err(|e| match e {
            ExportError::InvalidImage(msg) => ApiError::BadRequest(format!("Invalid image: {msg}")),
            err @ ExportError::Render(_) => ApiError::internal(FAILED_TO_EXPORT, err),
        })?;

    let headers = [
        (header::CONTENT_TYPE, format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", format.file_name()),
        ),
    ];
    Ok((headers, bytes).into_response())
}
