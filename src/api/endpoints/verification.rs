//! Fact-check endpoints.
//!
//! `POST /verify-content` never fails once the statement is present: any
//! error becomes the degraded verdict with status 200.
//! `POST /regenerate-node` has no degraded path and answers 500 on failure.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::{ApiError, FAILED_TO_REGENERATE, NO_CONTENT_PROVIDED};
use crate::api::types::{ApiContext, ContentRequest};
use crate::models::VerificationRecord;

#[derive(Debug, Serialize)]
pub struct RegenerateResponse {
    pub content: String,
    pub verification: VerificationRecord,
}

pub async fn verify_content(
    State(ctx): State<ApiContext>,
    body: Bytes,
) -> Result<Json<VerificationRecord>, ApiError> {
    let request: ContentRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable verify body, returning degraded verdict");
            return Ok(Json(VerificationRecord::degraded()));
        }
    };
    let statement = request
        .statement()
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest(NO_CONTENT_PROVIDED.into()))?;

    tracing::info!(node_label_len = statement.len(), "Verifying statement");

    let processor = ctx.processor.clone();
    match tokio::task::spawn_blocking(move || processor.verify(&statement)).await {
        Ok(Ok(outcome)) => Ok(Json(outcome.record)),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Verification failed, returning degraded verdict");
            Ok(Json(VerificationRecord::degraded()))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Verification task failed, returning degraded verdict");
            Ok(Json(VerificationRecord::degraded()))
        }
    }
}

pub async fn regenerate_node(
    State(ctx): State<ApiContext>,
    body: Bytes,
) -> Result<Json<RegenerateResponse>, ApiError> {
    let request: ContentRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::internal(FAILED_TO_REGENERATE, e))?;
    let label = request
        .statement()
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest(NO_CONTENT_PROVIDED.into()))?;

    tracing::info!(node_label_len = label.len(), "Regenerating label");

    let processor = ctx.processor.clone();
    let regeneration = tokio::task::spawn_blocking(move || processor.regenerate(&label))
        .await
        .map_err(|e| ApiError::internal(FAILED_TO_REGENERATE, format!("task join: {e}")))?
        .map_err(|e| ApiError::internal(FAILED_TO_REGENERATE, e))?;

    Ok(Json(RegenerateResponse {
        content: regeneration.content,
        verification: regeneration.verification,
    }))
}
