//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model: String,
    pub search_configured: bool,
    pub started_at: String,
}

/// `GET /health`: liveness plus the configured upstreams.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        model: ctx.info.model.clone(),
        search_configured: ctx.info.search_configured,
        started_at: ctx.info.started_at.clone(),
    })
}
