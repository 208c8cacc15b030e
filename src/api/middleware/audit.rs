//! Access logging middleware.
//!
//! Tags every request with a UUID request id (also echoed in the
//! `x-request-id` response header) and logs method, path, status and
//! latency once the response is ready.

use std::time::Instant;

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::api::types::RequestId;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub async fn log_access(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let started = Instant::now();
    let mut response = next.run(req).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    if response.status().is_server_error() {
        tracing::warn!(%request_id, %method, %path, status, elapsed_ms, "Request failed");
    } else {
        tracing::info!(%request_id, %method, %path, status, elapsed_ms, "Request served");
    }

    if let Ok(val) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, val);
    }
    response
}
