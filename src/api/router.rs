//! HTTP router.
//!
//! The three pipeline routes are served both at the root and under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. CORS → 2. Access log → 3. Body limit

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the service router.
pub fn api_router(ctx: ApiContext) -> Router {
    let pipeline = Router::new()
        .route("/process-pdf", post(endpoints::documents::process_pdf))
        .route("/verify-content", post(endpoints::verification::verify_content))
        .route("/regenerate-node", post(endpoints::verification::regenerate_node));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .merge(pipeline.clone())
        .nest("/api", pipeline)
        .route("/export/pdf", post(endpoints::export::pdf))
        .route("/export/jpeg", post(endpoints::export::jpeg))
        .route("/health", get(endpoints::health::check))
        .layer(DefaultBodyLimit::max(ctx.info.max_upload_bytes))
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(cors)
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{Body, Bytes};
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::export::tests::sample_document;
    use crate::pipeline::llm::{LlmError, MockLlmClient};
    use crate::pipeline::search::{sample_sources, EvidenceFetcher, MockSearchClient, SearchError};
    use crate::pipeline::MindMapProcessor;

    const BOUNDARY: &str = "medmap-test-boundary";

    const GRAPH_REPLY: &str = r#"```json
{
  "nodes": [
    {"id": "1", "type": "default", "position": {"x": 0, "y": 0}, "data": {"label": "Diabetes"}},
    {"id": "2", "type": "default", "position": {"x": 250, "y": 0}, "data": {"label": "Insulin Therapy"}},
    {"id": "3", "type": "default", "position": {"x": -250, "y": 0}, "data": {"label": "Blood Glucose"}}
  ],
  "edges": [
    {"id": "e1-2", "source": "1", "target": "2", "type": "smoothstep"},
    {"id": "e1-3", "source": "1", "target": "3", "type": "smoothstep"}
  ]
}
```"#;

    fn test_ctx(llm: MockLlmClient, search: MockSearchClient) -> (ApiContext, Arc<MockLlmClient>) {
        let (ctx, llm, _) = tracked_ctx(llm, search);
        (ctx, llm)
    }

    fn tracked_ctx(
        llm: MockLlmClient,
        search: MockSearchClient,
    ) -> (ApiContext, Arc<MockLlmClient>, Arc<MockSearchClient>) {
        let llm = Arc::new(llm);
        let search = Arc::new(search);
        let processor = MindMapProcessor::new(llm.clone(), EvidenceFetcher::new(search.clone()));
        (ApiContext::new(processor, true, 1024 * 1024), llm, search)
    }

    fn multipart_request(uri: &str, field: &str, content: &[u8]) -> Request<Body> {
        multipart_form(uri, &[(field, content)])
    }

    fn multipart_form(uri: &str, fields: &[(&str, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (field, content) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"notes.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(ctx: ApiContext, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = api_router(ctx).oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body)
    }

    async fn send_json(ctx: ApiContext, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(ctx, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn degraded() -> Value {
        json!({
            "verified": false,
            "explanation": "Unable to verify at this time",
            "confidence": "low",
            "sources": []
        })
    }

    // ── /process-pdf ─────────────────────────────────────────

    #[tokio::test]
    async fn process_pdf_returns_mind_map() {
        let (ctx, llm) = test_ctx(MockLlmClient::new(GRAPH_REPLY), MockSearchClient::empty());
        let request = multipart_request(
            "/process-pdf",
            "pdf",
            b"Diabetes is a chronic condition affecting insulin...",
        );

        let (status, json) = send_json(ctx, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(json["nodes"][0]["data"]["label"], "Diabetes");
        assert_eq!(json["edges"][0]["type"], "smoothstep");
        assert_eq!(json["verifications"], json!({}));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn process_pdf_is_also_mounted_under_api() {
        let (ctx, _) = test_ctx(MockLlmClient::new(GRAPH_REPLY), MockSearchClient::empty());
        let request = multipart_request("/api/process-pdf", "pdf", b"Insulin notes");
        let (status, _) = send(ctx, request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn process_pdf_uses_first_pdf_field() {
        let (ctx, llm) = test_ctx(MockLlmClient::new(GRAPH_REPLY), MockSearchClient::empty());
        let request = multipart_form(
            "/process-pdf",
            &[
                ("pdf", b"FIRST-UPLOAD insulin notes".as_slice()),
                ("pdf", b"SECOND-UPLOAD glucose notes".as_slice()),
            ],
        );

        let (status, _) = send(ctx, request).await;

        assert_eq!(status, StatusCode::OK);
        let prompt = &llm.prompts()[0].0;
        assert!(prompt.contains("FIRST-UPLOAD"));
        assert!(!prompt.contains("SECOND-UPLOAD"));
    }

    #[tokio::test]
    async fn process_pdf_without_file_is_400_and_skips_model() {
        let (ctx, llm) = test_ctx(MockLlmClient::new(GRAPH_REPLY), MockSearchClient::empty());
        let request = multipart_request("/process-pdf", "document", b"wrong field");

        let (status, json) = send_json(ctx, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({"error": "No file provided"}));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn process_pdf_with_empty_file_is_400() {
        let (ctx, llm) = test_ctx(MockLlmClient::new(GRAPH_REPLY), MockSearchClient::empty());
        let (status, json) = send_json(ctx, multipart_request("/process-pdf", "pdf", b"")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No file provided");
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn process_pdf_model_failure_is_500() {
        let (ctx, _) = test_ctx(
            MockLlmClient::failing(LlmError::Upstream {
                status: 529,
                body: "overloaded".into(),
            }),
            MockSearchClient::empty(),
        );
        let (status, json) =
            send_json(ctx, multipart_request("/process-pdf", "pdf", b"Insulin notes")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "Failed to process PDF"}));
    }

    #[tokio::test]
    async fn process_pdf_with_prose_reply_is_500() {
        let (ctx, _) = test_ctx(
            MockLlmClient::new("Here is the mind map you asked for."),
            MockSearchClient::empty(),
        );
        let (status, json) =
            send_json(ctx, multipart_request("/process-pdf", "pdf", b"Insulin notes")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Failed to process PDF");
    }

    #[tokio::test]
    async fn process_pdf_rejects_oversized_upload() {
        let (ctx, llm) = test_ctx(MockLlmClient::new(GRAPH_REPLY), MockSearchClient::empty());
        let big = vec![b'a'; 2 * 1024 * 1024];
        let (status, _) = send(ctx, multipart_request("/process-pdf", "pdf", &big)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(llm.call_count(), 0);
    }

    // ── /verify-content ──────────────────────────────────────

    #[tokio::test]
    async fn verify_content_attaches_sources() {
        let (ctx, _) = test_ctx(
            MockLlmClient::new(
                r#"{"verified": true, "explanation": "Insulin lowers blood glucose.", "confidence": "high"}"#,
            ),
            MockSearchClient::new(sample_sources(3)),
        );
        let request = json_request("/verify-content", json!({"content": "Insulin lowers blood glucose"}));

        let (status, json) = send_json(ctx, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["verified"], true);
        assert_eq!(json["confidence"], "high");
        assert_eq!(json["sources"].as_array().unwrap().len(), 3);
        assert_eq!(json["sources"][0]["url"], "https://www.ncbi.nlm.nih.gov/articles/1");
    }

    #[tokio::test]
    async fn verify_content_flags_inaccurate_claim() {
        let (ctx, _) = test_ctx(
            MockLlmClient::new(
                r#"```json
{"verified": false, "explanation": "Insulin manages diabetes but is not a cure.", "confidence": "high"}
```"#,
            ),
            MockSearchClient::empty(),
        );
        let request =
            json_request("/verify-content", json!({"content": "Insulin cures diabetes permanently"}));

        let (status, json) = send_json(ctx, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["verified"], false);
        assert!(!json["explanation"].as_str().unwrap().is_empty());
        assert_eq!(json["sources"], json!([]));
    }

    #[tokio::test]
    async fn verify_content_without_content_is_400() {
        let (ctx, llm, search) = tracked_ctx(MockLlmClient::new("{}"), MockSearchClient::empty());
        let (status, json) = send_json(ctx, json_request("/verify-content", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({"error": "No content provided"}));
        assert_eq!(llm.call_count(), 0);
        assert!(search.queries().is_empty());
    }

    #[tokio::test]
    async fn verify_content_degrades_on_model_failure() {
        let (ctx, _) = test_ctx(
            MockLlmClient::failing(LlmError::Timeout(120)),
            MockSearchClient::failing(SearchError::Status(403)),
        );
        let request = json_request("/api/verify-content", json!({"content": "Vitamin C stops colds"}));
        let (status, json) = send_json(ctx, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, degraded());
    }

    #[tokio::test]
    async fn verify_content_degrades_on_unparseable_verdict() {
        let (ctx, _) = test_ctx(
            MockLlmClient::new("The statement looks accurate."),
            MockSearchClient::new(sample_sources(2)),
        );
        let request = json_request("/verify-content", json!({"content": "Vitamin C stops colds"}));
        let (status, json) = send_json(ctx, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, degraded());
    }

    #[tokio::test]
    async fn verify_content_degrades_on_unreadable_body() {
        let (ctx, llm) = test_ctx(MockLlmClient::new("{}"), MockSearchClient::empty());
        let request = Request::builder()
            .method("POST")
            .uri("/verify-content")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, json) = send_json(ctx, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, degraded());
        assert_eq!(llm.call_count(), 0);
    }

    // ── /regenerate-node ─────────────────────────────────────

    #[tokio::test]
    async fn regenerate_node_returns_content_and_verification() {
        let (ctx, llm) = test_ctx(
            MockLlmClient::scripted(vec![
                Ok("Vitamin C may shorten colds".into()),
                Ok(r#"{"verified": true, "explanation": "Modest effect in trials.", "confidence": "medium"}"#.into()),
            ]),
            MockSearchClient::new(sample_sources(1)),
        );
        let request = json_request("/regenerate-node", json!({"content": "Vitamin C stops colds"}));

        let (status, json) = send_json(ctx, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["content"], "Vitamin C may shorten colds");
        assert_eq!(json["verification"]["verified"], true);
        assert_eq!(json["verification"]["confidence"], "medium");
        assert_eq!(json["verification"]["sources"].as_array().unwrap().len(), 1);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn regenerate_node_without_content_is_400() {
        let (ctx, llm, search) = tracked_ctx(MockLlmClient::new("x"), MockSearchClient::empty());
        let request = json_request("/regenerate-node", json!({"content": ""}));
        let (status, json) = send_json(ctx, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No content provided");
        assert_eq!(llm.call_count(), 0);
        assert!(search.queries().is_empty());
    }

    #[tokio::test]
    async fn regenerate_node_failure_is_500() {
        let (ctx, _) = test_ctx(
            MockLlmClient::failing(LlmError::NoTextContent),
            MockSearchClient::empty(),
        );
        let request = json_request("/api/regenerate-node", json!({"content": "Vitamin C stops colds"}));
        let (status, json) = send_json(ctx, request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "Failed to regenerate content"}));
    }

    // ── /export ──────────────────────────────────────────────

    #[tokio::test]
    async fn export_pdf_is_an_attachment_with_citations() {
        let (ctx, _) = test_ctx(MockLlmClient::new("{}"), MockSearchClient::empty());
        let body = serde_json::to_value(sample_document(true)).unwrap();
        let response = api_router(ctx)
            .oneshot(json_request("/export/pdf", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"mindmap.pdf\""
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let pdf = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(pdf.get_pages().len(), 2);
    }

    #[tokio::test]
    async fn export_jpeg_returns_image() {
        let (ctx, _) = test_ctx(MockLlmClient::new("{}"), MockSearchClient::empty());
        let body = serde_json::to_value(sample_document(false)).unwrap();
        let response = api_router(ctx)
            .oneshot(json_request("/export/jpeg", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[0..3], &[0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn export_with_bad_image_is_400() {
        let (ctx, _) = test_ctx(MockLlmClient::new("{}"), MockSearchClient::empty());
        let mut body = serde_json::to_value(sample_document(false)).unwrap();
        body["image"] = json!("data:image/png;base64,%%%");
        let (status, json) = send_json(ctx, json_request("/export/pdf", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().starts_with("Invalid image"));
    }

    #[tokio::test]
    async fn export_with_malformed_document_is_400() {
        let (ctx, _) = test_ctx(MockLlmClient::new("{}"), MockSearchClient::empty());
        let (status, _) = send(ctx, json_request("/export/jpeg", json!({"nodes": 3}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // ── misc ─────────────────────────────────────────────────

    #[tokio::test]
    async fn health_reports_configuration() {
        let (ctx, _) = test_ctx(MockLlmClient::new("{}"), MockSearchClient::empty());
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, json) = send_json(ctx, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], crate::config::APP_VERSION);
        assert_eq!(json["model"], "mock");
        assert_eq!(json["search_configured"], true);
        assert!(chrono::DateTime::parse_from_rfc3339(json["started_at"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (ctx, _) = test_ctx(MockLlmClient::new("{}"), MockSearchClient::empty());
        let request = Request::builder().uri("/nonexistent").body(Body::empty()).unwrap();
        let (status, _) = send(ctx, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cors_preflight_is_answered() {
        let (ctx, _) = test_ctx(MockLlmClient::new("{}"), MockSearchClient::empty());
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/verify-content")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = api_router(ctx).oneshot(request).await.unwrap();
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
