//! Shared types for the HTTP layer.

use std::sync::Arc;

use crate::pipeline::MindMapProcessor;

// ═══════════════════════════════════════════════════════════
// API context
// ═══════════════════════════════════════════════════════════

/// Shared context for all routes and middleware. Immutable after startup.
#[derive(Clone)]
pub struct ApiContext {
    pub processor: MindMapProcessor,
    pub info: Arc<ServiceInfo>,
}

/// Static facts reported by `/health`.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub model: String,
    pub search_configured: bool,
    pub max_upload_bytes: usize,
    pub started_at: String,
}

impl ApiContext {
    pub fn new(processor: MindMapProcessor, search_configured: bool, max_upload_bytes: usize) -> Self {
        let info = ServiceInfo {
            model: processor.model().to_string(),
            search_configured,
            max_upload_bytes,
            started_at: chrono::Utc::now().to_rfc3339(),
        };
        Self {
            processor,
            info: Arc::new(info),
        }
    }
}

/// Per-request id, injected into request extensions by the access log.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Body of `/verify-content` and `/regenerate-node`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ContentRequest {
    #[serde(default)]
    pub content: Option<serde_json::Value>,
}

impl ContentRequest {
    /// The statement to check; `None` when missing, null, empty or not a string.
    pub fn statement(&self) -> Option<&str> {
        match &self.content {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> ContentRequest {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn statement_requires_non_empty_string() {
        assert_eq!(parse(r#"{"content": "Insulin lowers glucose"}"#).statement(), Some("Insulin lowers glucose"));
        assert_eq!(parse(r#"{"content": ""}"#).statement(), None);
        assert_eq!(parse(r#"{"content": null}"#).statement(), None);
        assert_eq!(parse(r#"{"content": 42}"#).statement(), None);
        assert_eq!(parse("{}").statement(), None);
    }

    #[test]
    fn whitespace_statement_is_kept() {
        assert_eq!(parse(r#"{"content": "  "}"#).statement(), Some("  "));
    }
}
