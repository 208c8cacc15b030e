//! Evidence fetching from a restricted-site web search.
//!
//! The fetcher is fail-open: any search failure becomes an empty evidence
//! list tagged `EvidenceStatus::Unavailable`, so fact-checking proceeds
//! without evidence instead of aborting.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::config::SearchCredentials;
use crate::models::{EvidenceStatus, Source};

/// Reputable domains every query is restricted to.
pub const ALLOWED_SITES: &[&str] = &[
    "nih.gov",
    "cdc.gov",
    "who.int",
    "mayoclinic.org",
    "ncbi.nlm.nih.gov",
];

/// Maximum number of sources kept per query.
pub const MAX_SOURCES: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("Search credentials are not configured")]
    NotConfigured,

    #[error("Search request failed: {0}")]
    Request(String),

    #[error("Search service returned status {0}")]
    Status(u16),

    #[error("Malformed search response: {0}")]
    Malformed(String),
}

/// Web search returning result records in rank order.
pub trait SearchClient: Send + Sync {
    fn search(&self, query: &str, num: usize) -> Result<Vec<Source>, SearchError>;
}

/// Google Custom Search JSON API client.
pub struct GoogleSearchClient {
    base_url: String,
    credentials: Option<SearchCredentials>,
    client: reqwest::blocking::Client,
}

impl GoogleSearchClient {
    /// Build a client. Must not be called from inside an async task.
    pub fn new(
        base_url: &str,
        credentials: Option<SearchCredentials>,
        timeout: Duration,
    ) -> Result<Self, SearchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Request(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            client,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }
}

#[derive(Deserialize)]
struct CustomSearchResponse {
    #[serde(default)]
    items: Option<Vec<CustomSearchItem>>,
}

#[derive(Deserialize)]
struct CustomSearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

impl SearchClient for GoogleSearchClient {
    fn search(&self, query: &str, num: usize) -> Result<Vec<Source>, SearchError> {
        let credentials = self.credentials.as_ref().ok_or(SearchError::NotConfigured)?;
        let url = format!("{}/customsearch/v1", self.base_url);
        let num = num.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", credentials.api_key.as_str()),
                ("cx", credentials.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .map_err(|e| SearchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let parsed: CustomSearchResponse = response
            .json()
            .map_err(|e| SearchError::Malformed(e.to_string()))?;

        Ok(parsed
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|item| Source {
                title: item.title,
                url: item.link,
                snippet: item.snippet,
            })
            .collect())
    }
}

/// Evidence for one query, with whether the search service answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    pub sources: Vec<Source>,
    pub status: EvidenceStatus,
}

impl Evidence {
    pub fn unavailable() -> Self {
        Self {
            sources: Vec::new(),
            status: EvidenceStatus::Unavailable,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Build the site-restricted query sent to the search service.
pub fn restricted_query(text: &str) -> String {
    let sites = ALLOWED_SITES
        .iter()
        .map(|site| format!("site:{site}"))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("{text} {sites}")
}

/// Fetches at most three sources for a short text, never failing.
#[derive(Clone)]
pub struct EvidenceFetcher {
    client: Arc<dyn SearchClient>,
}

impl EvidenceFetcher {
    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        Self { client }
    }

    pub fn fetch(&self, text: &str) -> Evidence {
        let query = restricted_query(text);
        match self.client.search(&query, MAX_SOURCES) {
            Ok(mut sources) => {
                sources.truncate(MAX_SOURCES);
                let status = if sources.is_empty() {
                    EvidenceStatus::NoResults
                } else {
                    EvidenceStatus::Found
                };
                tracing::debug!(sources = sources.len(), %status, "Evidence fetched");
                Evidence { sources, status }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Evidence search failed, continuing without sources");
                Evidence::unavailable()
            }
        }
    }
}

/// Mock search client for testing. Returns fixed results and records queries.
pub struct MockSearchClient {
    result: Result<Vec<Source>, SearchError>,
    queries: Mutex<Vec<String>>,
}

impl MockSearchClient {
    pub fn new(sources: Vec<Source>) -> Self {
        Self {
            result: Ok(sources),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn failing(error: SearchError) -> Self {
        Self {
            result: Err(error),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

impl SearchClient for MockSearchClient {
    fn search(&self, query: &str, _num: usize) -> Result<Vec<Source>, SearchError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        self.result.clone()
    }
}

/// Sample sources used across pipeline and API tests.
#[cfg(test)]
pub(crate) fn sample_sources(n: usize) -> Vec<Source> {
    (1..=n)
        .map(|i| Source {
            title: format!("Source {i}"),
            url: format!("https://www.ncbi.nlm.nih.gov/articles/{i}"),
            snippet: format!("Snippet {i} about insulin."),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;

    #[test]
    fn query_appends_site_filter() {
        assert_eq!(
            restricted_query("Insulin cures diabetes"),
            "Insulin cures diabetes site:nih.gov OR site:cdc.gov OR site:who.int \
             OR site:mayoclinic.org OR site:ncbi.nlm.nih.gov"
        );
    }

    #[test]
    fn fetch_keeps_first_three() {
        let client = Arc::new(MockSearchClient::new(sample_sources(5)));
        let evidence = EvidenceFetcher::new(client.clone()).fetch("insulin");
        assert_eq!(evidence.status, EvidenceStatus::Found);
        assert_eq!(evidence.sources, sample_sources(3));
        assert_eq!(client.queries(), vec![restricted_query("insulin")]);
    }

    #[test]
    fn empty_results_are_no_results() {
        let evidence = EvidenceFetcher::new(Arc::new(MockSearchClient::empty())).fetch("x");
        assert!(evidence.is_empty());
        assert_eq!(evidence.status, EvidenceStatus::NoResults);
    }

    #[test]
    fn search_failure_is_swallowed() {
        let client = MockSearchClient::failing(SearchError::Request("connection reset".into()));
        let evidence = EvidenceFetcher::new(Arc::new(client)).fetch("insulin");
        assert!(evidence.is_empty());
        assert_eq!(evidence.status, EvidenceStatus::Unavailable);
    }

    #[test]
    fn unconfigured_client_reports_not_configured() {
        let client =
            GoogleSearchClient::new("http://127.0.0.1:9", None, Duration::from_secs(1)).unwrap();
        assert!(!client.is_configured());
        assert_eq!(client.search("q", 3), Err(SearchError::NotConfigured));
        let evidence = EvidenceFetcher::new(Arc::new(client)).fetch("insulin");
        assert_eq!(evidence.status, EvidenceStatus::Unavailable);
    }

    async fn spawn_upstream(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn credentials() -> Option<SearchCredentials> {
        Some(SearchCredentials {
            api_key: "g-key".into(),
            engine_id: "cx-1".into(),
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn google_client_maps_link_to_url() {
        let app = Router::new().route(
            "/customsearch/v1",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params["key"], "g-key");
                assert_eq!(params["cx"], "cx-1");
                assert_eq!(params["num"], "3");
                assert!(params["q"].ends_with("site:ncbi.nlm.nih.gov"));
                Json(serde_json::json!({
                    "items": [
                        {"title": "Insulin", "link": "https://www.nih.gov/insulin", "snippet": "Insulin is a hormone."},
                        {"title": "Diabetes", "link": "https://www.cdc.gov/diabetes", "snippet": "Diabetes is chronic."}
                    ]
                }))
            }),
        );
        let base = spawn_upstream(app).await;

        let evidence = tokio::task::spawn_blocking(move || {
            let client = GoogleSearchClient::new(&base, credentials(), Duration::from_secs(5)).unwrap();
            EvidenceFetcher::new(Arc::new(client)).fetch("insulin")
        })
        .await
        .unwrap();

        assert_eq!(evidence.status, EvidenceStatus::Found);
        assert_eq!(evidence.sources.len(), 2);
        assert_eq!(evidence.sources[0].url, "https://www.nih.gov/insulin");
        assert_eq!(evidence.sources[1].snippet, "Diabetes is chronic.");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_items_is_an_empty_list() {
        let app = Router::new().route(
            "/customsearch/v1",
            get(|| async { Json(serde_json::json!({"kind": "customsearch#search"})) }),
        );
        let base = spawn_upstream(app).await;

        let result = tokio::task::spawn_blocking(move || {
            GoogleSearchClient::new(&base, credentials(), Duration::from_secs(5))
                .unwrap()
                .search("q", 3)
        })
        .await
        .unwrap();

        assert_eq!(result, Ok(Vec::new()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn quota_error_degrades_to_unavailable() {
        let app = Router::new().route(
            "/customsearch/v1",
            get(|| async { (axum::http::StatusCode::FORBIDDEN, "quota exceeded") }),
        );
        let base = spawn_upstream(app).await;

        let evidence = tokio::task::spawn_blocking(move || {
            let client = GoogleSearchClient::new(&base, credentials(), Duration::from_secs(5)).unwrap();
            EvidenceFetcher::new(Arc::new(client)).fetch("insulin")
        })
        .await
        .unwrap();

        assert!(evidence.is_empty());
        assert_eq!(evidence.status, EvidenceStatus::Unavailable);
    }
}
