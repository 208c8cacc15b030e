use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::LlmClient;
use super::LlmError;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API client.
pub struct AnthropicClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl AnthropicClient {
    /// Build a client. Must not be called from inside an async task.
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
            timeout_secs: timeout.as_secs(),
        })
    }
}

/// Request body for POST /v1/messages
#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [UserMessage<'a>; 1],
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Response body from POST /v1/messages
#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

impl LlmClient for AnthropicClient {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens,
            messages: [UserMessage {
                role: "user",
                content: prompt,
            }],
        };

        let started = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    LlmError::Timeout(self.timeout_secs)
                } else {
                    LlmError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .map_err(|e| LlmError::ResponseParsing(e.to_string()))?;

        tracing::debug!(
            model = %self.model,
            max_tokens,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model completion received"
        );

        parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or(LlmError::NoTextContent)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Mock LLM client for testing. Replays scripted replies in order.
///
/// The last reply repeats once the script is exhausted. Every prompt is
/// recorded with its token ceiling.
pub struct MockLlmClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    last: Mutex<Result<String, LlmError>>,
    prompts: Mutex<Vec<(String, u32)>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self::scripted(vec![Ok(response.to_string())])
    }

    pub fn failing(error: LlmError) -> Self {
        Self::scripted(vec![Err(error)])
    }

    pub fn scripted(replies: Vec<Result<String, LlmError>>) -> Self {
        let last = replies
            .last()
            .cloned()
            .unwrap_or(Err(LlmError::NoTextContent));
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(last),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, with their token ceilings.
    pub fn prompts(&self) -> Vec<(String, u32)> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl LlmClient for MockLlmClient {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((prompt.to_string(), max_tokens));
        }
        let next = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        match next {
            Some(reply) => reply,
            None => self
                .last
                .lock()
                .map(|l| l.clone())
                .unwrap_or(Err(LlmError::NoTextContent)),
        }
    }

    fn model(&self) -> &str {
        "mock"
    }
}
