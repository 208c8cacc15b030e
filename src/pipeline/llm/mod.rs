pub mod anthropic;
pub mod types;

pub use anthropic::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("Model service is not reachable at {0}")]
    Connection(String),

    #[error("Model request timed out after {0}s")]
    Timeout(u64),

    #[error("Model service returned error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("No text response from AI")]
    NoTextContent,

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}
