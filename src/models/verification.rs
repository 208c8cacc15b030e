use serde::{Deserialize, Serialize};

use super::Confidence;

/// Explanation returned whenever a verification cannot be completed.
pub const UNABLE_TO_VERIFY: &str = "Unable to verify at this time";

/// One search result used as evidence. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// The model's verdict on a statement, before sources are attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationVerdict {
    pub verified: bool,
    pub explanation: String,
    pub confidence: Confidence,
}

impl VerificationVerdict {
    /// Verdict assumed when the compact re-verification returns no text.
    pub fn assumed() -> Self {
        Self {
            verified: true,
            explanation: String::new(),
            confidence: Confidence::Medium,
        }
    }
}

/// Verification envelope: verdict plus the evidence it was judged against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub verified: bool,
    pub explanation: String,
    pub confidence: Confidence,
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl VerificationRecord {
    pub fn from_verdict(verdict: VerificationVerdict, sources: Vec<Source>) -> Self {
        Self {
            verified: verdict.verified,
            explanation: verdict.explanation,
            confidence: verdict.confidence,
            sources,
        }
    }

    /// Body sent when verification fails for any reason.
    pub fn degraded() -> Self {
        Self {
            verified: false,
            explanation: UNABLE_TO_VERIFY.to_string(),
            confidence: Confidence::Low,
            sources: Vec::new(),
        }
    }

    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }
}
