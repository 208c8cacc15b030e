//! Mind map processing orchestrator.
//!
//! Single entry point for the three model-backed workflows:
//! - generate: document bytes → prompt → model → sanitized graph
//! - verify: label → evidence → fact-check prompt → verdict
//! - regenerate: label → evidence → corrected label → verdict on the
//!   corrected label, reusing the same evidence
//!
//! Uses trait-based DI for the model and search clients so the workflows
//! run against mocks in tests. Everything here blocks; the HTTP layer calls
//! in through `spawn_blocking`.

use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use crate::models::{
    Confidence, EvidenceStatus, GraphError, MindMap, ModelError, VerificationRecord,
    VerificationVerdict, EXPECTED_NODE_RANGE,
};
use crate::pipeline::ingest::document_text;
use crate::pipeline::llm::{
    LlmClient, LlmError, MAX_TOKENS_GRAPH, MAX_TOKENS_REGENERATE, MAX_TOKENS_REVERIFY,
    MAX_TOKENS_VERIFY,
};
use crate::pipeline::prompt::{
    build_graph_prompt, build_regeneration_prompt, build_reverification_prompt,
    build_verification_prompt,
};
use crate::pipeline::sanitize::{parse_model_json, SanitizeError};
use crate::pipeline::search::{Evidence, EvidenceFetcher};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Document is empty")]
    EmptyDocument,

    #[error("Model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Parse(#[from] SanitizeError),

    #[error("Invalid mind map: {0}")]
    Graph(#[from] GraphError),
}

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Parse(#[from] SanitizeError),

    #[error("Invalid verdict: {0}")]
    Verdict(#[from] ModelError),
}

#[derive(Debug, thiserror::Error)]
pub enum RegenerationError {
    #[error("Model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Model returned an empty label")]
    EmptyContent,

    #[error("Verification of the regenerated label failed: {0}")]
    Verification(#[from] VerificationError),
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// A fact-check result plus whether the search service answered.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationOutcome {
    pub record: VerificationRecord,
    pub evidence_status: EvidenceStatus,
}

/// A corrected label with its verification.
#[derive(Debug, Clone, PartialEq)]
pub struct Regeneration {
    pub content: String,
    pub verification: VerificationRecord,
    pub evidence_status: EvidenceStatus,
}

// ---------------------------------------------------------------------------
// Verdict parsing
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RawVerdict {
    verified: bool,
    #[serde(default)]
    explanation: String,
    confidence: String,
}

/// Parse a model reply into a verdict. Confidence is matched
/// case-insensitively but must be high, medium or low.
pub fn parse_verdict(reply: &str) -> Result<VerificationVerdict, VerificationError> {
    let raw: RawVerdict = parse_model_json(reply)?;
    let confidence = Confidence::from_str(&raw.confidence.trim().to_lowercase())?;
    Ok(VerificationVerdict {
        verified: raw.verified,
        explanation: raw.explanation,
        confidence,
    })
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs the generate, verify and regenerate workflows.
#[derive(Clone)]
pub struct MindMapProcessor {
    llm: Arc<dyn LlmClient>,
    evidence: EvidenceFetcher,
}

impl MindMapProcessor {
    pub fn new(llm: Arc<dyn LlmClient>, evidence: EvidenceFetcher) -> Self {
        Self { llm, evidence }
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Build a mind map from raw document bytes.
    pub fn generate(&self, document: &[u8]) -> Result<MindMap, GenerationError> {
        let text = document_text(document);
        if text.trim().is_empty() {
            return Err(GenerationError::EmptyDocument);
        }

        let reply = self
            .llm
            .complete(&build_graph_prompt(&text), MAX_TOKENS_GRAPH)?;
        let value: serde_json::Value = parse_model_json(&reply)?;
        let (map, repairs) = MindMap::from_model_value(value)?;

        if repairs.dropped_edges > 0 {
            tracing::warn!(
                dropped_edges = repairs.dropped_edges,
                "Mind map had edges referencing unknown nodes"
            );
        }
        if !EXPECTED_NODE_RANGE.contains(&map.nodes.len()) {
            tracing::warn!(
                nodes = map.nodes.len(),
                "Mind map node count outside the requested range"
            );
        }
        tracing::info!(
            nodes = map.nodes.len(),
            edges = map.edges.len(),
            text_chars = text.chars().count(),
            "Mind map generated"
        );

        Ok(map)
    }

    /// Fact-check a statement against freshly fetched evidence.
    pub fn verify(&self, statement: &str) -> Result<VerificationOutcome, VerificationError> {
        let evidence = self.evidence.fetch(statement);
        let reply = self.llm.complete(
            &build_verification_prompt(statement, &evidence.sources),
            MAX_TOKENS_VERIFY,
        )?;
        let verdict = parse_verdict(&reply)?;

        tracing::info!(
            verified = verdict.verified,
            confidence = %verdict.confidence,
            sources = evidence.sources.len(),
            evidence = %evidence.status,
            "Statement verified"
        );

        Ok(VerificationOutcome {
            record: VerificationRecord::from_verdict(verdict, evidence.sources),
            evidence_status: evidence.status,
        })
    }

    /// Ask for a corrected label, then verify it against the same evidence.
    pub fn regenerate(&self, label: &str) -> Result<Regeneration, RegenerationError> {
        let evidence = self.evidence.fetch(label);
        let reply = self.llm.complete(
            &build_regeneration_prompt(label, &evidence.sources),
            MAX_TOKENS_REGENERATE,
        )?;
        let content = reply.trim().to_string();
        if content.is_empty() {
            return Err(RegenerationError::EmptyContent);
        }

        let verdict = self.reverify(&content, &evidence)?;
        tracing::info!(
            verified = verdict.verified,
            sources = evidence.sources.len(),
            evidence = %evidence.status,
            "Label regenerated"
        );

        Ok(Regeneration {
            content,
            verification: VerificationRecord::from_verdict(verdict, evidence.sources),
            evidence_status: evidence.status,
        })
    }

    // A reply without text falls back to the assumed verdict; a reply with
    // unparseable text is an error.
    fn reverify(
        &self,
        statement: &str,
        evidence: &Evidence,
    ) -> Result<VerificationVerdict, VerificationError> {
        match self.llm.complete(
            &build_reverification_prompt(statement, &evidence.sources),
            MAX_TOKENS_REVERIFY,
        ) {
            Ok(reply) => parse_verdict(&reply),
            Err(LlmError::NoTextContent) => Ok(VerificationVerdict::assumed()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
