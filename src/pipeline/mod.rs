pub mod ingest;
pub mod llm;
pub mod processor; // Generate / verify / regenerate orchestrator
pub mod prompt;
pub mod sanitize;
pub mod search; // Fail-open evidence fetching

pub use processor::{
    GenerationError, MindMapProcessor, Regeneration, RegenerationError, VerificationError,
    VerificationOutcome,
};
