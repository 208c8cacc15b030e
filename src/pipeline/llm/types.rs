use super::LlmError;

/// Token ceiling for mind map generation.
pub const MAX_TOKENS_GRAPH: u32 = 4096;
/// Token ceiling for the corrected 2-5 word label.
pub const MAX_TOKENS_REGENERATE: u32 = 256;
/// Token ceiling for verifying a regenerated label.
pub const MAX_TOKENS_REVERIFY: u32 = 512;
/// Token ceiling for a standalone fact-check.
pub const MAX_TOKENS_VERIFY: u32 = 1024;

/// Single-turn text completion.
///
/// Implementations block; async callers go through `spawn_blocking`.
pub trait LlmClient: Send + Sync {
    /// Send one user message and return the first text segment of the reply.
    ///
    /// A reply without any text segment is `LlmError::NoTextContent`.
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError>;

    /// Model identifier, for logs and the health endpoint.
    fn model(&self) -> &str;
}
