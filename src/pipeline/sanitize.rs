// Model replies often wrap their JSON in a markdown code fence. Strip the
// fence positionally, then parse.

use serde::de::DeserializeOwned;
use thiserror::Error;

const TAGGED_FENCE: &str = "```json";
const BARE_FENCE: &str = "```";

#[derive(Error, Debug)]
#[error("Model reply is not valid JSON: {0}")]
pub struct SanitizeError(#[from] serde_json::Error);

/// Remove one leading fence (tagged first, else bare) and one trailing bare
/// fence, trimming whitespace around both steps.
///
/// Fences anywhere else in the text are left alone.
pub fn strip_code_fences(reply: &str) -> &str {
    let mut text = reply.trim();

    if let Some(rest) = text.strip_prefix(TAGGED_FENCE) {
        text = rest;
    } else if let Some(rest) = text.strip_prefix(BARE_FENCE) {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix(BARE_FENCE) {
        text = rest;
    }

    text.trim()
}

/// Strip code fences from a model reply and deserialize what remains.
pub fn parse_model_json<T: DeserializeOwned>(reply: &str) -> Result<T, SanitizeError> {
    Ok(serde_json::from_str(strip_code_fences(reply))?)
}
