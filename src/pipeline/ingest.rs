// Uploaded documents are decoded as (lossy) UTF-8 text; no PDF parsing.
// Control and invisible formatting characters are dropped so the binary
// parts of a PDF do not end up in the prompt as noise.

/// Characters of document text sent to the model.
pub const MAX_DOCUMENT_CHARS: usize = 10_000;

/// Convert uploaded bytes into prompt-ready text, truncated to
/// `MAX_DOCUMENT_CHARS` characters.
pub fn document_text(bytes: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(bytes);
    let cleaned = remove_invisible_chars(&decoded);
    truncate_chars(&cleaned, MAX_DOCUMENT_CHARS).to_string()
}

/// Remove invisible Unicode characters that could manipulate LLM behavior.
/// Preserves standard whitespace (space, newline, tab).
fn remove_invisible_chars(text: &str) -> String {
    text.chars()
        .filter(|c| {
            if matches!(*c, ' ' | '\n' | '\t' | '\r') {
                return true;
            }
            if matches!(
                *c,
                '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}'
            ) {
                return false;
            }
            // U+FFFD marks bytes that were not UTF-8
            !c.is_control() && *c != char::REPLACEMENT_CHARACTER
        })
        .collect()
}

/// First `max_chars` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
