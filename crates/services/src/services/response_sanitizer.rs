//! Recover JSON from model text.
//!
//! Model output is usually valid JSON wrapped in a ```json fence. When it is
//! not, it is almost always because string values contain raw newlines,
//! stray backslashes or control characters. [`sanitize`] strips the fence
//! and, only if the result does not parse, applies a blunt textual repair.
//! The repair is lossy and unverified: it escapes every backslash and every
//! newline, including ones that were already fine, so text that needed no
//! help is never sent through it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

static LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```json\s*").expect("leading fence pattern"));
static TRAILING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```\s*$").expect("trailing fence pattern"));
static CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x{00}-\x{1F}\x{7F}-\x{9F}]").expect("control char pattern"));

const PREVIEW_CHARS: usize = 500;

/// Model text that stayed unparsable after repair.
#[derive(Debug, Error)]
#[error("model response is not valid JSON: {source}")]
pub struct SanitizationError {
    /// Text exactly as the model returned it
    pub raw: String,
    /// What was handed to the parser on the final attempt
    pub attempted: String,
    #[source]
    pub source: serde_json::Error,
}

/// Remove the first ```json opener and a closing ``` at the very end.
pub fn strip_fences(raw: &str) -> String {
    let without_open = LEADING_FENCE.replacen(raw, 1, "");
    TRAILING_FENCE
        .replace(&without_open, "")
        .trim()
        .to_string()
}

/// Textual repair applied when the unfenced text does not parse.
pub fn repair(text: &str) -> String {
    let text = text
        .replace("\"\"\"", "\"")
        .replace('\\', "\\\\")
        .replace('\n', "\\n");
    CONTROL_CHARS.replace_all(&text, "").trim().to_string()
}

/// Unfenced text if it parses as JSON, otherwise the repaired text. The
/// repaired text is not validated here.
pub fn sanitize(raw: &str) -> String {
    let clean = strip_fences(raw);
    if serde_json::from_str::<Value>(&clean).is_ok() {
        return clean;
    }

    let repaired = repair(&clean);
    debug!(repaired = %preview(&repaired), "Applied fallback repair to model response");
    repaired
}

/// Sanitize `raw` and parse it.
pub fn parse_model_json(raw: &str) -> Result<Value, SanitizationError> {
    let attempted = sanitize(raw);
    serde_json::from_str(&attempted).map_err(|source| {
        error!(
            json_error = %source,
            response_length = raw.len(),
            attempted_preview = %preview(&attempted),
            "Failed to parse model response"
        );
        SanitizationError {
            raw: raw.to_string(),
            attempted,
            source,
        }
    })
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}
