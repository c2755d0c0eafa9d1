//! Structured-Response Extractor: gets one JSON object out of free-form model output.
//!
//! Model output may wrap the object in prose or code fences, so the first balanced
//! top-level `{...}` is located and parsed. Parse failures and transport failures are
//! retried immediately, up to `max_attempts` calls in total.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm_client::{CompletionSource, PromptPart};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// The model never yielded a parseable object. `last_raw` is for operators only.
#[derive(Debug, Error)]
#[error("No valid JSON after {attempts} attempt(s): {reason}")]
pub struct ExtractionError {
    pub attempts: u32,
    pub reason: String,
    pub last_raw: Option<String>,
}

/// Outcome of reading one completion.
#[derive(Debug, PartialEq)]
pub enum ParsedResponse {
    Object(Value),
    ParseFailure { raw: String, reason: String },
}

/// Sends `parts` and returns the first JSON object found in the reply.
pub async fn get_structured_response(
    source: &dyn CompletionSource,
    parts: &[PromptPart],
    max_attempts: u32,
) -> Result<Value, ExtractionError> {
    let max_attempts = max_attempts.max(1);
    let mut last_raw = None;
    let mut reason = String::new();

    for attempt in 1..=max_attempts {
        debug!("Structured response attempt {attempt}/{max_attempts}");

        let raw = match source.generate_content(parts).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Attempt {attempt} failed: completion error: {e}");
                reason = e.to_string();
                continue;
            }
        };
        debug!("Raw response: {raw}");

        match parse_response(raw) {
            ParsedResponse::Object(value) => return Ok(value),
            ParsedResponse::ParseFailure { raw, reason: why } => {
                warn!("Attempt {attempt} failed: {why}");
                reason = why;
                last_raw = Some(raw);
            }
        }
    }

    Err(ExtractionError {
        attempts: max_attempts,
        reason,
        last_raw,
    })
}

/// Classifies a raw completion as a JSON object or a parse failure.
pub fn parse_response(raw: String) -> ParsedResponse {
    let Some(candidate) = find_json_object(&raw) else {
        return ParsedResponse::ParseFailure {
            raw,
            reason: "No JSON object found in response".to_string(),
        };
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(value @ Value::Object(_)) => ParsedResponse::Object(value),
        Ok(_) => ParsedResponse::ParseFailure {
            reason: "Response JSON is not an object".to_string(),
            raw,
        },
        Err(e) => ParsedResponse::ParseFailure {
            reason: format!("Invalid JSON: {e}"),
            raw,
        },
    }
}

/// Returns the first balanced `{...}` substring, ignoring braces inside JSON strings.
/// A `{` that never closes is skipped and the scan resumes at the next one.
pub fn find_json_object(text: &str) -> Option<&str> {
    let mut from = 0;
    while let Some(found) = text[from..].find('{') {
        let start = from + found;
        if let Some(end) = balanced_end(&text[start..]) {
            return Some(&text[start..start + end]);
        }
        from = start + 1;
    }
    None
}

/// Byte length of the object opening at `text[0]`, if it closes.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}
