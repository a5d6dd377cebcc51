//! # HTTP Utilities
//!
//! Response parsing helpers for the metric web service: strict JSON decoding
//! with a readable error, and extraction of the server's error message.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Maximum number of characters of a response body quoted in messages.
const PREVIEW_LIMIT: usize = 200;

/// Parse HTTP response text into JSON, providing detailed errors on failure.
///
/// # Errors
/// Returns a [`JsonParseError`] carrying the serde error, the HTTP status and
/// up to 200 characters of the response body with whitespace collapsed.
pub fn parse_response_json_strict(text: &str, status: Option<StatusCode>) -> Result<Value, JsonParseError> {
    serde_json::from_str::<Value>(text).map_err(|error| {
        let status_note = status
            .map(|code| format!("status {code}"))
            .unwrap_or_else(|| "unknown status".to_string());
        let preview = truncate_response_preview(text, PREVIEW_LIMIT);

        JsonParseError::new(status_note, error, preview)
    })
}

/// Message to surface for a failed request.
///
/// The service reports failures as `{"message": "..."}`; that message is
/// returned verbatim. Other bodies fall back to `HTTP <code>: <preview>`.
///
/// # Example
/// ```rust
/// use agtable_util::http::error_message_from_body;
/// use reqwest::StatusCode;
///
/// let message = error_message_from_body(r#"{"status":400,"message":"Illegal expression"}"#, StatusCode::BAD_REQUEST);
/// assert_eq!(message, "Illegal expression");
///
/// let message = error_message_from_body("gateway down", StatusCode::BAD_GATEWAY);
/// assert_eq!(message, "HTTP 502: gateway down");
/// ```
pub fn error_message_from_body(text: &str, status: StatusCode) -> String {
    let message = serde_json::from_str::<Value>(text).ok().and_then(|value| {
        value
            .get("message")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map(str::to_string)
    });

    message.unwrap_or_else(|| format!("HTTP {}: {}", status.as_u16(), truncate_response_preview(text, PREVIEW_LIMIT)))
}

fn truncate_response_preview(text: &str, limit: usize) -> String {
    if text.trim().is_empty() {
        return "<empty>".to_string();
    }

    let mut preview = String::new();
    for ch in text.chars() {
        if preview.len() >= limit {
            preview.push_str("...");
            break;
        }
        match ch {
            '\n' | '\r' | '\t' => {
                if !preview.ends_with(' ') {
                    preview.push(' ');
                }
            }
            _ => preview.push(ch),
        }
    }

    preview.trim().to_string()
}

/// Error returned when strict JSON parsing of an HTTP response fails.
#[derive(Debug, Error)]
#[error("failed to parse JSON response ({status_note}): {source}. body preview: {body_preview}")]
pub struct JsonParseError {
    status_note: String,
    #[source]
    source: serde_json::Error,
    body_preview: String,
}

impl JsonParseError {
    pub fn new(status_note: String, source: serde_json::Error, body_preview: String) -> Self {
        Self {
            status_note,
            source,
            body_preview,
        }
    }

    /// Access the truncated response preview captured during parsing.
    pub fn body_preview(&self) -> &str {
        &self.body_preview
    }
}
