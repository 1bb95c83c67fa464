//! Lenient JSON body decoding
//!
//! Survey platforms sometimes post bodies with raw control characters inside
//! string values. Decoding walks a fixed list of stages and returns the
//! first one that yields valid JSON.

use serde_json::Value;
use thiserror::Error;

/// Body could not be decoded by any stage
#[derive(Debug, Error)]
#[error("Failed to parse JSON")]
pub struct BodyError;

/// One decoding attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    /// Body as-is
    Strict,
    /// Every raw tab, newline and carriage return escaped
    EscapedControlChars,
    /// Raw newlines escaped inside string literals only
    EscapedNewlinesInStrings,
}

impl ParseStage {
    /// Stages in the order they are attempted
    pub const ALL: [ParseStage; 3] = [
        ParseStage::Strict,
        ParseStage::EscapedControlChars,
        ParseStage::EscapedNewlinesInStrings,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ParseStage::Strict => "strict",
            ParseStage::EscapedControlChars => "escaped_control_chars",
            ParseStage::EscapedNewlinesInStrings => "escaped_newlines_in_strings",
        }
    }

    /// Run this stage against a raw body
    pub fn apply(self, body: &str) -> serde_json::Result<Value> {
        match self {
            ParseStage::Strict => serde_json::from_str(body),
            ParseStage::EscapedControlChars => serde_json::from_str(&escape_control_chars(body)),
            ParseStage::EscapedNewlinesInStrings => {
                serde_json::from_str(&escape_newlines_in_strings(body))
            }
        }
    }
}

/// Decode a request body, trying each `ParseStage` in turn
pub fn parse_body(body: &str) -> Result<Value, BodyError> {
    for stage in ParseStage::ALL {
        match stage.apply(body) {
            Ok(value) => {
                if stage != ParseStage::Strict {
                    tracing::debug!(stage = stage.name(), "Request body decoded leniently");
                }
                return Ok(value);
            }
            Err(e) => {
                tracing::debug!(stage = stage.name(), error = %e, "Body decoding stage failed");
            }
        }
    }
    Err(BodyError)
}

fn escape_control_chars(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    for c in body.chars() {
        match c {
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_newlines_in_strings(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in body.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            } else if c == '\n' {
                out.push_str("\\n");
                continue;
            }
        } else if c == '"' {
            in_string = true;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_body() {
        let value = parse_body(r#"{"a": "b"}"#).unwrap();
        assert_eq!(value["a"], "b");
    }

    #[test]
    fn test_raw_newline_in_single_line_body() {
        let body = "{\"a\": \"line one\nline two\"}";
        assert!(ParseStage::Strict.apply(body).is_err());
        let value = parse_body(body).unwrap();
        assert_eq!(value["a"], "line one\nline two");
    }

    #[test]
    fn test_raw_newline_in_pretty_printed_body() {
        // Escaping every newline breaks the structural ones, so only the
        // string-aware stage can decode this
        let body = "{\n  \"a\": \"first\nsecond\",\n  \"b\": \"x\\\"y\"\n}";
        assert!(ParseStage::EscapedControlChars.apply(body).is_err());
        let value = parse_body(body).unwrap();
        assert_eq!(value["a"], "first\nsecond");
        assert_eq!(value["b"], "x\"y");
    }

    #[test]
    fn test_garbage_fails_every_stage() {
        assert!(parse_body("questions=1&responses=2").is_err());
        assert!(parse_body("").is_err());
    }
}
