//! Helpers for reading structured answers out of free-form model text.

use serde::de::DeserializeOwned;

use crate::error::{ParseError, Result};

/// Remove a surrounding Markdown code fence, if any.
///
/// ```
/// use dayflow_core::llm_text::strip_code_fences;
///
/// assert_eq!(strip_code_fences("```json\n[\"☕\"]\n```"), "[\"☕\"]");
/// assert_eq!(strip_code_fences("  plain  "), "plain");
/// ```
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string line ("json", "JSON", or nothing).
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    let body = match body.rfind("```") {
        Some(end) => &body[..end],
        None => body,
    };
    body.trim()
}

/// Parse model output as JSON after stripping code fences.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return Err(ParseError::EmptyResponse);
    }
    serde_json::from_str(body).map_err(|e| ParseError::InvalidJson(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_strip_fenced_with_language() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(text), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_fenced_without_language() {
        let text = "```\n[1, 2]\n```\n";
        assert_eq!(strip_code_fences(text), "[1, 2]");
    }

    #[test]
    fn test_strip_unterminated_fence() {
        let text = "```json\n[1, 2]";
        assert_eq!(strip_code_fences(text), "[1, 2]");
    }

    #[test]
    fn test_unfenced_is_trimmed() {
        assert_eq!(strip_code_fences("\n  [\"🍜\"] \n"), "[\"🍜\"]");
    }

    #[test]
    fn test_parse_json_errors() {
        assert_eq!(parse_json::<Value>("   "), Err(ParseError::EmptyResponse));
        assert!(matches!(
            parse_json::<Value>("not json"),
            Err(ParseError::InvalidJson(_))
        ));
    }
}
