//! JSON Repair Mechanism
//!
//! Unified JSON extraction and repair for LLM responses.
//!
//! Handles common LLM JSON output issues:
//! - Markdown code fence wrapping (```json ... ```)
//! - Trailing commas
//! - Missing closing braces/brackets
//! - JSON embedded in explanatory text

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{FathomError, Result};

// =============================================================================
// Convenience Functions
// =============================================================================

/// Extract and parse JSON from an LLM response.
///
/// This is the primary entry point for parsing LLM JSON output.
pub fn extract_json_from_response(content: &str) -> Result<Value> {
    let repairer = JsonRepairer::new();
    repairer.parse_or_repair(content).map(|(value, _)| value)
}

// =============================================================================
// JsonRepairer
// =============================================================================

/// JSON repair strategies
pub struct JsonRepairer {
    max_repair_attempts: usize,
}

impl Default for JsonRepairer {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonRepairer {
    pub fn new() -> Self {
        Self {
            max_repair_attempts: 2,
        }
    }

    /// Parse JSON, attempting repair if initial parse fails.
    ///
    /// Returns (Value, was_repaired)
    pub fn parse_or_repair(&self, raw: &str) -> Result<(Value, bool)> {
        let cleaned = self.preprocess(raw);

        if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
            return Ok((value, false));
        }

        debug!("Initial JSON parse failed, attempting repair");

        for attempt in 1..=self.max_repair_attempts {
            let repaired = self.repair_attempt(&cleaned, attempt);
            if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
                warn!("JSON repaired on attempt {}", attempt);
                return Ok((value, true));
            }
        }

        if let Some(extracted) = self.extract_json_from_mixed(&cleaned)
            && let Ok(value) = serde_json::from_str::<Value>(&extracted)
        {
            warn!("JSON extracted from mixed content");
            return Ok((value, true));
        }

        Err(FathomError::LlmApi(format!(
            "Failed to parse or repair JSON. Content preview: {}...",
            &cleaned.chars().take(200).collect::<String>()
        )))
    }

    /// Strip code fences, BOM, and surrounding whitespace
    fn preprocess(&self, raw: &str) -> String {
        let mut s = raw.trim();
        s = s.trim_start_matches('\u{feff}');

        if s.starts_with("```") {
            if let Some(first_newline) = s.find('\n') {
                s = &s[first_newline + 1..];
            }
            if let Some(fence) = s.rfind("```") {
                s = &s[..fence];
            }
        }

        s.trim().to_string()
    }

    /// One repair strategy per attempt number
    fn repair_attempt(&self, s: &str, attempt: usize) -> String {
        match attempt {
            1 => self.remove_trailing_commas(s),
            _ => self.close_open_delimiters(&self.remove_trailing_commas(s)),
        }
    }

    /// Remove trailing commas before closing delimiters (string-aware)
    fn remove_trailing_commas(&self, s: &str) -> String {
        let mut result = String::with_capacity(s.len());
        let mut in_string = false;
        let mut escaped = false;
        let chars: Vec<char> = s.chars().collect();

        for (i, &ch) in chars.iter().enumerate() {
            if in_string {
                result.push(ch);
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '"' {
                    in_string = false;
                }
                continue;
            }
            match ch {
                '"' => {
                    in_string = true;
                    result.push(ch);
                }
                ',' => {
                    let next_meaningful = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                    if matches!(next_meaningful, Some('}') | Some(']')) {
                        continue;
                    }
                    result.push(ch);
                }
                _ => result.push(ch),
            }
        }

        result
    }

    /// Append closing delimiters for any left unbalanced (truncated output)
    fn close_open_delimiters(&self, s: &str) -> String {
        let mut stack = Vec::new();
        let mut in_string = false;
        let mut escaped = false;

        for ch in s.chars() {
            if in_string {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '"' {
                    in_string = false;
                }
                continue;
            }
            match ch {
                '"' => in_string = true,
                '{' => stack.push('}'),
                '[' => stack.push(']'),
                '}' | ']' => {
                    stack.pop();
                }
                _ => {}
            }
        }

        let mut result = s.to_string();
        if in_string {
            result.push('"');
        }
        while let Some(close) = stack.pop() {
            result.push(close);
        }
        result
    }

    /// Extract the outermost JSON object from surrounding prose
    fn extract_json_from_mixed(&self, s: &str) -> Option<String> {
        let start = s.find('{')?;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (i, ch) in s[start..].char_indices() {
            if in_string {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '"' {
                    in_string = false;
                }
                continue;
            }
            match ch {
                '"' => in_string = true,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(s[start..start + i + 1].to_string());
                    }
                }
                _ => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_json_passes_through() {
        let (value, repaired) = JsonRepairer::new()
            .parse_or_repair(r#"{"a": 1, "b": [2, 3]}"#)
            .unwrap();
        assert!(!repaired);
        assert_eq!(value, json!({"a": 1, "b": [2, 3]}));
    }

    #[test]
    fn test_code_fence_stripped() {
        let raw = "```json\n{\"key\": \"value\"}\n```";
        let value = extract_json_from_response(raw).unwrap();
        assert_eq!(value, json!({"key": "value"}));
    }

    #[test]
    fn test_trailing_comma_repaired() {
        let (value, repaired) = JsonRepairer::new()
            .parse_or_repair(r#"{"a": [1, 2,], "b": 3,}"#)
            .unwrap();
        assert!(repaired);
        assert_eq!(value, json!({"a": [1, 2], "b": 3}));
    }

    #[test]
    fn test_truncated_object_closed() {
        let (value, repaired) = JsonRepairer::new()
            .parse_or_repair(r#"{"a": {"b": [1, 2"#)
            .unwrap();
        assert!(repaired);
        assert_eq!(value, json!({"a": {"b": [1, 2]}}));
    }

    #[test]
    fn test_json_in_prose_extracted() {
        let raw = r#"Here is the result you asked for: {"ok": true} hope that helps!"#;
        let value = extract_json_from_response(raw).unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[test]
    fn test_garbage_fails() {
        assert!(extract_json_from_response("not json at all").is_err());
    }

    #[test]
    fn test_comma_inside_string_preserved() {
        let (value, _) = JsonRepairer::new()
            .parse_or_repair(r#"{"text": "a, b, c,"}"#)
            .unwrap();
        assert_eq!(value, json!({"text": "a, b, c,"}));
    }
}
