//! Normalization of model process output
//!
//! The external process may hand back (a) the payload directly, (b) a
//! JSON envelope `{"result": "<string>"}` whose inner string is the
//! real payload, or (c) either of those wrapped in a fenced code block
//! with an optional language tag. `normalize` peels all three layers;
//! `extract_json` additionally parses the remainder into a typed
//! value. Every failure along the chain yields None, never an error.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Strip a surrounding fenced code block, tolerating a language tag.
///
/// Text that is not fenced comes back unchanged.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    // Drop the opening fence line (``` or ```json etc.)
    let rest = match trimmed.find('\n') {
        Some(idx) => &trimmed[idx + 1..],
        None => return trimmed.trim_matches('`').trim().to_string(),
    };

    let rest = rest.trim_end();
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim().to_string()
}

/// Unwrap a `{"result": "<string>"}` envelope, if present
pub fn unwrap_envelope(text: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        if let Some(Value::String(inner)) = map.get("result") {
            return inner.clone();
        }
    }
    text.to_string()
}

/// Peel fences and the result envelope down to the bare payload
pub fn normalize(raw: &str) -> String {
    let unfenced = strip_code_fences(raw);
    let unwrapped = unwrap_envelope(&unfenced);
    // The envelope's inner string is often fenced again
    strip_code_fences(&unwrapped)
}

/// Normalize, locate the first JSON object or array, and parse it.
///
/// Returns None on any failure; callers degrade rather than throw.
pub fn extract_json<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let text = normalize(raw);

    // Direct parse first: covers clean payloads including scalars
    if let Ok(value) = serde_json::from_str::<T>(&text) {
        return Some(value);
    }

    // Otherwise find the first balanced object or array in the text
    let candidate = find_json_span(&text)?;
    serde_json::from_str(candidate).ok()
}

/// Locate the first brace-balanced JSON object or array span
fn find_json_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let bytes = text.as_bytes();
    let (open, close) = match bytes[start] {
        b'{' => (b'{', b'}'),
        _ => (b'[', b']'),
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            _ if b == open => depth += 1,
            _ if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Judgment {
        category: String,
        confidence: f64,
    }

    #[test]
    fn test_bare_json() {
        let parsed: Judgment =
            extract_json(r#"{"category": "Food", "confidence": 0.9}"#).unwrap();
        assert_eq!(parsed.category, "Food");
    }

    #[test]
    fn test_envelope_unwrapped() {
        let raw = r#"{"result": "{\"category\": \"Food\", \"confidence\": 0.9}"}"#;
        let parsed: Judgment = extract_json(raw).unwrap();
        assert_eq!(parsed.category, "Food");
    }

    #[test]
    fn test_fenced_with_language_tag() {
        let raw = "```json\n{\"category\": \"Food\", \"confidence\": 0.9}\n```";
        let parsed: Judgment = extract_json(raw).unwrap();
        assert_eq!(parsed.confidence, 0.9);
    }

    #[test]
    fn test_envelope_containing_fenced_payload() {
        let raw = r#"{"result": "```json\n{\"category\": \"Food\", \"confidence\": 0.8}\n```"}"#;
        let parsed: Judgment = extract_json(raw).unwrap();
        assert_eq!(parsed.confidence, 0.8);
    }

    #[test]
    fn test_json_with_surrounding_prose() {
        let raw = "Here you go:\n{\"category\": \"Food\", \"confidence\": 0.7}\nDone.";
        let parsed: Judgment = extract_json(raw).unwrap();
        assert_eq!(parsed.category, "Food");
    }

    #[test]
    fn test_array_payload() {
        let raw = "```\n[{\"category\": \"Food\", \"confidence\": 1.0}]\n```";
        let parsed: Vec<Judgment> = extract_json(raw).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_braces_inside_strings_do_not_confuse_the_scanner() {
        let raw = r#"note {"category": "Fo{od}", "confidence": 0.5} trailing"#;
        let parsed: Judgment = extract_json(raw).unwrap();
        assert_eq!(parsed.category, "Fo{od}");
    }

    #[test]
    fn test_garbage_yields_none() {
        assert!(extract_json::<Judgment>("no json here").is_none());
        assert!(extract_json::<Judgment>("").is_none());
        assert!(extract_json::<Judgment>("{\"category\": unclosed").is_none());
    }

    #[test]
    fn test_strip_fences_passthrough() {
        assert_eq!(strip_code_fences("plain"), "plain");
        assert_eq!(strip_code_fences("```\nabc\n```"), "abc");
        assert_eq!(strip_code_fences("```sql\nSELECT 1;\n```"), "SELECT 1;");
    }

    #[test]
    fn test_envelope_without_result_is_untouched() {
        let raw = r#"{"category": "Food", "confidence": 0.9}"#;
        assert_eq!(unwrap_envelope(raw), raw);
    }
}
