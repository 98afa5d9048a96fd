use crate::error::{Error, Result};
use serde_json::Value as JsonValue;

/// Extracts the first balanced JSON object embedded in raw model text.
/// Models wrap payloads in markdown fences or pad them with prose; both are
/// tolerated. A payload that does not decode strictly is a parse failure, no
/// partial recovery is attempted.
pub fn extract_json_object(raw: &str) -> Result<JsonValue> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let span = first_object_span(&cleaned)
        .ok_or_else(|| Error::Parse("Model response contained no JSON object".to_string()))?;
    serde_json::from_str(span)
        .map_err(|e| Error::Parse(format!("Model response was not valid JSON: {}", e)))
}

/// Extracts the object and requires a `questions` array in it.
pub fn parse_questions(raw: &str) -> Result<Vec<JsonValue>> {
    let object = extract_json_object(raw)?;
    object
        .get("questions")
        .and_then(|q| q.as_array())
        .cloned()
        .ok_or_else(|| Error::Parse("Model response is missing a 'questions' array".to_string()))
}

/// Locates the first `{...}` span by brace matching, skipping braces inside
/// string literals.
fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
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
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
