//! Lenient parsing of tabular AI responses
//!
//! Providers that ignore the requested schema tend to wrap the JSON in a
//! markdown fence, prefix it with a bare word such as `json`, or surround it
//! with prose. Each candidate is tried in order until one parses.

use super::AiRow;
use crate::core::error::{Result, WireError};
use serde_json::Value;

/// Parse response text into AI rows, stripping known wrapper patterns
pub fn parse_rows(response: &str) -> Result<Vec<AiRow>> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(WireError::StructuredParse("Empty response".into()));
    }

    let mut last_error = None;
    for candidate in candidates(trimmed) {
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => match rows_from_value(&value) {
                Ok(rows) => return Ok(rows),
                Err(e) => last_error = Some(e),
            },
            Err(e) => last_error = Some(WireError::StructuredParse(e.to_string())),
        }
    }

    Err(last_error.unwrap_or_else(|| {
        WireError::StructuredParse(format!("No JSON found in response: {}", trimmed))
    }))
}

/// Convert a structured payload into AI rows.
///
/// Accepts `{"rows": [...]}` or a bare array. Every row must be an object;
/// non-string cell values are rendered as JSON text and `null` as empty.
pub fn rows_from_value(value: &Value) -> Result<Vec<AiRow>> {
    let items = match value {
        Value::Object(map) => map
            .get("rows")
            .and_then(Value::as_array)
            .ok_or_else(|| WireError::StructuredParse("Object has no \"rows\" array".into()))?,
        Value::Array(items) => items,
        other => {
            return Err(WireError::StructuredParse(format!(
                "Expected rows object or array, found: {}",
                other
            )))
        }
    };

    items
        .iter()
        .map(|item| {
            let object = item.as_object().ok_or_else(|| {
                WireError::StructuredParse(format!("Row is not an object: {}", item))
            })?;
            Ok(object
                .iter()
                .map(|(key, cell)| (key.clone(), cell_text(cell)))
                .collect())
        })
        .collect()
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn candidates(text: &str) -> Vec<&str> {
    let mut out = vec![text];

    let unfenced = strip_fence(text);
    if unfenced != text {
        out.push(unfenced);
    }

    let unprefixed = strip_bare_word(unfenced);
    if unprefixed != unfenced {
        out.push(unprefixed);
    }

    if let Some(object) = extract_delimited(text, '{', '}') {
        out.push(object);
    }
    if let Some(array) = extract_delimited(text, '[', ']') {
        out.push(array);
    }

    out
}

/// Remove a surrounding markdown code fence and its language tag
fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Drop a leading bare word (e.g. `json`) that precedes the payload
fn strip_bare_word(text: &str) -> &str {
    let word_len = text
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    if word_len == 0 {
        return text;
    }
    let rest = text[word_len..].trim_start();
    if rest.starts_with('{') || rest.starts_with('[') {
        rest
    } else {
        text
    }
}

/// Slice from the first `open` to the last `close` (handles surrounding prose)
fn extract_delimited(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_rows_object() {
        let rows = parse_rows(r#"{"rows":[{"Status":"Active"},{"Status":"Pending"}]}"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["Status"], "Pending");
    }

    #[test]
    fn test_parse_markdown_fenced() {
        let rows = parse_rows("```json\n{\"rows\":[{\"Status\":\"Active\"}]}\n```").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Status"], "Active");
    }

    #[test]
    fn test_parse_bare_word_prefix() {
        let rows = parse_rows("json\n{\"rows\":[{\"Score\":\"7\"}]}").unwrap();
        assert_eq!(rows[0]["Score"], "7");
    }

    #[test]
    fn test_parse_surrounding_prose() {
        let rows =
            parse_rows("Here are the rows:\n{\"rows\":[{\"A\":\"1\"}]}\nLet me know!").unwrap();
        assert_eq!(rows[0]["A"], "1");
    }

    #[test]
    fn test_parse_bare_array() {
        let rows = parse_rows(r#"[{"A":"x"},{"A":"y"}]"#).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_non_string_cells_are_stringified() {
        let rows = parse_rows(r#"{"rows":[{"Score":7,"Note":null,"Ok":true}]}"#).unwrap();
        assert_eq!(rows[0]["Score"], "7");
        assert_eq!(rows[0]["Note"], "");
        assert_eq!(rows[0]["Ok"], "true");
    }

    #[test]
    fn test_malformed_payload_fails() {
        assert!(matches!(
            parse_rows("{\"rows\": [ {\"Status\": "),
            Err(WireError::StructuredParse(_))
        ));
        assert!(parse_rows("I could not do that").is_err());
        assert!(parse_rows("").is_err());
    }

    #[test]
    fn test_rows_must_be_objects() {
        assert!(parse_rows(r#"{"rows":["a","b"]}"#).is_err());
    }

    #[test]
    fn test_object_without_rows_fails() {
        assert!(rows_from_value(&serde_json::json!({"data": [{"A": "1"}]})).is_err());
    }

    #[test]
    fn test_nested_array_is_recovered_from_text() {
        let rows = parse_rows(r#"{"data":[{"A":"1"}]}"#).unwrap();
        assert_eq!(rows[0]["A"], "1");
    }
}
