use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static RE_CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*\n?(.*?)\s*```\s*$").unwrap());

/// Removes a markdown code fence wrapped around the whole response.
pub fn strip_code_fences(text: &str) -> &str {
    match RE_CODE_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

/// Parses a model response as JSON. `None` when it is not valid JSON.
///
/// An object whose only value is an array (`{"items": [...]}`) is unwrapped,
/// since models sometimes wrap array answers that way.
pub fn parse_response(text: &str, expect_array: bool) -> Option<Value> {
    let value: Value = serde_json::from_str(strip_code_fences(text)).ok()?;
    if !expect_array {
        return Some(value);
    }
    match value {
        Value::Object(map) if map.len() == 1 => match map.into_iter().next() {
            Some((_, inner @ Value::Array(_))) => Some(inner),
            Some((key, other)) => {
                let mut map = serde_json::Map::new();
                map.insert(key, other);
                Some(Value::Object(map))
            }
            None => None,
        },
        other => Some(other),
    }
}
