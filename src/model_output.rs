// Defensive parsing of LLM output
// Model text is expected to *contain* a JSON object or array, usually
// wrapped in commentary. Extract the first balanced structure and treat
// every field as untrusted.

use serde_json::Value;

/// Find and parse the first balanced JSON object or array in free text.
/// Tolerates leading/trailing prose; returns None when nothing in the
/// text parses.
pub fn extract_json(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    for (start, &b) in bytes.iter().enumerate() {
        if b != b'{' && b != b'[' {
            continue;
        }
        if let Some(end) = balanced_end(bytes, start) {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..end]) {
                return Some(value);
            }
        }
    }
    None
}

/// Byte offset one past the close of the structure opening at `start`,
/// skipping braces inside string literals. Mismatched nesting is caught by
/// the serde parse afterwards, not here.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
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
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

pub fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str())
}

pub fn f64_field(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(|v| v.as_f64())
}

pub fn bool_field(value: &Value, key: &str) -> Option<bool> {
    value.get(key).and_then(|v| v.as_bool())
}

/// The items of `value[key]` when it is an array, or of `value` itself
/// when the model returned a bare array.
pub fn items<'a>(value: &'a Value, key: &str) -> Vec<&'a Value> {
    let array = if let Some(arr) = value.get(key).and_then(|v| v.as_array()) {
        Some(arr)
    } else {
        value.as_array()
    };
    array.map(|a| a.iter().collect()).unwrap_or_default()
}
