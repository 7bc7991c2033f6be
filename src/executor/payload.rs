use serde_json::{Value, json};

/// Cap a response body at `max_chars` characters of its JSON serialization.
///
/// Oversized bodies become `{truncated, originalSize, data}` where `data` is
/// the prefix re-parsed as JSON, or the raw prefix text when it does not
/// parse on its own.
pub fn sanitize_body(body: Value, max_chars: usize) -> Value {
    match &body {
        Value::Null => return Value::Null,
        Value::String(text) if text.is_empty() => return Value::Null,
        _ => {}
    }

    let serialized = body.to_string();
    let original_size = serialized.chars().count();
    if original_size <= max_chars {
        return body;
    }

    let prefix: String = serialized.chars().take(max_chars).collect();
    let data = serde_json::from_str(&prefix).unwrap_or(Value::String(prefix));
    json!({
        "truncated": true,
        "originalSize": original_size,
        "data": data,
    })
}
