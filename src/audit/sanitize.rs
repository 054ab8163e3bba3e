//! Payload sanitization for audit logging.
//!
//! Request payloads land in the audit log verbatim otherwise; secrets the
//! manager embeds in an action payload (credentials for an update source,
//! analytics tokens) must never be persisted, and oversized bodies are
//! truncated to keep the log readable.

use serde_json::{Map, Value};

/// Substrings that mark a key as sensitive.
const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "secret",
    "key",
    "token",
    "signature",
    "credential",
    "auth",
];

/// Keys whose string values may be large request bodies.
const BULKY_KEYS: &[&str] = &["content", "body", "package", "payload"];

/// Maximum string length kept in the log.
const MAX_STRING_LENGTH: usize = 1024;

/// Produce a sanitized copy of a payload for the audit log.
pub fn sanitize_payload(payload: &Value) -> Value {
    walk(payload, false)
}

fn walk(value: &Value, truncatable: bool) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, val) in map {
                let lower = key.to_lowercase();
                if SENSITIVE_KEYS.iter().any(|s| lower.contains(s)) {
                    out.insert(key.clone(), Value::String("[REDACTED]".to_string()));
                } else {
                    let bulky = BULKY_KEYS.iter().any(|s| lower.contains(s));
                    out.insert(key.clone(), walk(val, bulky));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| walk(v, truncatable)).collect()),
        Value::String(s) if truncatable && s.len() > MAX_STRING_LENGTH => {
            Value::String(format!("[TRUNCATED {} bytes]", s.len()))
        }
        other => other.clone(),
    }
}
