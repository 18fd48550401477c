//! Config redaction: masks secrets so a config snapshot can be logged.

use serde_json::Value;

/// Keys whose string values are secrets.
static SENSITIVE_KEYS: &[&str] = &[
    "apiKey",
    "apiToken",
    "channelSecret",
    "channelAccessToken",
    "credentialsJson",
    "token",
    "secret",
    "password",
    "privateKey",
];

/// Redact a config JSON value, replacing all sensitive fields.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

/// Mask a single secret: first 4 chars + `***`, or just `***` when short.
pub fn mask_secret(s: &str) -> String {
    if s.chars().count() > 8 {
        format!("{}***", s.chars().take(4).collect::<String>())
    } else {
        "***".to_string()
    }
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if is_sensitive_key(key) && !s.is_empty() => Value::String(mask_secret(s)),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter().map(|(k, v)| (k.clone(), redact_recursive(v, k))).collect(),
        ),
        other => other.clone(),
    }
}
