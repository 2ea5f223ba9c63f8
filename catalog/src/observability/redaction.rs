//! Substring-match masking of sensitive fields (headers, password-like keys).

use serde_json::Value;

/// Default sensitive-field substrings, matched case-insensitively against
/// map keys. Configurable via `log.sensitive_fields`.
pub const DEFAULT_SENSITIVE_FIELDS: &[&str] = &["authorization", "cookie", "set-cookie", "x-api-key", "password", "secret", "token"];

pub fn is_sensitive_key(key: &str, patterns: &[String]) -> bool {
    let lower = key.to_ascii_lowercase();
    patterns.iter().any(|p| lower.contains(&p.to_ascii_lowercase()))
}

/// Recursively mask any object keys matching a sensitive pattern, replacing
/// their value with `"***REDACTED***"` in place.
pub fn redact_value(value: &mut Value, patterns: &[String]) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if is_sensitive_key(key, patterns) {
                    *val = Value::String("***REDACTED***".to_string());
                } else {
                    redact_value(val, patterns);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                redact_value(item, patterns);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn default_patterns() -> Vec<String> {
        DEFAULT_SENSITIVE_FIELDS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn masks_known_sensitive_headers() {
        let mut body = json!({
            "Authorization": "Bearer secret-value",
            "Cookie": "session=abc",
            "Set-Cookie": "session=abc; Path=/",
            "X-API-Key": "key-123",
            "password": "hunter2",
            "name": "Цемент",
        });
        redact_value(&mut body, &default_patterns());
        assert_eq!(body["Authorization"], "***REDACTED***");
        assert_eq!(body["Cookie"], "***REDACTED***");
        assert_eq!(body["Set-Cookie"], "***REDACTED***");
        assert_eq!(body["X-API-Key"], "***REDACTED***");
        assert_eq!(body["password"], "***REDACTED***");
        assert_eq!(body["name"], "Цемент");
    }

    #[test]
    fn nested_objects_are_redacted() {
        let mut body = json!({"headers": {"authorization": "Bearer x"}});
        redact_value(&mut body, &default_patterns());
        assert_eq!(body["headers"]["authorization"], "***REDACTED***");
    }
}
