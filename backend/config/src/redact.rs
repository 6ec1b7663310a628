//! Config redaction: a display-safe copy with secrets masked.

use serde_json::Value;

static SENSITIVE_KEYS: &[&str] = &["apiKey", "api_key", "apikey", "token", "secret", "password"];

/// Redact a config JSON value. Sensitive strings keep a 4-character hint
/// followed by `***`.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn redact_string(s: &str, key: &str) -> Value {
    if is_sensitive_key(key) && !s.is_empty() {
        let hint: String = if s.chars().count() > 4 {
            format!("{}***", s.chars().take(4).collect::<String>())
        } else {
            "***".to_string()
        };
        return Value::String(hint);
    }
    Value::String(s.to_string())
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) => redact_string(s, key),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                result.insert(k.clone(), redact_recursive(v, k));
            }
            Value::Object(result)
        }
        other => other.clone(),
    }
}

/// Field paths that [`redact`] would mask.
pub fn collect_redacted_paths(value: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    collect_paths_recursive(value, "", &mut paths);
    paths
}

fn collect_paths_recursive(value: &Value, path: &str, out: &mut Vec<String>) {
    match value {
        Value::String(s) if !s.is_empty() => {
            let key = path.rsplit('.').next().unwrap_or("");
            if is_sensitive_key(key) {
                out.push(path.to_string());
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                collect_paths_recursive(v, &child_path, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_api_key_with_hint() {
        let v = json!({ "gemini": { "apiKey": "AIzaSyD-secret-value", "model": "gemini-3-flash-preview" } });
        let redacted = redact(&v);
        assert_eq!(redacted["gemini"]["apiKey"], "AIza***");
        assert_eq!(redacted["gemini"]["model"], "gemini-3-flash-preview");
        assert_eq!(collect_redacted_paths(&v), vec!["gemini.apiKey".to_string()]);
    }

    #[test]
    fn short_secret_is_fully_masked() {
        let redacted = redact(&json!({ "apiKey": "abc" }));
        assert_eq!(redacted["apiKey"], "***");
    }
}
