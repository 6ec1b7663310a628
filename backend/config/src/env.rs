//! Environment handling for config values.
//!
//! Two passes: `${VAR_NAME}` substitution inside string leaves of the raw
//! file (uppercase `[A-Z_][A-Z0-9_]*` names only, `$${VAR}` escapes to a
//! literal `${VAR}`), then whole-field overrides from well-known variables.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::schema::{GeminiConfig, KkScanConfig, LoggingConfig, ServerConfig};

/// `$${VAR}` (escaped) or `${VAR}`.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Variables consulted for the credential, in priority order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references using the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    substitute_value(value, &std::env::vars().collect(), "")
}

/// Substitute env vars using a provided map.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => {
            let result: Result<Vec<_>> = arr
                .iter()
                .enumerate()
                .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
                .collect();
            Ok(Value::Array(result?))
        }
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut error: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &regex::Captures| {
        let var_name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{var_name}}}");
        }
        match env.get(var_name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                error.get_or_insert_with(|| MissingEnvVarError {
                    var_name: var_name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = error {
        bail!(err);
    }
    Ok(substituted.into_owned())
}

/// Collect all env var names referenced in a config value tree.
pub fn collect_referenced_vars(value: &Value) -> Vec<String> {
    let mut vars = Vec::new();
    collect_vars_recursive(value, &mut vars);
    vars.sort();
    vars.dedup();
    vars
}

fn collect_vars_recursive(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            for caps in ENV_VAR_PATTERN.captures_iter(s) {
                if caps[1].is_empty() {
                    out.push(caps[2].to_string());
                }
            }
        }
        Value::Array(arr) => arr.iter().for_each(|v| collect_vars_recursive(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_vars_recursive(v, out)),
        _ => {}
    }
}

/// Override config fields from the process environment.
pub fn apply_env_overrides(config: KkScanConfig) -> KkScanConfig {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Override config fields from `env`. Blank values are ignored, as is a
/// `KKSCAN_PORT` that is not a valid port.
pub fn apply_env_overrides_with(
    mut config: KkScanConfig,
    env: &HashMap<String, String>,
) -> KkScanConfig {
    let get = |name: &str| env.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());

    if let Some(key) = API_KEY_VARS.iter().find_map(|name| get(name)) {
        debug!("API key taken from environment");
        config.gemini.get_or_insert_with(GeminiConfig::default).api_key = Some(key.to_string());
    }
    if let Some(model) = get("KKSCAN_MODEL") {
        config.gemini.get_or_insert_with(GeminiConfig::default).model = Some(model.to_string());
    }
    if let Some(bind) = get("KKSCAN_BIND") {
        config.server.get_or_insert_with(ServerConfig::default).bind = Some(bind.to_string());
    }
    if let Some(port) = get("KKSCAN_PORT").and_then(|p| p.parse::<u16>().ok()) {
        config.server.get_or_insert_with(ServerConfig::default).port = Some(port);
    }
    if let Some(level) = get("RUST_LOG") {
        config.logging.get_or_insert_with(LoggingConfig::default).level = Some(level.to_string());
    }
    config
}
