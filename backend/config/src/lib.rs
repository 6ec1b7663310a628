//! `kkscan-config`: KK Scanner runtime configuration.
//!
//! Provides:
//! - Typed config schema
//! - YAML read/write with backup rotation
//! - `${ENV_VAR}` substitution and environment overrides
//! - Config redaction for display
//! - Default value application and validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{
    apply_env_overrides, apply_env_overrides_with, collect_referenced_vars, resolve_env_vars,
    resolve_env_vars_with, MissingEnvVarError,
};
pub use io::{config_dir, config_file_path, load_config, load_raw_config, write_config};
pub use redact::{collect_redacted_paths, redact};
pub use schema::KkScanConfig;
pub use validation::{require_api_key, validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Load a config file, substitute env vars, apply defaults and env
/// overrides, then validate.
///
/// Validation problems are logged. Only an unreadable file, an unresolved
/// `${VAR}` or a structurally invalid document is an error.
pub async fn load_and_prepare(path: &Path) -> Result<KkScanConfig> {
    let raw = load_raw_config(path).await?;
    prepare(raw, &std::env::vars().collect())
}

/// The processing pipeline of [`load_and_prepare`] over an in-memory tree.
pub fn prepare(raw: serde_json::Value, env: &HashMap<String, String>) -> Result<KkScanConfig> {
    let referenced = collect_referenced_vars(&raw);
    if !referenced.is_empty() {
        tracing::debug!(vars = ?referenced, "Config references env vars");
    }
    let value = resolve_env_vars_with(&raw, env).context("Failed to resolve env vars in config")?;

    let config: KkScanConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_all_defaults(config);
    let config = apply_env_overrides_with(config, env);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pipeline_order() {
        let raw = json!({
            "gemini": { "apiKey": "${MY_KEY}" },
            "server": { "port": 9000 }
        });
        let env: HashMap<String, String> = [("MY_KEY", "from-file"), ("KKSCAN_PORT", "9200")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let cfg = prepare(raw, &env).unwrap();
        assert_eq!(cfg.api_key(), Some("from-file"));
        assert_eq!(cfg.port(), 9200);
        assert_eq!(cfg.model(), defaults::DEFAULT_MODEL);
    }

    #[test]
    fn unresolved_reference_fails() {
        let raw = json!({ "gemini": { "apiKey": "${NOT_SET_ANYWHERE}" } });
        assert!(prepare(raw, &HashMap::new()).is_err());
    }
}
