//! Effective configuration for the CLI: file location, logging paths and
//! the extraction client built from it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use kkscan_config::{
    apply_all_defaults, collect_redacted_paths, config_dir, config_file_path, load_and_prepare,
    redact, require_api_key, write_config, KkScanConfig,
};
use kkscan_core::Extractor;
use kkscan_understanding::GeminiExtractor;

/// A loaded config together with the file it came from.
pub struct Settings {
    pub config: KkScanConfig,
    pub path: PathBuf,
}

impl Settings {
    /// Load from `path`, or from the default location.
    pub async fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = path.unwrap_or_else(|| config_file_path(&config_dir()));
        let config = load_and_prepare(&path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        Ok(Self { config, path })
    }

    /// `logging.dir`, else `logs/` next to the config file.
    pub fn log_dir(&self) -> PathBuf {
        match self.config.log_dir() {
            Some(dir) => dir.clone(),
            None => self
                .path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(config_dir)
                .join("logs"),
        }
    }
}

/// Build the Gemini client. Fails fast when no API key is configured.
pub fn build_extractor(config: &KkScanConfig) -> Result<Arc<dyn Extractor>> {
    let api_key = require_api_key(config)?;
    let mut extractor = GeminiExtractor::new(api_key)
        .with_model(config.model())
        .with_base_url(config.base_url());
    if let Some(secs) = config.timeout_secs() {
        extractor = extractor
            .with_timeout(Duration::from_secs(secs))
            .context("Failed to build HTTP client")?;
    }
    Ok(Arc::new(extractor))
}

/// The effective config as YAML with secrets masked, plus the masked paths.
pub fn render_redacted(config: &KkScanConfig) -> Result<(String, Vec<String>)> {
    let value = serde_json::to_value(config).context("Failed to serialize config")?;
    let yaml = serde_yaml::to_string(&redact(&value)).context("Failed to render config as YAML")?;
    Ok((yaml, collect_redacted_paths(&value)))
}

/// Starter config: every default spelled out. The key is left out; it
/// comes from `GEMINI_API_KEY` or `API_KEY` at load time.
pub fn starter_config() -> KkScanConfig {
    apply_all_defaults(KkScanConfig::default())
}

/// Write [`starter_config`] to `path`. Refuses to overwrite.
pub async fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    write_config(&starter_config(), path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use kkscan_config::prepare;
    use kkscan_config::schema::{GeminiConfig, LoggingConfig};
    use std::collections::HashMap;

    fn with_key(key: Option<&str>) -> KkScanConfig {
        KkScanConfig {
            gemini: Some(GeminiConfig {
                api_key: key.map(String::from),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn extractor_requires_api_key() {
        let err = build_extractor(&with_key(None)).err().unwrap();
        assert!(err.to_string().contains("gemini.apiKey"));
        let extractor = build_extractor(&with_key(Some("AIzaTest"))).unwrap();
        assert_eq!(extractor.name(), "gemini");
    }

    #[test]
    fn redacted_yaml_hides_key() {
        let (yaml, masked) = render_redacted(&with_key(Some("AIzaSySecretValue"))).unwrap();
        assert!(yaml.contains("AIza***"));
        assert!(!yaml.contains("SecretValue"));
        assert_eq!(masked, vec!["gemini.apiKey".to_string()]);
    }

    #[test]
    fn starter_takes_key_from_either_env_var() {
        let raw = serde_json::to_value(starter_config()).unwrap();
        let env = |pairs: &[(&str, &str)]| -> HashMap<String, String> {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };

        let cfg = prepare(raw.clone(), &env(&[("API_KEY", "AIzaFromApiKey")])).unwrap();
        assert_eq!(cfg.api_key(), Some("AIzaFromApiKey"));
        assert!(build_extractor(&cfg).is_ok());

        let cfg = prepare(raw.clone(), &env(&[("GEMINI_API_KEY", "AIzaFromGemini")])).unwrap();
        assert_eq!(cfg.api_key(), Some("AIzaFromGemini"));

        let cfg = prepare(raw, &HashMap::new()).unwrap();
        assert_eq!(cfg.api_key(), None);
        assert!(render_redacted(&cfg).is_ok());
        assert!(build_extractor(&cfg).is_err());
    }

    #[tokio::test]
    async fn init_writes_starter_once() {
        let dir = std::env::temp_dir().join(format!("kkscan-cli-init-{}", std::process::id()));
        let path = config_file_path(&dir);
        let _ = tokio::fs::remove_dir_all(&dir).await;

        init_config(&path).await.unwrap();
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(!written.contains("apiKey"));
        assert!(written.contains("8787"));
        assert!(init_config(&path).await.is_err());
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[test]
    fn log_dir_defaults_next_to_config() {
        let settings = Settings {
            config: KkScanConfig::default(),
            path: PathBuf::from("/etc/kkscan/config.yaml"),
        };
        assert_eq!(settings.log_dir(), PathBuf::from("/etc/kkscan/logs"));

        let settings = Settings {
            config: KkScanConfig {
                logging: Some(LoggingConfig {
                    dir: Some(PathBuf::from("/var/log/kkscan")),
                    ..Default::default()
                }),
                ..Default::default()
            },
            path: PathBuf::from("/etc/kkscan/config.yaml"),
        };
        assert_eq!(settings.log_dir(), PathBuf::from("/var/log/kkscan"));
    }
}
