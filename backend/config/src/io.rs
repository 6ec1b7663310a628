//! Config file read/write.

use crate::schema::KkScanConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

const CONFIG_FILE_NAME: &str = "config.yaml";

/// Number of rolling backups kept by [`write_config`].
const MAX_BACKUPS: usize = 3;

/// Resolve the config directory.
/// Priority: `KKSCAN_CONFIG_DIR` env > `~/.kkscan/`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("KKSCAN_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".kkscan"),
        None => PathBuf::from(".kkscan"),
    }
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read the config file as an untyped tree, ready for `${VAR}` substitution.
///
/// A missing or empty file yields an empty object (first run).
pub async fn load_raw_config(path: &Path) -> Result<Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    let value: Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(match value {
        Value::Null => Value::Object(Default::default()),
        other => other,
    })
}

/// Load and parse the config without substitution or defaults.
pub async fn load_config(path: &Path) -> Result<KkScanConfig> {
    let value = load_raw_config(path).await?;
    serde_json::from_value(value)
        .with_context(|| format!("Invalid config structure at: {}", path.display()))
}

/// Write config to disk atomically (write to temp file, rename), keeping a
/// rolling backup of the previous file.
pub async fn write_config(config: &KkScanConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create config directory: {}", parent.display())
        })?;
    }

    if path.exists() {
        rotate_backups(path).await;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    let tmp_path = path.with_extension("yaml.tmp");
    fs::write(&tmp_path, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp config: {}", tmp_path.display()))?;

    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to rename temp config to: {}", path.display()))?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}

/// config.yaml.bak.1 → .bak.2 → ... → .bak.N
async fn rotate_backups(path: &Path) {
    for i in (1..MAX_BACKUPS).rev() {
        let old = path.with_extension(format!("yaml.bak.{}", i));
        let new = path.with_extension(format!("yaml.bak.{}", i + 1));
        if old.exists() {
            if let Err(e) = fs::rename(&old, &new).await {
                warn!("Failed to rotate backup {}: {}", old.display(), e);
            }
        }
    }

    let bak = path.with_extension("yaml.bak.1");
    if let Err(e) = fs::copy(path, &bak).await {
        warn!("Failed to create backup {}: {}", bak.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ServerConfig;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("kkscan-config-{}-{}", tag, std::process::id()))
    }

    #[tokio::test]
    async fn missing_file_is_empty_config() {
        let path = temp_dir("missing").join("config.yaml");
        let cfg = load_config(&path).await.unwrap();
        assert_eq!(cfg, KkScanConfig::default());
    }

    #[tokio::test]
    async fn write_then_load_keeps_backup() {
        let dir = temp_dir("write");
        let path = config_file_path(&dir);
        let mut cfg = KkScanConfig {
            server: Some(ServerConfig {
                port: Some(9001),
                ..Default::default()
            }),
            ..Default::default()
        };
        write_config(&cfg, &path).await.unwrap();
        cfg.server.as_mut().unwrap().port = Some(9002);
        write_config(&cfg, &path).await.unwrap();

        let loaded = load_config(&path).await.unwrap();
        assert_eq!(loaded.port(), 9002);
        let backup = load_config(&path.with_extension("yaml.bak.1")).await.unwrap();
        assert_eq!(backup.port(), 9001);
        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn empty_file_is_empty_config() {
        let dir = temp_dir("empty");
        fs::create_dir_all(&dir).await.unwrap();
        let path = config_file_path(&dir);
        fs::write(&path, "").await.unwrap();
        assert_eq!(load_config(&path).await.unwrap(), KkScanConfig::default());
        let _ = fs::remove_dir_all(&dir).await;
    }
}
