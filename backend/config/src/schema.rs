//! KK Scanner runtime configuration schema.
//!
//! Every field is optional on disk; [`crate::apply_all_defaults`] fills the
//! gaps and the accessors on [`KkScanConfig`] fall back to the same values.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::defaults::{
    DEFAULT_BASE_URL, DEFAULT_BIND, DEFAULT_COPIED_INDICATOR_MS, DEFAULT_LOG_LEVEL,
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MODEL, DEFAULT_PORT, DEFAULT_SESSION_TTL_SECS,
};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KkScanConfig {
    /// HTTP server settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// Extraction model and credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<GeminiConfig>,

    /// Upload limits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intake: Option<IntakeConfig>,

    /// Clipboard indicator and CSV output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// CORS origins; empty means any origin.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_origins: Vec<String>,
    /// Sessions untouched this long are dropped; 0 keeps them forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Unset means no client-side timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copied_indicator_ms: Option<u64>,
    /// Where `kkscan scan --format csv` writes its file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved accessors
// ---------------------------------------------------------------------------

impl KkScanConfig {
    pub fn bind(&self) -> &str {
        self.server
            .as_ref()
            .and_then(|s| s.bind.as_deref())
            .unwrap_or(DEFAULT_BIND)
    }

    pub fn port(&self) -> u16 {
        self.server.as_ref().and_then(|s| s.port).unwrap_or(DEFAULT_PORT)
    }

    pub fn allowed_origins(&self) -> &[String] {
        self.server
            .as_ref()
            .map(|s| s.allowed_origins.as_slice())
            .unwrap_or(&[])
    }

    pub fn session_ttl_secs(&self) -> u64 {
        self.server
            .as_ref()
            .and_then(|s| s.session_ttl_secs)
            .unwrap_or(DEFAULT_SESSION_TTL_SECS)
    }

    /// The credential, if configured and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.gemini
            .as_ref()
            .and_then(|g| g.api_key.as_deref())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn model(&self) -> &str {
        self.gemini
            .as_ref()
            .and_then(|g| g.model.as_deref())
            .unwrap_or(DEFAULT_MODEL)
    }

    pub fn base_url(&self) -> &str {
        self.gemini
            .as_ref()
            .and_then(|g| g.base_url.as_deref())
            .unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn timeout_secs(&self) -> Option<u64> {
        self.gemini.as_ref().and_then(|g| g.timeout_secs)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.intake
            .as_ref()
            .and_then(|i| i.max_upload_bytes)
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }

    pub fn copied_indicator_ms(&self) -> u64 {
        self.export
            .as_ref()
            .and_then(|e| e.copied_indicator_ms)
            .unwrap_or(DEFAULT_COPIED_INDICATOR_MS)
    }

    pub fn output_dir(&self) -> Option<&PathBuf> {
        self.export.as_ref().and_then(|e| e.output_dir.as_ref())
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_dir(&self) -> Option<&PathBuf> {
        self.logging.as_ref().and_then(|l| l.dir.as_ref())
    }
}
