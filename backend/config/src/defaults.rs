//! Config defaults: fills every unset field of a freshly loaded config.

use crate::schema::{
    ExportConfig, GeminiConfig, IntakeConfig, KkScanConfig, LoggingConfig, ServerConfig,
};

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// 5 MiB upload ceiling.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// How long a "copied" confirmation stays visible.
pub const DEFAULT_COPIED_INDICATOR_MS: u64 = 2000;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Idle sessions are evicted after 30 minutes.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: KkScanConfig) -> KkScanConfig {
    let config = apply_server_defaults(config);
    let config = apply_gemini_defaults(config);
    let config = apply_intake_defaults(config);
    let config = apply_export_defaults(config);
    apply_logging_defaults(config)
}

fn apply_server_defaults(mut config: KkScanConfig) -> KkScanConfig {
    let server = config.server.get_or_insert_with(ServerConfig::default);
    if server.bind.is_none() {
        server.bind = Some(DEFAULT_BIND.to_string());
    }
    if server.port.is_none() {
        server.port = Some(DEFAULT_PORT);
    }
    if server.session_ttl_secs.is_none() {
        server.session_ttl_secs = Some(DEFAULT_SESSION_TTL_SECS);
    }
    config
}

/// Model and endpoint only; the key and the timeout stay unset.
fn apply_gemini_defaults(mut config: KkScanConfig) -> KkScanConfig {
    let gemini = config.gemini.get_or_insert_with(GeminiConfig::default);
    if gemini.model.is_none() {
        gemini.model = Some(DEFAULT_MODEL.to_string());
    }
    if gemini.base_url.is_none() {
        gemini.base_url = Some(DEFAULT_BASE_URL.to_string());
    }
    config
}

fn apply_intake_defaults(mut config: KkScanConfig) -> KkScanConfig {
    let intake = config.intake.get_or_insert_with(IntakeConfig::default);
    if intake.max_upload_bytes.is_none() {
        intake.max_upload_bytes = Some(DEFAULT_MAX_UPLOAD_BYTES);
    }
    config
}

fn apply_export_defaults(mut config: KkScanConfig) -> KkScanConfig {
    let export = config.export.get_or_insert_with(ExportConfig::default);
    if export.copied_indicator_ms.is_none() {
        export.copied_indicator_ms = Some(DEFAULT_COPIED_INDICATOR_MS);
    }
    config
}

fn apply_logging_defaults(mut config: KkScanConfig) -> KkScanConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_section() {
        let cfg = apply_all_defaults(KkScanConfig::default());
        assert_eq!(cfg.server.as_ref().unwrap().port, Some(DEFAULT_PORT));
        assert_eq!(cfg.server.as_ref().unwrap().session_ttl_secs, Some(1800));
        assert_eq!(cfg.gemini.as_ref().unwrap().model.as_deref(), Some(DEFAULT_MODEL));
        assert_eq!(cfg.gemini.as_ref().unwrap().timeout_secs, None);
        assert_eq!(cfg.gemini.as_ref().unwrap().api_key, None);
        assert_eq!(cfg.intake.as_ref().unwrap().max_upload_bytes, Some(5 * 1024 * 1024));
        assert_eq!(cfg.export.as_ref().unwrap().copied_indicator_ms, Some(2000));
        assert_eq!(cfg.logging.as_ref().unwrap().level.as_deref(), Some("info"));
    }

    #[test]
    fn keeps_explicit_values() {
        let cfg = KkScanConfig {
            server: Some(ServerConfig {
                port: Some(9000),
                ..Default::default()
            }),
            ..Default::default()
        };
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.port(), 9000);
        assert_eq!(cfg.bind(), DEFAULT_BIND);
    }
}
