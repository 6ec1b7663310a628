//! Config validation: collects errors and warnings with field paths.

use crate::schema::KkScanConfig;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &KkScanConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_gemini(config, &mut report);
    validate_limits(config, &mut report);
    report
}

fn validate_server(config: &KkScanConfig, report: &mut ValidationReport) {
    let port = config.port();
    if port == 0 {
        report.error("server.port", "port must be > 0");
    } else if port < 1024 {
        report.warn(
            "server.port",
            format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
        );
    }
    if config.bind().parse::<std::net::IpAddr>().is_err() {
        report.error(
            "server.bind",
            format!("'{}' is not an IP address", config.bind()),
        );
    }
    for (i, origin) in config.allowed_origins().iter().enumerate() {
        if !(origin.starts_with("http://") || origin.starts_with("https://")) {
            report.error(
                format!("server.allowedOrigins[{i}]"),
                "origin must start with http:// or https://",
            );
        }
    }
}

/// A missing key is only a warning here; commands that call the model
/// check it themselves.
fn validate_gemini(config: &KkScanConfig, report: &mut ValidationReport) {
    if config.api_key().is_none() {
        report.warn(
            "gemini.apiKey",
            "No API key configured; set GEMINI_API_KEY before scanning",
        );
    }
    if config.model().trim().is_empty() {
        report.error("gemini.model", "model cannot be empty");
    }
    let base = config.base_url();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        report.error("gemini.baseUrl", "baseUrl must be an http(s) URL");
    }
    if config.timeout_secs() == Some(0) {
        report.error("gemini.timeoutSecs", "timeoutSecs must be >= 1 when set");
    }
}

fn validate_limits(config: &KkScanConfig, report: &mut ValidationReport) {
    if config.max_upload_bytes() == 0 {
        report.error("intake.maxUploadBytes", "maxUploadBytes must be > 0");
    }
    if config.copied_indicator_ms() == 0 {
        report.warn(
            "export.copiedIndicatorMs",
            "copiedIndicatorMs is 0; copy confirmations will never show",
        );
    }
}

/// Require the credential, for commands that call the model.
pub fn require_api_key(config: &KkScanConfig) -> Result<&str, ConfigValidationError> {
    config.api_key().ok_or_else(|| ConfigValidationError {
        path: "gemini.apiKey".into(),
        message: "API key is required; set GEMINI_API_KEY (or API_KEY) or gemini.apiKey".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{GeminiConfig, IntakeConfig, ServerConfig};

    #[test]
    fn empty_config_is_valid_but_warns_about_key() {
        let report = validate(&KkScanConfig::default());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert_eq!(report.warnings[0].path, "gemini.apiKey");
        assert!(require_api_key(&KkScanConfig::default()).is_err());
    }

    #[test]
    fn bad_values_are_errors() {
        let cfg = KkScanConfig {
            server: Some(ServerConfig {
                bind: Some("localhost".into()),
                port: Some(0),
                allowed_origins: vec!["example.com".into()],
                ..Default::default()
            }),
            gemini: Some(GeminiConfig {
                api_key: Some("k".into()),
                timeout_secs: Some(0),
                ..Default::default()
            }),
            intake: Some(IntakeConfig {
                max_upload_bytes: Some(0),
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        let paths: Vec<_> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "server.port",
                "server.bind",
                "server.allowedOrigins[0]",
                "gemini.timeoutSecs",
                "intake.maxUploadBytes"
            ]
        );
        assert_eq!(require_api_key(&cfg).unwrap(), "k");
    }
}
