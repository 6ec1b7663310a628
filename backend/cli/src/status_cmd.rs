//! CLI Status Command
//!
//! Asks a running gateway for its health report.

use anyhow::Result;
use kkscan_config::KkScanConfig;

use crate::terminal_output::{note_success, note_warn};

/// Address to reach the server on; a wildcard bind is reached via loopback.
pub fn health_url(config: &KkScanConfig) -> String {
    let host = match config.bind() {
        "0.0.0.0" | "::" => "127.0.0.1",
        other => other,
    };
    let host = if host.contains(':') { format!("[{host}]") } else { host.to_string() };
    format!("http://{}:{}/api/health", host, config.port())
}

pub async fn run(config: &KkScanConfig) -> Result<()> {
    let url = health_url(config);
    let client = reqwest::Client::new();
    match client.get(&url).send().await {
        Ok(resp) => {
            let body: serde_json::Value = resp.json().await?;
            note_success(&format!("kkscan is running at {url}"));
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Err(_) => {
            note_warn(&format!("kkscan is not running on port {}", config.port()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kkscan_config::schema::ServerConfig;

    fn at(bind: &str) -> KkScanConfig {
        KkScanConfig {
            server: Some(ServerConfig {
                bind: Some(bind.into()),
                port: Some(9000),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn wildcard_bind_uses_loopback() {
        assert_eq!(health_url(&at("0.0.0.0")), "http://127.0.0.1:9000/api/health");
        assert_eq!(health_url(&at("10.0.0.5")), "http://10.0.0.5:9000/api/health");
        assert_eq!(health_url(&at("::1")), "http://[::1]:9000/api/health");
    }
}
