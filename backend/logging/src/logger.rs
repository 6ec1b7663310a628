//! Structured Logger
//!
//! Wraps `tracing` with a console layer, a daily-rolling JSON file and
//! `RUST_LOG`-based level control.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the global logger: console plus `log_dir/kkscan.log.YYYY-MM-DD`.
/// A second call is a no-op.
pub fn init_logger<P: AsRef<Path>>(log_dir: P, level: &str) {
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "kkscan.log");

    let file_layer = fmt::layer()
        .json()
        .with_writer(file_appender)
        .with_ansi(false);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

/// Console-only logger on stderr, for one-shot commands whose stdout is
/// the output.
pub fn init_console_logger(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
