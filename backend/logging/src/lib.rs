//! Structured logging for KK Scanner.
//!
//! Handles subscriber setup with file rotation, log redaction, and the scan
//! audit trail.

pub mod logger;
pub mod redact;
pub mod scan_log;

pub use logger::{init_console_logger, init_logger};
pub use redact::redact_sensitive_data;
pub use scan_log::{ScanLogEntry, ScanLogger, ScanOutcome};
