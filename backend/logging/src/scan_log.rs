//! Scan audit trail
//!
//! One structured entry per scan outcome or export, written through
//! `tracing` under the `scan_events` target. Only counts and formats are
//! recorded, never household data.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanOutcome {
    Completed { members: usize, latency_ms: u64 },
    Failed { error_msg: String },
    Exported { format: String },
}

#[derive(Debug, Serialize)]
pub struct ScanLogEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: ScanOutcome,
}

pub struct ScanLogger;

impl ScanLogger {
    /// Build the entry that [`ScanLogger::log_event`] writes.
    pub fn entry(session_id: &str, mut event: ScanOutcome) -> ScanLogEntry {
        if let ScanOutcome::Failed { error_msg } = &mut event {
            *error_msg = redact_sensitive_data(error_msg);
        }
        ScanLogEntry {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            event,
        }
    }

    pub fn log_event(session_id: &str, event: ScanOutcome) {
        let entry = Self::entry(session_id, event);
        let json = serde_json::to_string(&entry).unwrap_or_default();
        info!(target: "scan_events", session = %entry.session_id, event = %json, "Scan event");
    }
}
