use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::export::CopyKind;

/// A state change in one scan session, broadcast to observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: SessionEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEventKind {
    /// An image was accepted and extraction started; uploads are gated.
    ScanStarted,
    /// Extraction finished and the editor holds a fresh copy.
    ScanCompleted { members: usize },
    /// Extraction failed; nothing from it was kept.
    ScanFailed { message: String },
    /// A member-table or household field was edited.
    RecordEdited,
    /// The focal member changed.
    SelectionChanged { index: usize },
    /// Pan/zoom changed.
    ViewerChanged,
    /// A clipboard-style export was produced.
    Copied { kind: CopyKind },
    /// Result, image and view state were discarded.
    Reset,
}

impl SessionEvent {
    pub fn new(session_id: Uuid, kind: SessionEventKind) -> Self {
        Self {
            session_id,
            timestamp: Utc::now(),
            kind,
        }
    }
}

impl std::fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}
