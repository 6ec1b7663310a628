//! Scan session state machine.
//!
//! `Idle -> Loading -> Loaded | Failed`, with `reset` returning to `Idle`
//! from anywhere. While `Loading`, new uploads are refused. A failed
//! extraction keeps nothing from the attempt. Every transition is broadcast
//! as a [`SessionEvent`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use kkscan_logging::redact_sensitive_data;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::editor::{EditorView, ResultEditor};
use crate::error::{ExtractionError, SessionError, EXTRACTION_FAILED_MESSAGE};
use crate::event::{SessionEvent, SessionEventKind};
use crate::export::{record_json, CopiedFlags, CopyKind};
use crate::traits::Extractor;
use crate::types::{HouseholdField, KartuKeluargaData, MemberField};
use crate::viewer::{ViewerAction, ViewerSnapshot, ViewerState};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanStatus {
    Idle,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug)]
enum ScanPhase {
    Idle,
    Loading,
    Loaded(ResultEditor),
    Failed { message: String },
}

/// Proof that a scan was started; results for older tickets are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTicket {
    generation: u64,
}

/// A CSV download: file name and contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDownload {
    pub filename: String,
    pub content: String,
}

/// Everything a front end needs to render the session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub status: ScanStatus,
    pub busy: bool,
    pub has_image: bool,
    pub error: Option<String>,
    pub editor: Option<EditorView>,
    pub viewer: Option<ViewerSnapshot>,
    pub copied: Vec<CopyKind>,
}

pub struct ScanSession {
    id: Uuid,
    phase: ScanPhase,
    image: Option<String>,
    viewer: ViewerState,
    copied: CopiedFlags,
    generation: u64,
    events: broadcast::Sender<SessionEvent>,
}

impl ScanSession {
    pub fn new(copied_window: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            id: Uuid::new_v4(),
            phase: ScanPhase::Idle,
            image: None,
            viewer: ViewerState::new(),
            copied: CopiedFlags::new(copied_window),
            generation: 0,
            events,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> ScanStatus {
        match self.phase {
            ScanPhase::Idle => ScanStatus::Idle,
            ScanPhase::Loading => ScanStatus::Loading,
            ScanPhase::Loaded(_) => ScanStatus::Loaded,
            ScanPhase::Failed { .. } => ScanStatus::Failed,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, ScanPhase::Loading)
    }

    /// The uploaded image as a data URI, for preview.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, kind: SessionEventKind) {
        debug!(session = %self.id, event = %kind, "Session event");
        // No receivers is fine.
        let _ = self.events.send(SessionEvent::new(self.id, kind));
    }

    /// Accept an encoded image and enter `Loading`. Any prior result, error
    /// and view state are discarded.
    pub fn begin_scan(&mut self, image_data_uri: String) -> Result<ScanTicket, SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        self.generation += 1;
        self.phase = ScanPhase::Loading;
        self.image = Some(image_data_uri);
        self.viewer = ViewerState::new();
        self.copied.clear();
        info!(session = %self.id, generation = self.generation, "Scan started");
        self.emit(SessionEventKind::ScanStarted);
        Ok(ScanTicket {
            generation: self.generation,
        })
    }

    /// Apply the outcome of the extraction started with `ticket`.
    pub fn finish_scan(
        &mut self,
        ticket: ScanTicket,
        result: Result<KartuKeluargaData, ExtractionError>,
    ) -> Result<(), SessionError> {
        if ticket.generation != self.generation || !self.is_busy() {
            warn!(session = %self.id, "Dropping stale scan result");
            return Err(SessionError::StaleScan);
        }

        match result {
            Ok(record) => {
                let members = record.anggota_keluarga.len();
                self.phase = ScanPhase::Loaded(ResultEditor::new(record));
                info!(session = %self.id, members, "Scan completed");
                self.emit(SessionEventKind::ScanCompleted { members });
                Ok(())
            }
            Err(e) => {
                warn!(session = %self.id, error = %failure_detail(&e), "Scan failed");
                self.phase = ScanPhase::Failed {
                    message: EXTRACTION_FAILED_MESSAGE.to_string(),
                };
                self.image = None;
                self.viewer = ViewerState::new();
                self.emit(SessionEventKind::ScanFailed {
                    message: EXTRACTION_FAILED_MESSAGE.to_string(),
                });
                Err(SessionError::Extraction(e))
            }
        }
    }

    /// Acknowledge a failure and return to `Idle`.
    pub fn dismiss_error(&mut self) {
        if matches!(self.phase, ScanPhase::Failed { .. }) {
            self.phase = ScanPhase::Idle;
            self.emit(SessionEventKind::Reset);
        }
    }

    /// Discard result, image and view state. An extraction still in flight
    /// will have its result dropped.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.phase = ScanPhase::Idle;
        self.image = None;
        self.viewer = ViewerState::new();
        self.copied.clear();
        info!(session = %self.id, "Session reset");
        self.emit(SessionEventKind::Reset);
    }

    pub fn editor(&self) -> Result<&ResultEditor, SessionError> {
        match &self.phase {
            ScanPhase::Loaded(editor) => Ok(editor),
            _ => Err(SessionError::NoResult),
        }
    }

    fn editor_mut(&mut self) -> Result<&mut ResultEditor, SessionError> {
        match &mut self.phase {
            ScanPhase::Loaded(editor) => Ok(editor),
            _ => Err(SessionError::NoResult),
        }
    }

    pub fn set_member_field(
        &mut self,
        index: usize,
        field: MemberField,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.editor_mut()?.set_member_field(index, field, value)?;
        self.emit(SessionEventKind::RecordEdited);
        Ok(())
    }

    pub fn set_household_field(
        &mut self,
        field: HouseholdField,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.editor_mut()?.set_household_field(field, value);
        self.emit(SessionEventKind::RecordEdited);
        Ok(())
    }

    /// Drop all edits and go back to the record as extracted.
    pub fn revert(&mut self) -> Result<(), SessionError> {
        self.editor_mut()?.revert();
        self.emit(SessionEventKind::RecordEdited);
        Ok(())
    }

    pub fn select(&mut self, index: usize) -> Result<(), SessionError> {
        self.editor_mut()?.select(index)?;
        self.emit(SessionEventKind::SelectionChanged { index });
        Ok(())
    }

    pub fn viewer(&self) -> &ViewerState {
        &self.viewer
    }

    /// Apply pan/zoom input. Only meaningful while an image is present.
    pub fn apply_viewer(&mut self, action: ViewerAction) -> Result<ViewerSnapshot, SessionError> {
        if self.image.is_none() {
            return Err(SessionError::NoResult);
        }
        self.viewer.apply(action);
        self.emit(SessionEventKind::ViewerChanged);
        Ok(self.viewer.snapshot())
    }

    fn mark_copied(&mut self, kind: CopyKind, now: Instant) {
        self.copied.mark(kind, now);
        self.emit(SessionEventKind::Copied { kind });
    }

    /// Tab-separated data row for the focal member.
    pub fn copy_row(&mut self, now: Instant) -> Result<String, SessionError> {
        let row = self.editor()?.export_row()?.to_tsv_row();
        self.mark_copied(CopyKind::Row, now);
        Ok(row)
    }

    /// Header line plus data row, tab-separated.
    pub fn copy_table(&mut self, now: Instant) -> Result<String, SessionError> {
        let table = self.editor()?.export_row()?.to_tsv_table();
        self.mark_copied(CopyKind::Table, now);
        Ok(table)
    }

    /// The whole edited record as indented JSON.
    pub fn copy_json(&mut self, now: Instant) -> Result<String, SessionError> {
        let json = record_json(self.editor()?.current())?;
        self.mark_copied(CopyKind::Json, now);
        Ok(json)
    }

    pub fn download_csv(&self) -> Result<CsvDownload, SessionError> {
        let row = self.editor()?.export_row()?;
        Ok(CsvDownload {
            filename: row.csv_filename(),
            content: row.to_csv()?,
        })
    }

    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        let (error, editor) = match &self.phase {
            ScanPhase::Failed { message } => (Some(message.clone()), None),
            ScanPhase::Loaded(editor) => (None, editor.view().ok()),
            _ => (None, None),
        };
        SessionSnapshot {
            id: self.id,
            status: self.status(),
            busy: self.is_busy(),
            has_image: self.image.is_some(),
            error,
            editor,
            viewer: self.image.as_ref().map(|_| self.viewer.snapshot()),
            copied: self.copied.active(now),
        }
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000))
    }
}

/// Log-safe text of an extraction failure; provider bodies can echo keys.
fn failure_detail(e: &ExtractionError) -> String {
    redact_sensitive_data(&e.to_string())
}

/// Run one upload through `extractor`. The session lock is not held while
/// the extraction is awaited; the busy state keeps other uploads out.
pub async fn run_scan(
    session: &Mutex<ScanSession>,
    extractor: &dyn Extractor,
    image_data_uri: String,
) -> Result<(), SessionError> {
    let ticket = {
        let mut guard = session.lock().await;
        guard.begin_scan(image_data_uri.clone())?
    };

    debug!(provider = extractor.name(), "Awaiting extraction");
    let result = extractor.extract(&image_data_uri).await;

    session.lock().await.finish_scan(ticket, result)
}

/// [`run_scan`] on its own task. The scan settles even if the caller stops
/// awaiting the handle, e.g. when an HTTP client disconnects mid-upload.
pub fn spawn_scan(
    session: Arc<Mutex<ScanSession>>,
    extractor: Arc<dyn Extractor>,
    image_data_uri: String,
) -> JoinHandle<Result<(), SessionError>> {
    tokio::spawn(async move { run_scan(&session, extractor.as_ref(), image_data_uri).await })
}
