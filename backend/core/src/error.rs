use thiserror::Error;

/// Message shown to the user when an extraction fails, regardless of cause.
pub const EXTRACTION_FAILED_MESSAGE: &str =
    "Terjadi kesalahan saat memproses gambar. Pastikan gambar jelas dan coba lagi.";

/// Failure of the single remote extraction round-trip.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("image payload is not usable: {0}")]
    InvalidImage(String),

    #[error("extraction request failed: {0}")]
    Request(String),

    #[error("extraction provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Gagal mendapatkan respons dari Gemini.")]
    EmptyResponse,

    #[error("extraction response is not valid JSON: {0}")]
    InvalidJson(String),
}

/// Errors raised by the result editor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("household record has no members")]
    NoMembers,

    #[error("member index {index} out of range (record has {len} members)")]
    MemberOutOfRange { index: usize, len: usize },
}

/// Errors raised while serializing an export payload.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv buffer flush failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv output is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the scan session state machine.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("an extraction is already in progress")]
    Busy,

    #[error("no extraction result is loaded")]
    NoResult,

    #[error("scan result arrived after the session moved on")]
    StaleScan,

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}
