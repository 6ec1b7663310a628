//! Image intake: accept one file, check it is an image within the size
//! ceiling, and encode it as a base64 data URI. The same string serves as
//! the local preview and as the extraction payload.

use std::path::Path;

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info};

use crate::mime_detect::{detect_mime_type, is_generic, is_image, sniff_image_mime};

/// Upload ceiling: 5 MiB.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Rejections reported next to the upload control. None of them touch an
/// existing record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("Mohon unggah file gambar (JPG, PNG).")]
    NotAnImage { mime_type: String },

    #[error("Ukuran file terlalu besar. Maksimal {}MB.", .limit / (1024 * 1024))]
    TooLarge { size: usize, limit: usize },

    #[error("File gambar kosong.")]
    Empty,

    #[error("Data URI tidak valid: {0}")]
    InvalidDataUri(String),

    #[error("Gagal membaca file: {0}")]
    Read(String),
}

/// One user-provided file.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub mime_type: String,
    pub data: Bytes,
}

impl ImageUpload {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: None,
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Replace a missing or generic label with one sniffed from the bytes.
    pub fn resolve_mime(mut self) -> Self {
        if is_generic(&self.mime_type) {
            if let Some(sniffed) = sniff_image_mime(&self.data) {
                debug!(mime = sniffed, "Sniffed upload MIME type");
                self.mime_type = sniffed.to_string();
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn to_data_uri(&self) -> String {
        encode_data_uri(&self.mime_type, &self.data)
    }
}

/// Validates uploads against the type and size rules.
#[derive(Debug, Clone, Copy)]
pub struct ImageIntake {
    max_bytes: usize,
}

impl ImageIntake {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn validate(&self, upload: &ImageUpload) -> Result<(), IntakeError> {
        if !is_image(&upload.mime_type) {
            return Err(IntakeError::NotAnImage {
                mime_type: upload.mime_type.clone(),
            });
        }
        if upload.len() > self.max_bytes {
            return Err(IntakeError::TooLarge {
                size: upload.len(),
                limit: self.max_bytes,
            });
        }
        if upload.is_empty() {
            return Err(IntakeError::Empty);
        }
        Ok(())
    }

    /// Validate and encode. Returns the data URI for preview and extraction.
    pub fn accept(&self, upload: &ImageUpload) -> Result<String, IntakeError> {
        self.validate(upload)?;
        info!(
            file = upload.file_name.as_deref().unwrap_or("-"),
            mime = %upload.mime_type,
            bytes = upload.len(),
            "Image accepted"
        );
        Ok(upload.to_data_uri())
    }

    /// Accept and hand the data URI to `on_accepted`. Rejections are returned,
    /// the callback only runs on success.
    pub fn accept_with<F>(&self, upload: &ImageUpload, on_accepted: F) -> Result<(), IntakeError>
    where
        F: FnOnce(String),
    {
        let uri = self.accept(upload)?;
        on_accepted(uri);
        Ok(())
    }

    /// Accept an image that arrives already encoded as a data URI.
    pub fn accept_data_uri(&self, data_uri: &str) -> Result<String, IntakeError> {
        let upload = decode_data_uri(data_uri)?;
        self.accept(&upload)
    }

    /// Read a file from disk, labelling it by extension (then by content).
    pub async fn read_file(&self, path: &Path) -> Result<ImageUpload, IntakeError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| IntakeError::Read(format!("{}: {}", path.display(), e)))?;
        // Refuse before loading an oversized file into memory.
        if meta.len() > self.max_bytes as u64 {
            return Err(IntakeError::TooLarge {
                size: meta.len() as usize,
                limit: self.max_bytes,
            });
        }
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| IntakeError::Read(format!("{}: {}", path.display(), e)))?;

        let mut upload = ImageUpload::new(detect_mime_type(path), data).resolve_mime();
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            upload = upload.with_file_name(name);
        }
        Ok(upload)
    }
}

impl Default for ImageIntake {
    fn default() -> Self {
        Self::new(MAX_UPLOAD_BYTES)
    }
}

pub fn encode_data_uri(mime_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
}

/// Split a data URI into its MIME type (if any) and base64 payload.
/// A string without a `,` is taken to be a bare payload.
pub fn split_data_uri(data_uri: &str) -> (Option<&str>, &str) {
    match data_uri.split_once(',') {
        Some((header, payload)) => {
            let mime = header
                .strip_prefix("data:")
                .and_then(|h| h.split(';').next())
                .filter(|m| !m.is_empty());
            (mime, payload)
        }
        None => (None, data_uri),
    }
}

/// Decode a base64 data URI back into an upload.
pub fn decode_data_uri(data_uri: &str) -> Result<ImageUpload, IntakeError> {
    let (mime, payload) = split_data_uri(data_uri.trim());
    let data = STANDARD
        .decode(payload.trim())
        .map_err(|e| IntakeError::InvalidDataUri(e.to_string()))?;
    Ok(ImageUpload::new(mime.unwrap_or(""), data).resolve_mime())
}
