//! Spreadsheet export of the focal member's row.
//!
//! Every export reads the edited record, never the raw extraction result.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use csv::{QuoteStyle, Terminator, WriterBuilder};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::types::KartuKeluargaData;

/// Column headers, in export order.
pub const EXPORT_HEADERS: [&str; 21] = [
    "NO KK",
    "NIK",
    "NAMA SISWA",
    "JENIS KELAMIN",
    "TEMPAT LAHIR",
    "TANGGAL LAHIR",
    "NIK AYAH",
    "NAMA AYAH",
    "TEMPAT LAHIR AYAH",
    "TANGGAL LAHIR AYAH",
    "NIK IBU",
    "NAMA IBU",
    "TEMPAT LAHIR IBU",
    "TANGGAL LAHIR IBU",
    "DUSUN",
    "RT",
    "RW",
    "DESA",
    "KECAMATAN",
    "KABUPATEN",
    "PROPINSI",
];

/// Placeholder for a value that was not read.
pub const MISSING: &str = "-";

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Make a value safe for TSV/CSV: tab, CR and LF become spaces, outer
/// whitespace is trimmed, and a missing or blank value becomes `"-"`.
pub fn sanitize(value: Option<&str>) -> String {
    let Some(value) = value else {
        return MISSING.to_string();
    };
    let cleaned = value.replace(['\t', '\n', '\r'], " ");
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        MISSING.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitized projection of one focal member, their parents and the household address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub no_kk: String,
    pub nik: String,
    pub nama: String,
    pub jk: String,
    pub tmp_lahir: String,
    pub tgl_lahir: String,
    pub nik_ayah: String,
    pub nama_ayah: String,
    pub tmp_lahir_ayah: String,
    pub tgl_lahir_ayah: String,
    pub nik_ibu: String,
    pub nama_ibu: String,
    pub tmp_lahir_ibu: String,
    pub tgl_lahir_ibu: String,
    pub dusun: String,
    pub rt: String,
    pub rw: String,
    pub desa: String,
    pub kec: String,
    pub kab: String,
    pub prov: String,
}

impl ExportRow {
    /// Values in [`EXPORT_HEADERS`] order.
    pub fn values(&self) -> [&str; 21] {
        [
            &self.no_kk,
            &self.nik,
            &self.nama,
            &self.jk,
            &self.tmp_lahir,
            &self.tgl_lahir,
            &self.nik_ayah,
            &self.nama_ayah,
            &self.tmp_lahir_ayah,
            &self.tgl_lahir_ayah,
            &self.nik_ibu,
            &self.nama_ibu,
            &self.tmp_lahir_ibu,
            &self.tgl_lahir_ibu,
            &self.dusun,
            &self.rt,
            &self.rw,
            &self.desa,
            &self.kec,
            &self.kab,
            &self.prov,
        ]
    }

    /// Tab-joined data row, ready to paste into a spreadsheet.
    pub fn to_tsv_row(&self) -> String {
        self.values().join("\t")
    }

    /// Header line and data row, tab-joined.
    pub fn to_tsv_table(&self) -> String {
        format!("{}\n{}", EXPORT_HEADERS.join("\t"), self.to_tsv_row())
    }

    /// Header line plus a data row whose values are all double-quoted.
    pub fn to_csv(&self) -> Result<String, ExportError> {
        let mut out = Vec::new();
        {
            let mut header = WriterBuilder::new()
                .terminator(Terminator::Any(b'\n'))
                .from_writer(&mut out);
            header.write_record(EXPORT_HEADERS)?;
            header.flush()?;
        }
        {
            let mut data = WriterBuilder::new()
                .quote_style(QuoteStyle::Always)
                .terminator(Terminator::Any(b'\n'))
                .from_writer(&mut out);
            data.write_record(self.values())?;
            data.flush()?;
        }
        Ok(String::from_utf8(out)?)
    }

    /// Download name, e.g. `Data_Siswa_Siti_Aminah.csv`.
    pub fn csv_filename(&self) -> String {
        let name = WHITESPACE_RUN.replace_all(&self.nama, "_");
        let name = name.replace(['/', '\\', '"'], "_");
        format!("Data_Siswa_{}.csv", name)
    }
}

/// The full edited record as indented JSON.
pub fn record_json(record: &KartuKeluargaData) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(record)?)
}

/// Clipboard-style exports that flash a "copied" indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CopyKind {
    Row,
    Table,
    Json,
}

/// Transient "copied" indicators, each active for a fixed window after a copy.
#[derive(Debug, Clone)]
pub struct CopiedFlags {
    window: Duration,
    marks: HashMap<CopyKind, Instant>,
}

impl CopiedFlags {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            marks: HashMap::new(),
        }
    }

    pub fn mark(&mut self, kind: CopyKind, now: Instant) {
        self.marks.insert(kind, now);
    }

    pub fn is_active(&self, kind: CopyKind, now: Instant) -> bool {
        self.marks
            .get(&kind)
            .is_some_and(|at| now.saturating_duration_since(*at) < self.window)
    }

    /// Kinds still inside their window, in a stable order.
    pub fn active(&self, now: Instant) -> Vec<CopyKind> {
        [CopyKind::Row, CopyKind::Table, CopyKind::Json]
            .into_iter()
            .filter(|k| self.is_active(*k, now))
            .collect()
    }

    pub fn clear(&mut self) {
        self.marks.clear();
    }
}

impl Default for CopiedFlags {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000))
    }
}
