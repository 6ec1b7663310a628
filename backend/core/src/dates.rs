//! Birth-date post-processing for extraction results.
//!
//! Only the separator and the field order are touched; calendar validity is
//! not checked, so `31/02/2020` passes through unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::KartuKeluargaData;

static YEAR_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{4})/([0-9]{2})/([0-9]{2})$").unwrap());

/// Rewrite a date to `DD/MM/YYYY`: dashes become slashes, and a
/// `YYYY/MM/DD` value is reordered. Anything else is returned as-is.
pub fn normalize_date(date: &str) -> String {
    if date.is_empty() {
        return String::new();
    }

    let normalized = date.replace('-', "/");
    match YEAR_FIRST.captures(&normalized) {
        Some(caps) => format!("{}/{}/{}", &caps[3], &caps[2], &caps[1]),
        None => normalized,
    }
}

/// Normalize every member's birth date in place.
pub fn normalize_member_dates(record: &mut KartuKeluargaData) {
    for member in &mut record.anggota_keluarga {
        member.tanggal_lahir = normalize_date(&member.tanggal_lahir);
    }
}
