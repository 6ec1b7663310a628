//! Turn the model's text reply into a household record.
//!
//! The reply is checked against the same schema that was requested, so a
//! provider that ignores structured output still cannot hand us a record of
//! the wrong shape. `null` is accepted anywhere and read as "not read".

use kkscan_core::{ExtractionError, KartuKeluargaData, normalize_member_dates};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::prompt::response_schema;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```$").unwrap());

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match CODE_FENCE.captures(trimmed) {
        Some(caps) => caps.get(1).map_or(trimmed, |m| m.as_str()),
        None => trimmed,
    }
}

/// Check `value` against a schema of `OBJECT` / `ARRAY` / `STRING` nodes.
/// Unknown properties are ignored.
pub fn validate_shape(value: &Value, schema: &Value, path: &str) -> Result<(), String> {
    if value.is_null() {
        return Ok(());
    }
    let ty = schema.get("type").and_then(Value::as_str).unwrap_or("");
    match ty {
        "OBJECT" => {
            let obj = value
                .as_object()
                .ok_or_else(|| format!("{}: expected object", display_path(path)))?;
            if let Some(props) = schema.get("properties").and_then(Value::as_object) {
                for (key, sub) in props {
                    if let Some(v) = obj.get(key) {
                        validate_shape(v, sub, &join_path(path, key))?;
                    }
                }
            }
            Ok(())
        }
        "ARRAY" => {
            let items = value
                .as_array()
                .ok_or_else(|| format!("{}: expected array", display_path(path)))?;
            if let Some(item_schema) = schema.get("items") {
                for (i, item) in items.iter().enumerate() {
                    validate_shape(item, item_schema, &format!("{path}[{i}]"))?;
                }
            }
            Ok(())
        }
        "STRING" if !value.is_string() => {
            Err(format!("{}: expected string", display_path(path)))
        }
        _ => Ok(()),
    }
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}

/// Parse, shape-check and date-normalize a model reply.
pub fn parse_extraction(text: &str) -> Result<KartuKeluargaData, ExtractionError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }

    let value: Value =
        serde_json::from_str(body).map_err(|e| ExtractionError::InvalidJson(e.to_string()))?;
    validate_shape(&value, &response_schema(), "").map_err(ExtractionError::InvalidJson)?;

    let mut record: KartuKeluargaData =
        serde_json::from_value(value).map_err(|e| ExtractionError::InvalidJson(e.to_string()))?;
    normalize_member_dates(&mut record);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = r#"{
        "nomorKK": "3301010101010001",
        "namaKepalaKeluarga": "JOKO",
        "alamat": "DUSUN KRAJAN RT 001 RW 002",
        "dusun": "KRAJAN",
        "rt": "001",
        "rw": "002",
        "kodePos": "53271",
        "desaKelurahan": "SIDAREJA",
        "kecamatan": "SIDAREJA",
        "kabupatenKota": "CILACAP",
        "provinsi": "JAWA TENGAH",
        "anggotaKeluarga": [
            { "no": "1", "namaLengkap": "JOKO", "statusHubungan": "KEPALA KELUARGA", "tanggalLahir": "1980-07-17" },
            { "no": "2", "namaLengkap": "SITI", "statusHubungan": "ANAK", "tanggalLahir": "02-03-2010", "namaAyah": "JOKO" }
        ]
    }"#;

    #[test]
    fn test_parse_normalizes_dates() {
        let record = parse_extraction(REPLY).unwrap();
        assert_eq!(record.nomor_kk, "3301010101010001");
        assert_eq!(record.anggota_keluarga.len(), 2);
        assert_eq!(record.anggota_keluarga[0].tanggal_lahir, "17/07/1980");
        assert_eq!(record.anggota_keluarga[1].tanggal_lahir, "02/03/2010");
        assert_eq!(record.anggota_keluarga[1].nama_ibu, "");
    }

    #[test]
    fn test_code_fenced_reply_is_accepted() {
        let fenced = format!("```json\n{}\n```", REPLY);
        assert_eq!(parse_extraction(&fenced).unwrap(), parse_extraction(REPLY).unwrap());
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(matches!(
            parse_extraction("{ not json"),
            Err(ExtractionError::InvalidJson(_))
        ));
        assert!(matches!(parse_extraction("   "), Err(ExtractionError::EmptyResponse)));
    }

    #[test]
    fn test_shape_violations_are_reported_with_path() {
        let err = parse_extraction(r#"{ "anggotaKeluarga": [ { "nik": 3301 } ] }"#).unwrap_err();
        match err {
            ExtractionError::InvalidJson(msg) => assert!(msg.contains("anggotaKeluarga[0].nik")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse_extraction(r#"[1, 2]"#).is_err());
        assert!(parse_extraction(r#"{ "anggotaKeluarga": "none" }"#).is_err());
    }

    #[test]
    fn test_nulls_and_extra_keys_tolerated() {
        let record =
            parse_extraction(r#"{ "rt": null, "confidence": 0.9, "anggotaKeluarga": null }"#)
                .unwrap();
        assert_eq!(record.rt, "");
        assert!(record.anggota_keluarga.is_empty());
    }
}
