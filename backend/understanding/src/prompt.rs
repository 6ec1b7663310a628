//! Instruction text and response schema for family-card extraction.

use serde_json::{Value, json};

/// Natural-language instruction sent with the image.
pub const KK_EXTRACTION_PROMPT: &str = r#"Analisis gambar Kartu Keluarga (KK) Indonesia ini. Ekstrak data untuk keperluan pendaftaran siswa.

Instruksi Khusus:
1. Data Header:
   - Pisahkan RT dan RW ke field berbeda (hanya angkanya).
   - Ekstrak nama Dusun atau Jalan utama ke field 'dusun'.
   - Ekstrak Desa/Kelurahan, Kecamatan, Kabupaten, Provinsi, Kode Pos.

2. Data Anggota Keluarga (Tabel):
   - Loop setiap baris.
   - Pastikan NIK, Nama Lengkap, Tempat Lahir, Tanggal Lahir, Nama Ayah, dan Nama Ibu terekstrak dengan akurat karena akan digunakan untuk cross-reference data orang tua.

Jika data tidak terbaca, gunakan string kosong "". Format tanggal WAJIB "DD/MM/YYYY" (contoh: 31/01/2005)."#;

pub const MEMBER_FIELDS: [&str; 14] = [
    "no",
    "namaLengkap",
    "nik",
    "jenisKelamin",
    "tempatLahir",
    "tanggalLahir",
    "agama",
    "pendidikan",
    "jenisPekerjaan",
    "statusPerkawinan",
    "statusHubungan",
    "kewarganegaraan",
    "namaAyah",
    "namaIbu",
];

fn string_prop(description: Option<&str>) -> Value {
    match description {
        Some(d) => json!({ "type": "STRING", "description": d }),
        None => json!({ "type": "STRING" }),
    }
}

/// Structured-output schema, field for field the household record.
pub fn response_schema() -> Value {
    let member_props: serde_json::Map<String, Value> = MEMBER_FIELDS
        .iter()
        .map(|f| (f.to_string(), string_prop(None)))
        .collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "nomorKK": string_prop(None),
            "namaKepalaKeluarga": string_prop(None),
            "alamat": string_prop(Some("Alamat lengkap")),
            "dusun": string_prop(Some("Nama Dusun atau Jalan")),
            "rt": string_prop(None),
            "rw": string_prop(None),
            "kodePos": string_prop(None),
            "desaKelurahan": string_prop(None),
            "kecamatan": string_prop(None),
            "kabupatenKota": string_prop(None),
            "provinsi": string_prop(None),
            "anggotaKeluarga": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": Value::Object(member_props),
                },
            },
        },
    })
}
