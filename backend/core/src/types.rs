use serde::{Deserialize, Deserializer, Serialize};

/// Treat a JSON `null` the same as a missing field: empty string means "not read".
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_no_members<'de, D>(deserializer: D) -> Result<Vec<FamilyMember>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<FamilyMember>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One row of the household member table.
///
/// All fields are free-form; an empty string means the field was not read.
/// `nama_ayah` / `nama_ibu` are the parents' names as printed on the card and
/// are only linked to other rows by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub no: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub nama_lengkap: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub nik: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub jenis_kelamin: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tempat_lahir: String,
    /// Canonical `DD/MM/YYYY` after extraction post-processing.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tanggal_lahir: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub agama: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub pendidikan: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub jenis_pekerjaan: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub status_perkawinan: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub status_hubungan: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub kewarganegaraan: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub nama_ayah: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub nama_ibu: String,
}

/// One household record read from a Kartu Keluarga.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KartuKeluargaData {
    #[serde(rename = "nomorKK", default, deserialize_with = "null_as_empty")]
    pub nomor_kk: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub nama_kepala_keluarga: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub alamat: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dusun: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rt: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rw: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub kode_pos: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub desa_kelurahan: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub kecamatan: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub kabupaten_kota: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub provinsi: String,
    /// Rows in source table order.
    #[serde(default, deserialize_with = "null_as_no_members")]
    pub anggota_keluarga: Vec<FamilyMember>,
}

/// Editable field of a [`FamilyMember`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberField {
    No,
    NamaLengkap,
    Nik,
    JenisKelamin,
    TempatLahir,
    TanggalLahir,
    Agama,
    Pendidikan,
    JenisPekerjaan,
    StatusPerkawinan,
    StatusHubungan,
    Kewarganegaraan,
    NamaAyah,
    NamaIbu,
}

impl MemberField {
    pub const ALL: [MemberField; 14] = [
        MemberField::No,
        MemberField::NamaLengkap,
        MemberField::Nik,
        MemberField::JenisKelamin,
        MemberField::TempatLahir,
        MemberField::TanggalLahir,
        MemberField::Agama,
        MemberField::Pendidikan,
        MemberField::JenisPekerjaan,
        MemberField::StatusPerkawinan,
        MemberField::StatusHubungan,
        MemberField::Kewarganegaraan,
        MemberField::NamaAyah,
        MemberField::NamaIbu,
    ];
}

/// Editable household-level field of a [`KartuKeluargaData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HouseholdField {
    #[serde(rename = "nomorKK")]
    NomorKk,
    NamaKepalaKeluarga,
    Alamat,
    Dusun,
    Rt,
    Rw,
    KodePos,
    DesaKelurahan,
    Kecamatan,
    KabupatenKota,
    Provinsi,
}

impl HouseholdField {
    pub const ALL: [HouseholdField; 11] = [
        HouseholdField::NomorKk,
        HouseholdField::NamaKepalaKeluarga,
        HouseholdField::Alamat,
        HouseholdField::Dusun,
        HouseholdField::Rt,
        HouseholdField::Rw,
        HouseholdField::KodePos,
        HouseholdField::DesaKelurahan,
        HouseholdField::Kecamatan,
        HouseholdField::KabupatenKota,
        HouseholdField::Provinsi,
    ];
}

impl FamilyMember {
    pub fn field(&self, field: MemberField) -> &str {
        match field {
            MemberField::No => &self.no,
            MemberField::NamaLengkap => &self.nama_lengkap,
            MemberField::Nik => &self.nik,
            MemberField::JenisKelamin => &self.jenis_kelamin,
            MemberField::TempatLahir => &self.tempat_lahir,
            MemberField::TanggalLahir => &self.tanggal_lahir,
            MemberField::Agama => &self.agama,
            MemberField::Pendidikan => &self.pendidikan,
            MemberField::JenisPekerjaan => &self.jenis_pekerjaan,
            MemberField::StatusPerkawinan => &self.status_perkawinan,
            MemberField::StatusHubungan => &self.status_hubungan,
            MemberField::Kewarganegaraan => &self.kewarganegaraan,
            MemberField::NamaAyah => &self.nama_ayah,
            MemberField::NamaIbu => &self.nama_ibu,
        }
    }

    pub fn field_mut(&mut self, field: MemberField) -> &mut String {
        match field {
            MemberField::No => &mut self.no,
            MemberField::NamaLengkap => &mut self.nama_lengkap,
            MemberField::Nik => &mut self.nik,
            MemberField::JenisKelamin => &mut self.jenis_kelamin,
            MemberField::TempatLahir => &mut self.tempat_lahir,
            MemberField::TanggalLahir => &mut self.tanggal_lahir,
            MemberField::Agama => &mut self.agama,
            MemberField::Pendidikan => &mut self.pendidikan,
            MemberField::JenisPekerjaan => &mut self.jenis_pekerjaan,
            MemberField::StatusPerkawinan => &mut self.status_perkawinan,
            MemberField::StatusHubungan => &mut self.status_hubungan,
            MemberField::Kewarganegaraan => &mut self.kewarganegaraan,
            MemberField::NamaAyah => &mut self.nama_ayah,
            MemberField::NamaIbu => &mut self.nama_ibu,
        }
    }

    /// Whether the relationship-to-head marks this member as a child ("anak").
    pub fn is_child(&self) -> bool {
        self.status_hubungan.to_lowercase().contains("anak")
    }

    /// Picker label, e.g. `"Siti (Anak)"`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.nama_lengkap, self.status_hubungan)
    }
}

impl KartuKeluargaData {
    pub fn field(&self, field: HouseholdField) -> &str {
        match field {
            HouseholdField::NomorKk => &self.nomor_kk,
            HouseholdField::NamaKepalaKeluarga => &self.nama_kepala_keluarga,
            HouseholdField::Alamat => &self.alamat,
            HouseholdField::Dusun => &self.dusun,
            HouseholdField::Rt => &self.rt,
            HouseholdField::Rw => &self.rw,
            HouseholdField::KodePos => &self.kode_pos,
            HouseholdField::DesaKelurahan => &self.desa_kelurahan,
            HouseholdField::Kecamatan => &self.kecamatan,
            HouseholdField::KabupatenKota => &self.kabupaten_kota,
            HouseholdField::Provinsi => &self.provinsi,
        }
    }

    pub fn field_mut(&mut self, field: HouseholdField) -> &mut String {
        match field {
            HouseholdField::NomorKk => &mut self.nomor_kk,
            HouseholdField::NamaKepalaKeluarga => &mut self.nama_kepala_keluarga,
            HouseholdField::Alamat => &mut self.alamat,
            HouseholdField::Dusun => &mut self.dusun,
            HouseholdField::Rt => &mut self.rt,
            HouseholdField::Rw => &mut self.rw,
            HouseholdField::KodePos => &mut self.kode_pos,
            HouseholdField::DesaKelurahan => &mut self.desa_kelurahan,
            HouseholdField::Kecamatan => &mut self.kecamatan,
            HouseholdField::KabupatenKota => &mut self.kabupaten_kota,
            HouseholdField::Provinsi => &mut self.provinsi,
        }
    }

    /// Hamlet/street line, falling back to the full address when no hamlet was read.
    pub fn dusun_or_alamat(&self) -> &str {
        if self.dusun.is_empty() {
            &self.alamat
        } else {
            &self.dusun
        }
    }
}
