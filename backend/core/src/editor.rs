//! Editable working copy of one extraction result.
//!
//! The editor owns a copy of the household record that diverges from the
//! extraction through user edits. One member is "focal": the row that gets
//! exported. Parent data for the focal member is derived on demand from the
//! current copy, so edits to a parent's row show up in the export at once.

use serde::Serialize;
use tracing::debug;

use crate::error::EditorError;
use crate::export::{sanitize, ExportRow};
use crate::lookup::{find_member_by_name, MemberMatch};
use crate::types::{FamilyMember, HouseholdField, KartuKeluargaData, MemberField};

/// Shown when a parent name on the focal row has no matching member.
pub const UNLINKED_PARENT_NOTE: &str =
    "Data tidak ditemukan di tabel anggota keluarga (nama tidak cocok)";

/// Which parent of the focal member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParentRole {
    Father,
    Mother,
}

/// Outcome of linking a parent name to the member table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentLink<'a> {
    /// A member row whose full name matches.
    Linked(MemberMatch<'a>),
    /// No match; only the free-text name from the focal row is known.
    Unlinked { free_text: &'a str },
}

impl<'a> ParentLink<'a> {
    pub fn member(&self) -> Option<&'a FamilyMember> {
        match self {
            ParentLink::Linked(m) => Some(m.member),
            ParentLink::Unlinked { .. } => None,
        }
    }

    /// Display name: the linked member's full name, else the free text.
    pub fn name(&self) -> &'a str {
        match self {
            ParentLink::Linked(m) => m.member.nama_lengkap.as_str(),
            ParentLink::Unlinked { free_text } => *free_text,
        }
    }
}

/// Picker entry for selecting the focal member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberOption {
    pub index: usize,
    pub label: String,
    pub selected: bool,
}

/// Section A: the focal member's identity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSection {
    pub index: usize,
    pub nik: String,
    pub nama_lengkap: String,
    pub jenis_kelamin: String,
    pub tempat_lahir: String,
    pub tanggal_lahir: String,
}

/// Section B entry: one parent, linked or free text.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ParentSection {
    /// Edits go to the member row at `index`.
    #[serde(rename_all = "camelCase")]
    Linked {
        role: ParentRole,
        index: usize,
        nik: String,
        nama_lengkap: String,
        tempat_lahir: String,
        tanggal_lahir: String,
    },
    /// Edits go to the focal member's `namaAyah` / `namaIbu`.
    #[serde(rename_all = "camelCase")]
    Unlinked {
        role: ParentRole,
        free_text: String,
        edit_field: MemberField,
        note: &'static str,
    },
}

/// Section C: household address.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSection {
    pub dusun: String,
    pub rt: String,
    pub rw: String,
    pub kode_pos: String,
    pub desa_kelurahan: String,
    pub kecamatan: String,
    pub kabupaten_kota: String,
    pub provinsi: String,
}

/// The validation form for the focal member.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorView {
    pub nomor_kk: String,
    pub members: Vec<MemberOption>,
    pub student: StudentSection,
    pub father: ParentSection,
    pub mother: ParentSection,
    pub address: AddressSection,
    pub modified: bool,
}

/// Working copy of an extraction result plus the focal-member selection.
#[derive(Debug, Clone)]
pub struct ResultEditor {
    original: KartuKeluargaData,
    data: KartuKeluargaData,
    selected: usize,
}

impl ResultEditor {
    /// Start editing a fresh extraction result. The focal member defaults to
    /// the first child ("anak"), or the first row when there is none.
    pub fn new(record: KartuKeluargaData) -> Self {
        let selected = default_selection(&record);
        debug!(
            members = record.anggota_keluarga.len(),
            selected, "Editor loaded extraction result"
        );
        Self {
            data: record.clone(),
            original: record,
            selected,
        }
    }

    /// The untouched extraction result.
    pub fn original(&self) -> &KartuKeluargaData {
        &self.original
    }

    /// The edited record.
    pub fn current(&self) -> &KartuKeluargaData {
        &self.data
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn is_modified(&self) -> bool {
        self.original != self.data
    }

    /// Discard all edits and restore the default selection.
    pub fn revert(&mut self) {
        self.data = self.original.clone();
        self.selected = default_selection(&self.data);
    }

    fn check_index(&self, index: usize) -> Result<(), EditorError> {
        let len = self.data.anggota_keluarga.len();
        if index < len {
            Ok(())
        } else {
            Err(EditorError::MemberOutOfRange { index, len })
        }
    }

    /// Replace one field of the member at `index`.
    pub fn set_member_field(
        &mut self,
        index: usize,
        field: MemberField,
        value: impl Into<String>,
    ) -> Result<(), EditorError> {
        self.check_index(index)?;
        *self.data.anggota_keluarga[index].field_mut(field) = value.into();
        Ok(())
    }

    /// Replace one household-level field.
    pub fn set_household_field(&mut self, field: HouseholdField, value: impl Into<String>) {
        *self.data.field_mut(field) = value.into();
    }

    /// Choose the focal member.
    pub fn select(&mut self, index: usize) -> Result<(), EditorError> {
        self.check_index(index)?;
        self.selected = index;
        Ok(())
    }

    pub fn focal_member(&self) -> Option<&FamilyMember> {
        self.data.anggota_keluarga.get(self.selected)
    }

    fn focal_or_err(&self) -> Result<&FamilyMember, EditorError> {
        self.focal_member().ok_or(EditorError::NoMembers)
    }

    /// Link the focal member's father or mother name to the member table.
    pub fn parent(&self, role: ParentRole) -> Result<ParentLink<'_>, EditorError> {
        let focal = self.focal_or_err()?;
        let name = match role {
            ParentRole::Father => &focal.nama_ayah,
            ParentRole::Mother => &focal.nama_ibu,
        };
        Ok(match find_member_by_name(&self.data, name) {
            Some(found) => ParentLink::Linked(found),
            None => ParentLink::Unlinked { free_text: name },
        })
    }

    pub fn father(&self) -> Result<ParentLink<'_>, EditorError> {
        self.parent(ParentRole::Father)
    }

    pub fn mother(&self) -> Result<ParentLink<'_>, EditorError> {
        self.parent(ParentRole::Mother)
    }

    /// Picker entries in table order.
    pub fn member_options(&self) -> Vec<MemberOption> {
        self.data
            .anggota_keluarga
            .iter()
            .enumerate()
            .map(|(index, m)| MemberOption {
                index,
                label: m.label(),
                selected: index == self.selected,
            })
            .collect()
    }

    /// Sanitized export projection for the focal member.
    pub fn export_row(&self) -> Result<ExportRow, EditorError> {
        let student = self.focal_or_err()?;
        let father = self.father()?;
        let mother = self.mother()?;
        let d = &self.data;

        Ok(ExportRow {
            no_kk: sanitize(Some(&d.nomor_kk)),
            nik: sanitize(Some(&student.nik)),
            nama: sanitize(Some(&student.nama_lengkap)),
            jk: sanitize(Some(&student.jenis_kelamin)),
            tmp_lahir: sanitize(Some(&student.tempat_lahir)),
            tgl_lahir: sanitize(Some(&student.tanggal_lahir)),

            nik_ayah: sanitize(father.member().map(|m| m.nik.as_str())),
            nama_ayah: sanitize(Some(father.name())),
            tmp_lahir_ayah: sanitize(father.member().map(|m| m.tempat_lahir.as_str())),
            tgl_lahir_ayah: sanitize(father.member().map(|m| m.tanggal_lahir.as_str())),

            nik_ibu: sanitize(mother.member().map(|m| m.nik.as_str())),
            nama_ibu: sanitize(Some(mother.name())),
            tmp_lahir_ibu: sanitize(mother.member().map(|m| m.tempat_lahir.as_str())),
            tgl_lahir_ibu: sanitize(mother.member().map(|m| m.tanggal_lahir.as_str())),

            dusun: sanitize(Some(d.dusun_or_alamat())),
            rt: sanitize(Some(&d.rt)),
            rw: sanitize(Some(&d.rw)),
            desa: sanitize(Some(&d.desa_kelurahan)),
            kec: sanitize(Some(&d.kecamatan)),
            kab: sanitize(Some(&d.kabupaten_kota)),
            prov: sanitize(Some(&d.provinsi)),
        })
    }

    fn parent_section(&self, role: ParentRole) -> Result<ParentSection, EditorError> {
        Ok(match self.parent(role)? {
            ParentLink::Linked(found) => ParentSection::Linked {
                role,
                index: found.index,
                nik: found.member.nik.clone(),
                nama_lengkap: found.member.nama_lengkap.clone(),
                tempat_lahir: found.member.tempat_lahir.clone(),
                tanggal_lahir: found.member.tanggal_lahir.clone(),
            },
            ParentLink::Unlinked { free_text } => ParentSection::Unlinked {
                role,
                free_text: free_text.to_string(),
                edit_field: match role {
                    ParentRole::Father => MemberField::NamaAyah,
                    ParentRole::Mother => MemberField::NamaIbu,
                },
                note: UNLINKED_PARENT_NOTE,
            },
        })
    }

    /// Form model for the focal member. Fails when the record has no members.
    pub fn view(&self) -> Result<EditorView, EditorError> {
        let student = self.focal_or_err()?;
        let d = &self.data;
        Ok(EditorView {
            nomor_kk: d.nomor_kk.clone(),
            members: self.member_options(),
            student: StudentSection {
                index: self.selected,
                nik: student.nik.clone(),
                nama_lengkap: student.nama_lengkap.clone(),
                jenis_kelamin: student.jenis_kelamin.clone(),
                tempat_lahir: student.tempat_lahir.clone(),
                tanggal_lahir: student.tanggal_lahir.clone(),
            },
            father: self.parent_section(ParentRole::Father)?,
            mother: self.parent_section(ParentRole::Mother)?,
            address: AddressSection {
                dusun: d.dusun_or_alamat().to_string(),
                rt: d.rt.clone(),
                rw: d.rw.clone(),
                kode_pos: d.kode_pos.clone(),
                desa_kelurahan: d.desa_kelurahan.clone(),
                kecamatan: d.kecamatan.clone(),
                kabupaten_kota: d.kabupaten_kota.clone(),
                provinsi: d.provinsi.clone(),
            },
            modified: self.is_modified(),
        })
    }
}

/// First member whose relationship contains "anak", else 0.
pub fn default_selection(record: &KartuKeluargaData) -> usize {
    record
        .anggota_keluarga
        .iter()
        .position(FamilyMember::is_child)
        .unwrap_or(0)
}
