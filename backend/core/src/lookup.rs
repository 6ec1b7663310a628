//! Name-based linkage between a member and the parents named on their row.
//!
//! Parents are found by comparing the free-text `namaAyah` / `namaIbu` with
//! every member's `namaLengkap`, case-insensitive and trimmed. There is no
//! identifier involved, so a misspelled name simply yields no match. When two
//! members share a normalized name the first in table order wins.

use crate::types::{FamilyMember, KartuKeluargaData};

/// A member found by name, with its position in the member table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberMatch<'a> {
    pub index: usize,
    pub member: &'a FamilyMember,
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Find the first member whose full name equals `name`.
///
/// Empty, blank and `"-"` names never match.
pub fn find_member_by_name<'a>(
    record: &'a KartuKeluargaData,
    name: &str,
) -> Option<MemberMatch<'a>> {
    let wanted = normalize_name(name);
    if wanted.is_empty() || wanted == "-" {
        return None;
    }

    record
        .anggota_keluarga
        .iter()
        .enumerate()
        .find(|(_, m)| normalize_name(&m.nama_lengkap) == wanted)
        .map(|(index, member)| MemberMatch { index, member })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, nik: &str) -> FamilyMember {
        FamilyMember {
            nama_lengkap: name.into(),
            nik: nik.into(),
            ..Default::default()
        }
    }

    fn record() -> KartuKeluargaData {
        KartuKeluargaData {
            anggota_keluarga: vec![
                member("Budi Santoso", "1"),
                member("Sri Wahyuni", "2"),
                member("budi santoso", "3"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_match_ignores_case_and_outer_whitespace() {
        let r = record();
        let found = find_member_by_name(&r, "  Budi Santoso ").unwrap();
        assert_eq!(found.index, 0);
        assert_eq!(found.member.nik, "1");

        let found = find_member_by_name(&r, "SRI WAHYUNI").unwrap();
        assert_eq!(found.index, 1);
    }

    #[test]
    fn test_first_duplicate_wins() {
        let r = record();
        assert_eq!(find_member_by_name(&r, "budi santoso").unwrap().index, 0);
    }

    #[test]
    fn test_placeholders_never_match() {
        let mut r = record();
        r.anggota_keluarga.push(member("-", "4"));
        r.anggota_keluarga.push(member("", "5"));
        assert!(find_member_by_name(&r, "").is_none());
        assert!(find_member_by_name(&r, "   ").is_none());
        assert!(find_member_by_name(&r, "-").is_none());
    }

    #[test]
    fn test_unknown_name_is_none() {
        assert!(find_member_by_name(&record(), "Joko").is_none());
    }
}
