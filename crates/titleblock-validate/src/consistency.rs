//! Cross-source consistency checks.
//!
//! Compares the recorded revision-change code against the resolved
//! revision, and field values against filename evidence. Mismatches are
//! recorded as flags and statuses, never raised.

use once_cell::sync::Lazy;
use regex::Regex;
use titleblock_core::{FieldName, Record, RowStatus};

static VALID_REVISION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z](?:\.\d+)?$").expect("Invalid regex"));

/// Whether a value matches the `letter[.digit]` revision grammar.
#[inline]
#[must_use = "returns whether the value is a valid revision"]
pub fn is_valid_revision(value: &str) -> bool {
    VALID_REVISION.is_match(value)
}

/// Whether a value is purely numeric (a sheet-style index, not a revision
/// letter context).
#[inline]
#[must_use = "returns whether the value is purely numeric"]
pub fn is_pure_number(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit())
}

/// Compare the recorded revision-change code against the resolved revision.
///
/// A purely numeric recorded code is skipped. Otherwise the row is in
/// error when both codes are valid but differ, or when exactly one of them
/// is valid (present-but-malformed counts as mismatch).
#[must_use = "returns the revision consistency status"]
pub fn check_revision(recorded: &str, resolved: &str) -> RowStatus {
    let recorded = recorded.trim().to_uppercase();
    let resolved = resolved.trim().to_uppercase();

    if is_pure_number(&recorded) {
        return RowStatus::Ok;
    }

    let recorded_valid = is_valid_revision(&recorded);
    let resolved_valid = is_valid_revision(&resolved);

    match (recorded_valid, resolved_valid) {
        (true, true) if recorded != resolved => RowStatus::Error,
        (true, false) | (false, true) => RowStatus::Error,
        _ => RowStatus::Ok,
    }
}

/// Flag the drawing-number field when it is not a substring of the
/// document key. Flags the field in isolation; row status is untouched.
pub fn check_drawing_number(record: &mut Record) {
    let value = record.get(FieldName::RitningsnummerProjekt).trim().to_uppercase();
    let key = record.doc_key.to_uppercase();
    if value.is_empty() || key.is_empty() {
        return;
    }
    if !key.contains(&value) {
        record.flag(
            FieldName::RitningsnummerProjekt,
            "drawing number not contained in document key",
        );
    }
}

/// Flag the sheet-number field when it disagrees (as an integer) with the
/// trailing sheet digits of the document key.
///
/// Comparison is numeric so a leading zero never causes a spurious
/// mismatch (`012` equals `12`). Zero-valued and empty sheets are skipped,
/// as is a key without trailing sheet digits.
pub fn check_sheet_number(record: &mut Record) {
    let value = record.get(FieldName::Blad).trim().to_string();
    if matches!(value.as_str(), "" | "0" | "00" | "000" | "0000") {
        return;
    }
    let Some(evidence) = record.doc_key.trailing_sheet_digits() else {
        return;
    };
    let evidence: u32 = match evidence.parse() {
        Ok(n) => n,
        Err(_) => return,
    };
    match value.parse::<u32>() {
        Ok(sheet) if sheet == evidence => {}
        _ => record.flag(
            FieldName::Blad,
            "sheet number disagrees with filename evidence",
        ),
    }
}
