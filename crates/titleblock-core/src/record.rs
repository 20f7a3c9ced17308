//! The per-drawing record and its document key.
//!
//! A [`Record`] is created once per source image at extraction time and
//! mutated in place by each downstream stage. Error state lives in data:
//! the row-level status columns plus per-field [`CellFlag`]s. Rendering
//! (cell highlighting) is derived from these, never computed independently.

use crate::error::{Result, TitleblockError};
use crate::field::FieldName;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static PAGE_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"_p\d+").expect("Invalid page regex"));
static IMAGE_EXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(png|pdf)$").expect("Invalid extension regex"));
static TRAILING_SHEET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-([0-9]{2,4})$").expect("Invalid sheet regex"));
static TRAILING_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)$").expect("Invalid digits regex"));

/// Canonical document identifier derived from a source filename.
///
/// Records produced by independent extraction passes (stamp extraction,
/// revision extraction) are joined on this key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocKey(String);

impl DocKey {
    /// Derive the key from a stamp-crop image name
    /// (`X-12-034-0099-0_0-AB12_stamp.png` → `X-12-034-0099-0_0-AB12`).
    #[must_use = "derives the document key from a stamp image name"]
    pub fn from_stamp_image(image_name: &str) -> Self {
        let name = image_name
            .trim()
            .trim_end_matches("_stamp.png")
            .trim_end_matches(".png");
        Self(name.trim().to_string())
    }

    /// Derive the key from a revision-crop file name, which may carry a
    /// `_p<digits>` page suffix and a `.png`/`.pdf` extension.
    #[must_use = "derives the document key from a revision crop file name"]
    pub fn from_revision_file(file_name: &str) -> Self {
        let name = PAGE_SUFFIX.replace_all(file_name, "");
        let name = IMAGE_EXT.replace(&name, "");
        Self(name.trim().to_string())
    }

    /// The key string.
    #[inline]
    #[must_use = "returns the key string"]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Uppercased key, for case-insensitive comparisons against OCR values.
    #[inline]
    #[must_use = "returns the uppercased key"]
    pub fn to_uppercase(&self) -> String {
        self.0.to_uppercase()
    }

    /// The sheet-number group from a trailing `-NN[NN]` pattern, if any.
    #[must_use = "returns the trailing sheet digits, if present"]
    pub fn trailing_sheet_digits(&self) -> Option<&str> {
        TRAILING_SHEET
            .captures(&self.0)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    /// Any trailing digit run, used as weak sheet evidence during cleaning.
    #[must_use = "returns the trailing digit run, if present"]
    pub fn trailing_digits(&self) -> Option<&str> {
        TRAILING_DIGITS
            .captures(&self.0)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }
}

impl std::fmt::Display for DocKey {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Row-level status, stored as a data column (`OK` / `ERROR`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowStatus {
    /// No inconsistency detected.
    #[default]
    Ok,
    /// A cross-source mismatch was detected.
    Error,
}

impl RowStatus {
    /// The column value for this status.
    #[inline]
    #[must_use = "returns the column value for this status"]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Error => "ERROR",
        }
    }

    /// Parse a status column value. Anything other than `ERROR` reads as OK,
    /// matching how the original artifacts treated blank cells.
    #[inline]
    #[must_use = "parses a status column value"]
    pub fn from_cell(value: &str) -> Self {
        if value.trim() == "ERROR" {
            Self::Error
        } else {
            Self::Ok
        }
    }
}

impl std::fmt::Display for RowStatus {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-field error flag with its provenance note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellFlag {
    /// The flagged field.
    pub field: FieldName,
    /// Why the field was flagged (rule id or mismatch description).
    pub note: String,
}

/// One drawing: the full label → value map plus pipeline-added columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Source image file name (`Image` column).
    pub image: String,
    /// Canonical document key derived from `image`.
    pub doc_key: DocKey,
    /// Field values, possibly empty strings. Fixed schema.
    values: BTreeMap<FieldName, String>,
    /// Resolved revision code from the revision extraction pass
    /// (`FINAL_REV` column, `"_"` when unresolved).
    pub final_rev: String,
    /// ISO date attached to the resolved revision (`REV_DATE`), if any.
    pub rev_date: String,
    /// Sheet-evidence status (`BLAD_STATUS`).
    pub blad_status: RowStatus,
    /// Revision-consistency status (`REV_STATUS`).
    pub rev_status: RowStatus,
    /// Per-field flags. Presentation (highlighting) derives from these.
    pub flags: Vec<CellFlag>,
}

impl Record {
    /// Create an empty record for a source image. Every field starts as the
    /// empty string.
    #[must_use = "creates a record that should be populated"]
    pub fn new(image: impl Into<String>) -> Self {
        let image = image.into();
        let doc_key = DocKey::from_stamp_image(&image);
        let values = FieldName::ALL
            .into_iter()
            .map(|f| (f, String::new()))
            .collect();
        Self {
            image,
            doc_key,
            values,
            final_rev: String::new(),
            rev_date: String::new(),
            blad_status: RowStatus::Ok,
            rev_status: RowStatus::Ok,
            flags: Vec::new(),
        }
    }

    /// Field value (empty string when nothing was extracted).
    #[inline]
    #[must_use = "returns the field value"]
    pub fn get(&self, field: FieldName) -> &str {
        self.values.get(&field).map_or("", String::as_str)
    }

    /// Overwrite a field value.
    #[inline]
    pub fn set(&mut self, field: FieldName, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    /// Set a field by its column label, rejecting unknown labels.
    ///
    /// # Errors
    ///
    /// Returns [`TitleblockError::UnknownField`] when `label` is not in the
    /// static field catalog.
    pub fn set_by_label(&mut self, label: &str, value: impl Into<String>) -> Result<()> {
        let field: FieldName = label.parse()?;
        self.set(field, value);
        Ok(())
    }

    /// Flag a field with a provenance note. Idempotent per field: the first
    /// note wins, later flags on the same field are ignored.
    pub fn flag(&mut self, field: FieldName, note: impl Into<String>) {
        if !self.is_flagged(field) {
            self.flags.push(CellFlag {
                field,
                note: note.into(),
            });
        }
    }

    /// Whether a field carries an error flag.
    #[inline]
    #[must_use = "returns whether the field is flagged"]
    pub fn is_flagged(&self, field: FieldName) -> bool {
        self.flags.iter().any(|f| f.field == field)
    }

    /// Clear all flags and reset both status columns.
    ///
    /// Stages re-derive error state in full on every run, which is what
    /// makes re-validation idempotent.
    pub fn reset_annotations(&mut self) {
        self.flags.clear();
        self.blad_status = RowStatus::Ok;
        self.rev_status = RowStatus::Ok;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_key_from_stamp_image() {
        let key = DocKey::from_stamp_image("X-12-034-0099-0_0-AB12_stamp.png");
        assert_eq!(key.as_str(), "X-12-034-0099-0_0-AB12");

        let key = DocKey::from_stamp_image("plain.png");
        assert_eq!(key.as_str(), "plain");
    }

    #[test]
    fn test_doc_key_from_revision_file() {
        let key = DocKey::from_revision_file("X-12-034-0099-0_0-AB12_p1.png");
        assert_eq!(key.as_str(), "X-12-034-0099-0_0-AB12");

        let key = DocKey::from_revision_file("X-12-034-0099-0_0-AB12.PDF");
        assert_eq!(key.as_str(), "X-12-034-0099-0_0-AB12");
    }

    #[test]
    fn test_stamp_and_revision_keys_join() {
        let stamp = DocKey::from_stamp_image("B-01-002-0003-0_0-XY01_stamp.png");
        let rev = DocKey::from_revision_file("B-01-002-0003-0_0-XY01_p1.png");
        assert_eq!(stamp, rev);
    }

    #[test]
    fn test_trailing_sheet_digits() {
        let key = DocKey::from_stamp_image("X-12-034-0099_stamp.png");
        assert_eq!(key.trailing_sheet_digits(), Some("0099"));

        let key = DocKey::from_stamp_image("NO-SHEET-HERE_stamp.png");
        assert_eq!(key.trailing_sheet_digits(), None);
    }

    #[test]
    fn test_trailing_digits_weak_evidence() {
        let key = DocKey::from_stamp_image("DRAWING12_stamp.png");
        assert_eq!(key.trailing_digits(), Some("12"));
    }

    #[test]
    fn test_record_fixed_schema() {
        let mut record = Record::new("A_stamp.png");
        assert_eq!(record.get(FieldName::Blad), "");

        record.set(FieldName::Blad, "012");
        assert_eq!(record.get(FieldName::Blad), "012");

        assert!(record.set_by_label("BLAD", "013").is_ok());
        assert!(record.set_by_label("UNKNOWN_COLUMN", "x").is_err());
    }

    #[test]
    fn test_flag_first_note_wins() {
        let mut record = Record::new("A_stamp.png");
        record.flag(FieldName::Blad, "sheet mismatch");
        record.flag(FieldName::Blad, "second note");
        assert_eq!(record.flags.len(), 1);
        assert_eq!(record.flags[0].note, "sheet mismatch");
    }

    #[test]
    fn test_reset_annotations() {
        let mut record = Record::new("A_stamp.png");
        record.rev_status = RowStatus::Error;
        record.flag(FieldName::Skala, "no matching pattern");
        record.reset_annotations();
        assert_eq!(record.rev_status, RowStatus::Ok);
        assert!(record.flags.is_empty());
    }

    #[test]
    fn test_row_status_from_cell() {
        assert_eq!(RowStatus::from_cell("ERROR"), RowStatus::Error);
        assert_eq!(RowStatus::from_cell("OK"), RowStatus::Ok);
        assert_eq!(RowStatus::from_cell(""), RowStatus::Ok);
    }
}
