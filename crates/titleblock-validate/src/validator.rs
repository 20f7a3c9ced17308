//! Master rule validation.
//!
//! Evaluates every field of every record against the rule catalog, with
//! the precedence rule: a record already marked in error by the revision
//! consistency check receives no further field-level flags — the first
//! detected inconsistency is sufficient signal, and later checks would be
//! noise on an already-invalid record.

use crate::catalog::RuleCatalog;
use crate::consistency::{check_drawing_number, check_sheet_number};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use titleblock_core::{FieldName, Record, RowStatus};

static INNER_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex"));

/// Applies the rule catalog and filename cross-checks to a batch.
#[derive(Debug)]
pub struct MasterValidator<'a> {
    catalog: &'a RuleCatalog,
}

impl<'a> MasterValidator<'a> {
    /// Create a validator over a loaded catalog.
    #[inline]
    #[must_use = "creates a validator instance"]
    pub const fn new(catalog: &'a RuleCatalog) -> Self {
        Self { catalog }
    }

    /// Validate the batch in place, flagging violating fields.
    ///
    /// Re-validation is idempotent: flags from a previous run are not
    /// consulted, only re-derived.
    pub fn validate(&self, records: &mut [Record]) {
        let mut flagged = 0usize;
        for record in records.iter_mut() {
            if record.rev_status == RowStatus::Error {
                continue;
            }
            check_drawing_number(record);
            check_sheet_number(record);
            self.validate_fields(record);
            flagged += record.flags.len();
        }
        debug!("master validation produced {flagged} field flags");
    }

    fn validate_fields(&self, record: &mut Record) {
        for field in FieldName::ALL {
            // The revision code is judged by the consistency check, not
            // the catalog.
            if field == FieldName::Andr {
                continue;
            }
            let label = field.label();
            if self.catalog.is_freetext(label) {
                continue;
            }

            let value = record.get(field).trim().to_string();

            if let Some(allowed) = self.catalog.value_rule(label) {
                if value.is_empty() {
                    if !field.empty_allowed() {
                        record.flag(field, "empty value not allowed");
                    }
                } else if !allowed.contains(&value) {
                    record.flag(field, "value not in allowed set");
                }
                continue;
            }

            if let Some(patterns) = self.catalog.pattern_rule(label) {
                if value.is_empty() {
                    if !field.empty_allowed() {
                        record.flag(field, "empty value not allowed");
                    }
                    continue;
                }
                let compact = INNER_WHITESPACE.replace_all(&value, "");
                if !patterns.iter().any(|p| p.is_match(&compact)) {
                    record.flag(field, "no matching pattern");
                }
            }

            // Fields in neither collection pass by default: only fields
            // with curated reference data are strictly validated.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use titleblock_core::CellFlag;

    fn catalog() -> RuleCatalog {
        let value_rows = vec![
            ("FORMAT".to_string(), "A1".to_string()),
            ("FORMAT".to_string(), "A3".to_string()),
            ("TEKNIKOMRADE".to_string(), "K".to_string()),
            ("LEVERANTOR_1".to_string(), "TYRÉNS".to_string()),
        ];
        let pattern_rows = vec![
            ("BLAD".to_string(), r"\d{2,4}".to_string()),
            ("SKALA".to_string(), r"1:\d+(/1:\d+)*".to_string()),
        ];
        let freetext = vec!["TITLE".to_string()];
        RuleCatalog::from_sections(&value_rows, &pattern_rows, &freetext).unwrap()
    }

    fn record() -> Record {
        let mut record = Record::new("X-12-034-0099_stamp.png");
        record.set(FieldName::Format, "A1");
        record.set(FieldName::Teknikomrade, "K");
        record.set(FieldName::Leverantor1, "TYRÉNS");
        record.set(FieldName::Blad, "99");
        record.set(FieldName::Skala, "1:100");
        record
    }

    #[test]
    fn test_conforming_record_passes() {
        let catalog = catalog();
        let mut records = vec![record()];
        MasterValidator::new(&catalog).validate(&mut records);
        assert!(records[0].flags.is_empty(), "flags: {:?}", records[0].flags);
    }

    #[test]
    fn test_value_rule_violation_flagged() {
        let catalog = catalog();
        let mut records = vec![record()];
        records[0].set(FieldName::Format, "A9");
        MasterValidator::new(&catalog).validate(&mut records);
        assert!(records[0].is_flagged(FieldName::Format));
    }

    #[test]
    fn test_pattern_rule_strips_internal_whitespace() {
        let catalog = catalog();
        let mut records = vec![record()];
        records[0].set(FieldName::Skala, "1:100 / 1:200");
        MasterValidator::new(&catalog).validate(&mut records);
        assert!(!records[0].is_flagged(FieldName::Skala));
    }

    #[test]
    fn test_pattern_rule_violation_flagged() {
        let catalog = catalog();
        let mut records = vec![record()];
        records[0].set(FieldName::Skala, "SCALE UNKNOWN");
        MasterValidator::new(&catalog).validate(&mut records);
        assert!(records[0].is_flagged(FieldName::Skala));
    }

    #[test]
    fn test_empty_handling() {
        let catalog = catalog();
        let mut records = vec![record()];
        // FORMAT is in the empty-allowed set: empty passes.
        records[0].set(FieldName::Format, "");
        // LEVERANTOR_1 is not: empty violates its value rule.
        records[0].set(FieldName::Leverantor1, "");
        MasterValidator::new(&catalog).validate(&mut records);
        assert!(!records[0].is_flagged(FieldName::Format));
        assert!(records[0].is_flagged(FieldName::Leverantor1));
    }

    #[test]
    fn test_unruled_fields_pass_by_default() {
        let catalog = catalog();
        let mut records = vec![record()];
        records[0].set(FieldName::Bandel, "ANYTHING AT ALL");
        MasterValidator::new(&catalog).validate(&mut records);
        assert!(!records[0].is_flagged(FieldName::Bandel));
    }

    #[test]
    fn test_freetext_never_checked() {
        let catalog = catalog();
        let mut records = vec![record()];
        records[0].set(FieldName::Title, "");
        MasterValidator::new(&catalog).validate(&mut records);
        assert!(!records[0].is_flagged(FieldName::Title));
    }

    #[test]
    fn test_revision_error_suppresses_field_checks() {
        let catalog = catalog();
        let mut records = vec![record()];
        records[0].set(FieldName::Format, "A9");
        records[0].set(FieldName::Skala, "garbage");
        records[0].rev_status = RowStatus::Error;
        MasterValidator::new(&catalog).validate(&mut records);
        assert!(records[0].flags.is_empty());
    }

    #[test]
    fn test_revalidation_is_idempotent() {
        let catalog = catalog();
        let mut records = vec![record()];
        records[0].set(FieldName::Format, "A9");

        let validator = MasterValidator::new(&catalog);
        validator.validate(&mut records);
        let first: Vec<CellFlag> = records[0].flags.clone();

        validator.validate(&mut records);
        assert_eq!(records[0].flags, first);
    }
}
