//! Cleaning stage: raw batch → normalized batch.
//!
//! Runs every field through its normalizer, then applies the two
//! filename-evidence rules that belong to cleaning: the sheet-number
//! status and the drawing-number repair.

use crate::checkpoint::{ResumeToken, Stage};
use crate::config::PipelineConfig;
use log::info;
use titleblock_core::{table, FieldName, Record, Result, RowStatus};
use titleblock_normalize::{repair_with_expected, Normalizer};

/// Whether two digit runs denote the same number (`012` equals `12`).
fn digits_equal(a: &str, b: &str) -> bool {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}

/// Normalize one record in place.
pub fn clean_record(record: &mut Record, normalizer: &Normalizer, edit_budget: usize) {
    for field in FieldName::ALL {
        let cleaned = normalizer.normalize(field, record.get(field));
        record.set(field, cleaned);
    }

    // Sheet number: filename evidence. Digit runs compare as integers so
    // a leading zero never reads as a mismatch. On mismatch the OCR value
    // is kept and the record is marked.
    let sheet = record.get(FieldName::Blad).to_string();
    if let Some(evidence) = record.doc_key.trailing_digits() {
        if !sheet.is_empty() && !digits_equal(&sheet, evidence) {
            record.blad_status = RowStatus::Error;
        }
    }

    // Drawing number: the document key is derived from the filename, which
    // is trusted over OCR when they differ by at most the edit budget.
    let expected = record.doc_key.to_uppercase();
    let repaired = repair_with_expected(
        record.get(FieldName::RitningsnummerProjekt),
        &expected,
        edit_budget,
    );
    record.set(FieldName::RitningsnummerProjekt, repaired);
}

/// Run the cleaning stage: read the raw artifact, normalize every record,
/// and replace the cleaning artifact.
///
/// # Errors
///
/// Fatal when the raw-extraction artifact is missing or an artifact write
/// fails.
pub fn run(config: &PipelineConfig) -> Result<Vec<Record>> {
    let mut records = table::read_batch(&config.raw_extraction())?;
    info!("clean: {} records", records.len());

    let normalizer = Normalizer::new();
    for record in &mut records {
        clean_record(record, &normalizer, config.edit_budget);
    }

    table::write_batch(&config.cleaning_file(), &records)?;
    ResumeToken::completed(Stage::Clean, records.len()).save(&config.resume_token())?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_record_normalizes_fields() {
        let mut record = Record::new("X-12-034-0099-0_0-AB12_stamp.png");
        record.set(FieldName::Format, "AI");
        record.set(FieldName::Andr, "41");
        clean_record(&mut record, &Normalizer::new(), 1);
        assert_eq!(record.get(FieldName::Format), "A1");
        assert_eq!(record.get(FieldName::Andr), "A.1");
    }

    #[test]
    fn test_drawing_number_repaired_from_filename() {
        // OCR lost the last character; filename evidence differs by one.
        let mut record = Record::new("X-12-034-0099-0_0-AB12_stamp.png");
        record.set(FieldName::RitningsnummerProjekt, "X-12-034-0099-0_0-AB1Z");
        clean_record(&mut record, &Normalizer::new(), 1);
        assert_eq!(
            record.get(FieldName::RitningsnummerProjekt),
            "X-12-034-0099-0_0-AB12"
        );
    }

    #[test]
    fn test_sheet_mismatch_marks_status_but_keeps_value() {
        let mut record = Record::new("DRAWING12_stamp.png");
        record.set(FieldName::Blad, "O13");
        clean_record(&mut record, &Normalizer::new(), 1);
        assert_eq!(record.get(FieldName::Blad), "013");
        assert_eq!(record.blad_status, RowStatus::Error);
    }

    #[test]
    fn test_sheet_match_stays_ok() {
        let mut record = Record::new("DRAWING12_stamp.png");
        record.set(FieldName::Blad, "I2");
        clean_record(&mut record, &Normalizer::new(), 1);
        assert_eq!(record.get(FieldName::Blad), "12");
        assert_eq!(record.blad_status, RowStatus::Ok);
    }

    #[test]
    fn test_missing_evidence_keeps_ocr_value() {
        let mut record = Record::new("NO-DIGITS_stamp.png");
        record.set(FieldName::Blad, "12");
        clean_record(&mut record, &Normalizer::new(), 1);
        assert_eq!(record.get(FieldName::Blad), "12");
        assert_eq!(record.blad_status, RowStatus::Ok);
    }
}
