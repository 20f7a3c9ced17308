//! Merge + consistency stage.
//!
//! Left-joins the cleaned batch with the revision artifact on the document
//! key, zero-pads the sheet number to its printed width, and runs the
//! revision consistency check.

use crate::checkpoint::{ResumeToken, Stage};
use crate::config::{pad_sheet, PipelineConfig};
use crate::revision::{read_revision_rows, RevisionRow};
use log::info;
use std::collections::HashMap;
use titleblock_core::{table, DocKey, FieldName, Record, Result, RowStatus};
use titleblock_validate::check_revision;

/// Merge revision rows into the cleaned batch and derive `REV_STATUS`.
pub fn merge_and_check(records: &mut [Record], revision_rows: &[RevisionRow]) {
    let by_key: HashMap<String, &RevisionRow> = revision_rows
        .iter()
        .map(|row| (DocKey::from_revision_file(&row.file).as_str().to_string(), row))
        .collect();

    for record in records.iter_mut() {
        record.set(FieldName::Blad, pad_sheet(record.get(FieldName::Blad)));

        if let Some(row) = by_key.get(record.doc_key.as_str()) {
            record.final_rev = row.final_rev.clone();
            record.rev_date = row.rev_date.clone();
        } else {
            record.final_rev = String::new();
            record.rev_date = String::new();
        }

        record.rev_status = check_revision(record.get(FieldName::Andr), &record.final_rev);
    }
}

/// Run the compare stage.
///
/// # Errors
///
/// Fatal when either upstream artifact is missing or the output write
/// fails.
pub fn run(config: &PipelineConfig) -> Result<Vec<Record>> {
    let mut records = table::read_batch(&config.cleaning_file())?;
    let revision_rows = read_revision_rows(&config.revision_extraction())?;
    info!(
        "compare: {} records against {} revision rows",
        records.len(),
        revision_rows.len()
    );

    merge_and_check(&mut records, &revision_rows);

    let errors = records
        .iter()
        .filter(|r| r.rev_status == RowStatus::Error)
        .count();
    info!("compare: {errors} revision mismatches");

    table::write_batch(&config.raw_validated(), &records)?;
    ResumeToken::completed(Stage::Compare, records.len()).save(&config.resume_token())?;
    Ok(records)
}
