//! Master validation stage.
//!
//! Loads the rule catalog, validates the merged batch, and writes the
//! final artifacts: the validated table, the per-field flag sidecar, and
//! the HTML rendering derived from them.

use crate::checkpoint::{ResumeToken, Stage};
use crate::config::PipelineConfig;
use log::info;
use titleblock_core::{table, HtmlRenderer, Record, Result};
use titleblock_validate::{MasterValidator, RuleCatalog};

/// Load the rule catalog from the configured source, dispatching on the
/// file extension (`.csv` rows or an `.xlsx` workbook).
///
/// # Errors
///
/// A missing or malformed catalog is fatal: no partial validation is
/// produced.
pub fn load_catalog(config: &PipelineConfig) -> Result<RuleCatalog> {
    let path = &config.master_rules;
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => RuleCatalog::from_csv(path),
        _ => RuleCatalog::from_workbook(path),
    }
}

/// Run the master validation stage.
///
/// # Errors
///
/// Fatal when the merged artifact or the rule catalog is missing, or when
/// an output write fails.
pub fn run(config: &PipelineConfig) -> Result<Vec<Record>> {
    let mut records = table::read_batch(&config.raw_validated())?;
    let catalog = load_catalog(config)?;
    info!("master: validating {} records", records.len());

    // Error state is re-derived in full on every run.
    for record in &mut records {
        record.flags.clear();
    }
    MasterValidator::new(&catalog).validate(&mut records);

    let flagged = records.iter().filter(|r| !r.flags.is_empty()).count();
    info!("master: {flagged} records carry field flags");

    table::write_batch(&config.validation_file(), &records)?;
    table::write_flags(&config.validation_flags(), &records)?;
    std::fs::write(
        config.validation_report(),
        HtmlRenderer::new().render(&records),
    )?;
    ResumeToken::completed(Stage::Master, records.len()).save(&config.resume_token())?;
    Ok(records)
}
