//! Revision-resolution stage: region detections → one revision per image.
//!
//! Consumes the collaborator hand-off of revision-region detections
//! (pooled across preprocessing variants), arbitrates each image and
//! writes the small `FILE` / `FINAL_REV` / `REV_DATE` artifact, with a
//! checkpoint flush every N images.

use crate::checkpoint::{ResumeToken, Stage};
use crate::config::PipelineConfig;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use titleblock_core::{Result, TitleblockError};
use titleblock_normalize::NO_REVISION_CODE;
use titleblock_revision::{RevisionResolver, TextDetection};

/// Collaborator hand-off for one image's revision regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionDetections {
    /// Revision crop file name (joins to the stamp batch via the document
    /// key).
    pub file: String,
    /// Detections from the primary region, pooled across variants.
    #[serde(default)]
    pub primary: Vec<TextDetection>,
    /// Detections from the fallback region.
    #[serde(default)]
    pub fallback: Vec<TextDetection>,
}

/// One row of the revision artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRow {
    /// Revision crop file name.
    pub file: String,
    /// Resolved code, or the `"_"` sentinel.
    pub final_rev: String,
    /// ISO date, or empty.
    pub rev_date: String,
}

/// Read the collaborator dump.
///
/// # Errors
///
/// A missing dump is fatal for the stage.
pub fn read_revision_detections(path: &Path) -> Result<Vec<RevisionDetections>> {
    if !path.exists() {
        return Err(TitleblockError::MissingArtifact(path.to_path_buf()));
    }
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Arbitrate one image: primary region first, fallback only when the
/// primary yields nothing.
#[must_use = "returns the revision row"]
pub fn resolve_image(resolver: &RevisionResolver, input: &RevisionDetections) -> RevisionRow {
    let resolved = resolver
        .resolve_detections(&input.primary)
        .or_else(|| resolver.resolve_detections(&input.fallback));

    match resolved {
        Some(revision) => RevisionRow {
            file: input.file.clone(),
            final_rev: revision.code,
            rev_date: revision
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        },
        None => RevisionRow {
            file: input.file.clone(),
            final_rev: NO_REVISION_CODE.to_string(),
            rev_date: String::new(),
        },
    }
}

/// Write the revision artifact, replacing any existing file.
///
/// # Errors
///
/// Returns an error when the file cannot be written.
pub fn write_revision_rows(path: &Path, rows: &[RevisionRow]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    writer.write_record(["FILE", "FINAL_REV", "REV_DATE"])?;
    for row in rows {
        writer.write_record([&row.file, &row.final_rev, &row.rev_date])?;
    }
    writer.flush()?;
    Ok(())
}

/// Read the revision artifact.
///
/// # Errors
///
/// A missing artifact is fatal for the downstream merge stage.
pub fn read_revision_rows(path: &Path) -> Result<Vec<RevisionRow>> {
    if !path.exists() {
        return Err(TitleblockError::MissingArtifact(path.to_path_buf()));
    }
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));
    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row?;
        rows.push(RevisionRow {
            file: row.get(0).unwrap_or("").trim().to_string(),
            final_rev: row.get(1).unwrap_or("").trim().to_string(),
            rev_date: row.get(2).unwrap_or("").trim().to_string(),
        });
    }
    Ok(rows)
}

/// Run the revision stage.
///
/// # Errors
///
/// Fatal when the detection dump is missing or an artifact write fails.
pub fn run(config: &PipelineConfig) -> Result<Vec<RevisionRow>> {
    let inputs = read_revision_detections(&config.revision_detections())?;
    info!("revision: {} images", inputs.len());

    let resolver = RevisionResolver::new();
    let mut rows = Vec::with_capacity(inputs.len());

    for (idx, input) in inputs.iter().enumerate() {
        rows.push(resolve_image(&resolver, input));

        let done = idx + 1;
        if done % config.checkpoint_interval == 0 {
            write_revision_rows(&config.revision_extraction(), &rows)?;
            ResumeToken::partial(Stage::Revision, done).save(&config.resume_token())?;
            info!("revision: checkpoint after {done} images");
        }
    }

    write_revision_rows(&config.revision_extraction(), &rows)?;
    ResumeToken::completed(Stage::Revision, rows.len()).save(&config.resume_token())?;
    Ok(rows)
}
