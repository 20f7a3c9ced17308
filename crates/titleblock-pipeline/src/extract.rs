//! Extraction stage: collaborator detections → raw record batch.
//!
//! The object-detection model and the OCR engine are external
//! collaborators; their hand-off is a JSON dump of labeled detections per
//! image. This stage folds those detections into one raw record per image.

use crate::checkpoint::{ResumeToken, Stage};
use crate::config::PipelineConfig;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use titleblock_core::{table, FieldName, Record, Result, TitleblockError};
use titleblock_revision::TextDetection;

/// Collaborator hand-off for one image: every labeled detection the
/// detector + OCR produced over its stamp crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampDetections {
    /// Source image name.
    pub image: String,
    /// Labeled detections; the `label` field carries the region label.
    pub detections: Vec<TextDetection>,
}

/// Read the collaborator dump.
///
/// # Errors
///
/// A missing dump is fatal for the stage; a malformed dump is a JSON
/// error.
pub fn read_stamp_detections(path: &Path) -> Result<Vec<StampDetections>> {
    if !path.exists() {
        return Err(TitleblockError::MissingArtifact(path.to_path_buf()));
    }
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Whether a raw sheet reading is usable as a sheet-number candidate:
/// a 1-4 glyph run that is all digits after the usual O/I/l confusions.
fn is_valid_sheet(text: &str) -> bool {
    let repaired = text.trim().replace('O', "0").replace(['I', 'l'], "1");
    !repaired.is_empty() && repaired.len() <= 4 && repaired.chars().all(|c| c.is_ascii_digit())
}

/// Fold one image's detections into a raw record.
///
/// Per label the first reading wins, except the sheet number where the
/// shortest valid digit run wins: the detector often returns both the
/// sheet cell and a wider crop containing neighboring digits.
#[must_use = "returns the extracted record"]
pub fn extract_record(input: &StampDetections) -> Record {
    let mut record = Record::new(input.image.as_str());
    let mut best_sheet = String::new();

    for detection in &input.detections {
        let Some(label) = detection.label.as_deref() else {
            continue;
        };
        let Ok(field) = label.parse::<FieldName>() else {
            warn!("{}: unknown detection label {label}", input.image);
            continue;
        };

        if field == FieldName::Blad {
            let text = detection.text.trim();
            if is_valid_sheet(text) && (best_sheet.is_empty() || text.len() < best_sheet.len()) {
                best_sheet = text.to_string();
            }
            continue;
        }

        if record.get(field).is_empty() {
            record.set(field, detection.text.as_str());
        }
    }

    record.set(FieldName::Blad, best_sheet);
    record
}

/// Run the extraction stage: read the collaborator dump, fold each image,
/// checkpoint every N items, and replace the raw-extraction artifact.
///
/// # Errors
///
/// Fatal when the detection dump is missing or unreadable, or when an
/// artifact write fails.
pub fn run(config: &PipelineConfig) -> Result<Vec<Record>> {
    let inputs = read_stamp_detections(&config.stamp_detections())?;
    info!("extract: {} images", inputs.len());

    let mut records = Vec::with_capacity(inputs.len());
    for (idx, input) in inputs.iter().enumerate() {
        records.push(extract_record(input));

        let done = idx + 1;
        if done % config.checkpoint_interval == 0 {
            table::write_batch(&config.raw_extraction(), &records)?;
            ResumeToken::partial(Stage::Extract, done).save(&config.resume_token())?;
            info!("extract: checkpoint after {done} images");
        }
    }

    table::write_batch(&config.raw_extraction(), &records)?;
    ResumeToken::completed(Stage::Extract, records.len()).save(&config.resume_token())?;
    Ok(records)
}
