//! Stage sequencing.
//!
//! Single-threaded and batch-sequential: each stage fully owns its output
//! artifact for the duration of its run and replaces it on completion.
//! Stage-internal data problems become flags; a missing upstream artifact
//! aborts the run.

use crate::checkpoint::{ResumeToken, Stage};
use crate::config::PipelineConfig;
use crate::{clean, compare, extract, master, revision};
use log::info;
use std::path::PathBuf;
use titleblock_core::{Record, Result};

/// Composes the five stages over a project directory.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline over a configuration.
    #[inline]
    #[must_use = "creates a pipeline instance"]
    pub const fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    #[inline]
    #[must_use = "returns the pipeline configuration"]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run a single stage.
    ///
    /// # Errors
    ///
    /// Propagates the stage's fatal errors (missing artifacts, unreadable
    /// catalog, I/O).
    pub fn run_stage(&self, stage: Stage) -> Result<()> {
        info!("stage {stage} started");
        match stage {
            Stage::Extract => extract::run(&self.config).map(drop)?,
            Stage::Clean => clean::run(&self.config).map(drop)?,
            Stage::Revision => revision::run(&self.config).map(drop)?,
            Stage::Compare => compare::run(&self.config).map(drop)?,
            Stage::Master => master::run(&self.config).map(drop)?,
        }
        info!("stage {stage} complete");
        Ok(())
    }

    /// Run the full pipeline. With `resume`, stages covered by the resume
    /// token are skipped and the run continues from the last good
    /// artifact.
    ///
    /// # Errors
    ///
    /// Aborts on the first stage failure; downstream stages do not run.
    pub fn run_all(&self, resume: bool) -> Result<PathBuf> {
        let token = if resume {
            ResumeToken::load(&self.config.resume_token())?
        } else {
            None
        };

        for stage in Stage::ALL {
            if let Some(token) = token {
                if token.covers(stage) {
                    info!("stage {stage} skipped (resume token)");
                    continue;
                }
            }
            self.run_stage(stage)?;
        }

        Ok(self.config.validation_file())
    }

    /// Load the final validated batch, flags attached.
    ///
    /// # Errors
    ///
    /// Fatal when the final artifact is missing.
    pub fn load_validated(&self) -> Result<Vec<Record>> {
        let mut records = titleblock_core::table::read_batch(&self.config.validation_file())?;
        titleblock_core::table::read_flags(&self.config.validation_flags(), &mut records)?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::StampDetections;
    use crate::revision::RevisionDetections;
    use titleblock_core::{FieldName, RowStatus};
    use titleblock_revision::TextDetection;

    fn detection(label: Option<&str>, text: &str, width: f32, y: f32) -> TextDetection {
        TextDetection {
            text: text.to_string(),
            confidence: 0.9,
            bbox: [(0.0, y - 5.0), (width, y - 5.0), (width, y + 5.0), (0.0, y + 5.0)],
            label: label.map(ToString::to_string),
        }
    }

    fn write_project(dir: &std::path::Path) -> PipelineConfig {
        let config = PipelineConfig::new(dir).with_master_rules(dir.join("master_rules.csv"));

        // Collaborator hand-off: one drawing, noisy OCR everywhere.
        let stamps = vec![StampDetections {
            image: "X-12-034-0099-0_0-AB12_stamp.png".to_string(),
            detections: vec![
                detection(Some("RITNINGSNUMMER_PROJEKT"), "X-12-034-0099-0_0-AB1", 400.0, 5.0),
                detection(Some("BLAD"), "O12", 40.0, 5.0),
                detection(Some("FORMAT"), "AI", 40.0, 5.0),
                detection(Some("ANDR"), "41", 40.0, 5.0),
                detection(Some("LEVERANTOR_1"), "tyrens", 120.0, 5.0),
            ],
        }];
        std::fs::write(
            config.stamp_detections(),
            serde_json::to_string(&stamps).unwrap(),
        )
        .unwrap();

        let revisions = vec![RevisionDetections {
            file: "X-12-034-0099-0_0-AB12_p1.png".to_string(),
            primary: vec![
                detection(None, "REV: A 2024-03-01", 300.0, 10.0),
                detection(None, "A.1", 40.0, 12.0),
            ],
            fallback: Vec::new(),
        }];
        std::fs::write(
            config.revision_detections(),
            serde_json::to_string(&revisions).unwrap(),
        )
        .unwrap();

        std::fs::write(
            &config.master_rules,
            "SECTION,LABEL,VALUE\nVALUE,FORMAT,A1\nPATTERN,BLAD,\"\\d{2,4}\"\nFREETEXT,TITLE,\n",
        )
        .unwrap();

        config
    }

    #[test]
    fn test_end_to_end_run() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = write_project(dir.path());
        let pipeline = Pipeline::new(config);

        let final_path = pipeline.run_all(false).unwrap();
        assert!(final_path.exists());

        let records = pipeline.load_validated().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];

        // Drawing number: the OCR lost the final character, one edit away
        // from the filename evidence, so the filename wins.
        assert_eq!(
            record.get(FieldName::RitningsnummerProjekt),
            "X-12-034-0099-0_0-AB12"
        );
        assert_eq!(record.get(FieldName::Format), "A1");
        // Sheet "O12" normalized to "012"; filename digits "12": integer
        // comparison succeeds, no flag.
        assert_eq!(record.get(FieldName::Blad), "012");
        assert!(!record.is_flagged(FieldName::Blad));
        // Recorded "41" → "A.1"; resolved topmost labeled row "A": the
        // labeled row wins, so recorded A.1 vs resolved A mismatch.
        assert_eq!(record.get(FieldName::Andr), "A.1");
        assert_eq!(record.final_rev, "A");
        assert_eq!(record.rev_status, RowStatus::Error);
        // Precedence: the revision error suppresses field-level flags.
        assert!(record.flags.is_empty());
    }

    #[test]
    fn test_missing_upstream_artifact_aborts() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = PipelineConfig::new(dir.path());
        let pipeline = Pipeline::new(config);
        // No artifacts at all: the clean stage has nothing to read.
        assert!(pipeline.run_stage(Stage::Clean).is_err());
    }

    #[test]
    fn test_resume_skips_completed_stages() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = write_project(dir.path());
        let pipeline = Pipeline::new(config.clone());
        pipeline.run_all(false).unwrap();

        // Remove the collaborator dumps; a resumed run must not need them.
        std::fs::remove_file(config.stamp_detections()).unwrap();
        std::fs::remove_file(config.revision_detections()).unwrap();
        pipeline.run_all(true).unwrap();
    }
}
