//! Pipeline configuration and artifact locations.

use std::path::{Path, PathBuf};

/// Items processed between checkpoint flushes: a crash loses at most this
/// much OCR work.
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 10;

/// Immutable configuration for a pipeline run, built once and passed by
/// reference into each stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Directory holding all stage artifacts.
    pub project_dir: PathBuf,
    /// The master rule workbook (`.xlsx`) or rule CSV (`.csv`).
    pub master_rules: PathBuf,
    /// Edit-distance budget for the drawing-number filename repair.
    pub edit_budget: usize,
    /// Checkpoint flush interval, in items.
    pub checkpoint_interval: usize,
}

impl PipelineConfig {
    /// Create a configuration rooted at a project directory, with the rule
    /// source at its conventional location.
    #[must_use = "creates a pipeline configuration"]
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        let master_rules = project_dir.join("master_rules.xlsx");
        Self {
            project_dir,
            master_rules,
            edit_budget: 1,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }

    /// Override the rule source location.
    #[must_use = "returns the updated configuration"]
    pub fn with_master_rules(mut self, path: impl Into<PathBuf>) -> Self {
        self.master_rules = path.into();
        self
    }

    /// Override the drawing-number repair budget.
    #[must_use = "returns the updated configuration"]
    pub const fn with_edit_budget(mut self, budget: usize) -> Self {
        self.edit_budget = budget;
        self
    }

    fn artifact(&self, name: &str) -> PathBuf {
        self.project_dir.join(name)
    }

    /// Collaborator hand-off: per-image stamp detections.
    #[must_use = "returns the artifact path"]
    pub fn stamp_detections(&self) -> PathBuf {
        self.artifact("stamp_detections.json")
    }

    /// Collaborator hand-off: per-image revision-region detections.
    #[must_use = "returns the artifact path"]
    pub fn revision_detections(&self) -> PathBuf {
        self.artifact("revision_detections.json")
    }

    /// Output of the extraction stage.
    #[must_use = "returns the artifact path"]
    pub fn raw_extraction(&self) -> PathBuf {
        self.artifact("raw_extraction.csv")
    }

    /// Output of the cleaning stage.
    #[must_use = "returns the artifact path"]
    pub fn cleaning_file(&self) -> PathBuf {
        self.artifact("cleaning_file.csv")
    }

    /// Output of the revision-resolution stage.
    #[must_use = "returns the artifact path"]
    pub fn revision_extraction(&self) -> PathBuf {
        self.artifact("revision_extraction.csv")
    }

    /// Output of the merge + consistency stage.
    #[must_use = "returns the artifact path"]
    pub fn raw_validated(&self) -> PathBuf {
        self.artifact("raw_validated.csv")
    }

    /// Final validated table.
    #[must_use = "returns the artifact path"]
    pub fn validation_file(&self) -> PathBuf {
        self.artifact("validation_file.csv")
    }

    /// Per-field flag sidecar for the final table.
    #[must_use = "returns the artifact path"]
    pub fn validation_flags(&self) -> PathBuf {
        self.artifact("validation_flags.json")
    }

    /// HTML rendering of the final table.
    #[must_use = "returns the artifact path"]
    pub fn validation_report(&self) -> PathBuf {
        self.artifact("validation_report.html")
    }

    /// The explicit resume token.
    #[must_use = "returns the artifact path"]
    pub fn resume_token(&self) -> PathBuf {
        self.artifact("resume_token.json")
    }
}

/// Helper shared by stages that compare against filename evidence.
#[must_use = "returns the zero-padded sheet value"]
pub fn pad_sheet(value: &str) -> String {
    format!("{:0>3}", value.trim())
}

impl AsRef<Path> for PipelineConfig {
    fn as_ref(&self) -> &Path {
        &self.project_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths_under_project_dir() {
        let config = PipelineConfig::new("/tmp/project");
        assert_eq!(
            config.cleaning_file(),
            PathBuf::from("/tmp/project/cleaning_file.csv")
        );
        assert_eq!(
            config.master_rules,
            PathBuf::from("/tmp/project/master_rules.xlsx")
        );
    }

    #[test]
    fn test_builder_overrides() {
        let config = PipelineConfig::new("/tmp/project")
            .with_master_rules("/etc/rules.csv")
            .with_edit_budget(2);
        assert_eq!(config.master_rules, PathBuf::from("/etc/rules.csv"));
        assert_eq!(config.edit_budget, 2);
    }

    #[test]
    fn test_pad_sheet() {
        assert_eq!(pad_sheet("12"), "012");
        assert_eq!(pad_sheet("0123"), "0123");
        assert_eq!(pad_sheet(""), "000");
    }
}
