//! Periodic checkpointing and the explicit resume token.
//!
//! Stages that spend OCR-scale work per item flush their in-progress batch
//! every N items, so a crash loses at most N items. Stage completion is
//! recorded in an explicit resume token rather than inferred from file
//! presence; `run --resume` consults the token to skip completed stages.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use titleblock_core::Result;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Raw field extraction from collaborator detections.
    Extract,
    /// Per-field normalization.
    Clean,
    /// Revision candidate resolution.
    Revision,
    /// Merge + revision consistency.
    Compare,
    /// Master rule validation.
    Master,
}

impl Stage {
    /// All stages, in execution order.
    pub const ALL: [Self; 5] = [
        Self::Extract,
        Self::Clean,
        Self::Revision,
        Self::Compare,
        Self::Master,
    ];
}

impl std::fmt::Display for Stage {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Extract => "extract",
            Self::Clean => "clean",
            Self::Revision => "revision",
            Self::Compare => "compare",
            Self::Master => "master",
        };
        f.write_str(name)
    }
}

/// The durable record of pipeline progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeToken {
    /// Last stage that ran (possibly partially).
    pub stage: Stage,
    /// Items flushed so far within that stage.
    pub items_done: usize,
    /// Whether the stage ran to completion.
    pub complete: bool,
}

impl ResumeToken {
    /// Record partial progress within a stage.
    #[inline]
    #[must_use = "creates a resume token"]
    pub const fn partial(stage: Stage, items_done: usize) -> Self {
        Self {
            stage,
            items_done,
            complete: false,
        }
    }

    /// Record a completed stage.
    #[inline]
    #[must_use = "creates a resume token"]
    pub const fn completed(stage: Stage, items_done: usize) -> Self {
        Self {
            stage,
            items_done,
            complete: true,
        }
    }

    /// Write the token, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error when the token cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Load the token if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error when the token exists but cannot be parsed.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(path)?;
        let token = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(token))
    }

    /// Whether a stage can be skipped on resume: it is at or before the
    /// recorded stage and the recorded stage completed.
    #[must_use = "returns whether the stage is already done"]
    pub fn covers(&self, stage: Stage) -> bool {
        if stage < self.stage {
            return true;
        }
        stage == self.stage && self.complete
    }
}
