//! # titleblock-pipeline - Stage orchestration and artifact hand-off
//!
//! Sequences the five pipeline stages over a batch of records:
//!
//! 1. [`extract`]: collaborator detections → raw record batch
//! 2. [`clean`]: per-field normalization + filename-evidence rules
//! 3. [`revision`]: revision candidate resolution per image
//! 4. [`compare`]: merge on document key + revision consistency
//! 5. [`master`]: rule-catalog validation + final artifacts
//!
//! Execution is single-threaded and batch-sequential. Each stage reads its
//! input artifact in full, mutates the batch in memory and replaces its
//! output artifact whole, so every stage is re-runnable from its input.
//! Stages that spend OCR-scale work per item checkpoint every
//! [`config::DEFAULT_CHECKPOINT_INTERVAL`] items; completion is recorded in
//! an explicit [`ResumeToken`] rather than inferred from file presence.

pub mod checkpoint;
pub mod clean;
pub mod compare;
pub mod config;
pub mod extract;
pub mod master;
pub mod orchestrator;
pub mod revision;

pub use checkpoint::{ResumeToken, Stage};
pub use config::PipelineConfig;
pub use orchestrator::Pipeline;
