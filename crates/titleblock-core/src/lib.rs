//! # titleblock-core - Record types and tabular I/O
//!
//! Core types shared by every pipeline stage:
//!
//! - [`FieldName`] / [`NormalizerKind`]: the static field catalog of the
//!   title-block schema, with per-field normalizer and empty-value policy.
//! - [`Record`] / [`DocKey`]: one drawing, keyed by the canonical document
//!   identifier derived from the source filename, carrying field values,
//!   row statuses and per-field error flags.
//! - [`table`]: CSV stage artifacts (full-replace semantics) and the flag
//!   sidecar.
//! - [`HtmlRenderer`]: presentation of error state, derived from flags.
//!
//! Data flows strictly forward through the pipeline: raw detections →
//! normalized record → resolved revision → consistency-flagged record →
//! rule-validated, annotated record. Each stage is re-runnable from its
//! input artifact and overwrites its output in full.

pub mod error;
pub mod field;
pub mod record;
pub mod render;
pub mod table;

pub use error::{Result, TitleblockError};
pub use field::{FieldName, NormalizerKind};
pub use record::{CellFlag, DocKey, Record, RowStatus};
pub use render::HtmlRenderer;
