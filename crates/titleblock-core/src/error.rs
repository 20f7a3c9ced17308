//! Error types for the titleblock pipeline.
//!
//! Stage-internal data problems (malformed values, cross-source mismatches)
//! are never errors — they degrade into per-field flags on the record.
//! `TitleblockError` covers the failures that must abort a stage: missing
//! artifacts, unreadable catalogs, I/O.

use std::path::PathBuf;
use thiserror::Error;

/// Error types that can occur while running pipeline stages.
///
/// # Examples
///
/// ```rust,ignore
/// use titleblock_core::{Result, TitleblockError};
///
/// fn load_stage_input(path: &std::path::Path) -> Result<String> {
///     if !path.exists() {
///         return Err(TitleblockError::MissingArtifact(path.to_path_buf()));
///     }
///     Ok(std::fs::read_to_string(path)?)
/// }
/// ```
#[derive(Error, Debug)]
pub enum TitleblockError {
    /// File I/O error while reading inputs or writing stage artifacts.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV read/write error on a tabular stage artifact.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// JSON error on a detection dump, flag sidecar or resume token.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A required stage input (upstream artifact, rule workbook) does not
    /// exist. Fatal for the stage: no partial validation is produced.
    #[error("Missing required artifact: {0}")]
    MissingArtifact(PathBuf),

    /// The master rule workbook could not be read or is malformed.
    #[error("Rule catalog error: {0}")]
    CatalogError(String),

    /// A record was constructed or deserialized with a field outside the
    /// static field catalog.
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// A stage failed in a way that is not attributable to a single record.
    #[error("Stage error: {0}")]
    StageError(String),
}

/// Type alias for [`Result<T, TitleblockError>`].
pub type Result<T> = std::result::Result<T, TitleblockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_artifact_display() {
        let err = TitleblockError::MissingArtifact(PathBuf::from("/tmp/cleaning_file.csv"));
        let display = format!("{err}");
        assert!(display.contains("Missing required artifact"));
        assert!(display.contains("cleaning_file.csv"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TitleblockError = io_err.into();
        match err {
            TitleblockError::IoError(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            _ => panic!("Expected IoError variant"),
        }
    }

    #[test]
    fn test_unknown_field_display() {
        let err = TitleblockError::UnknownField("MYSTERY_COLUMN".to_string());
        assert_eq!(format!("{err}"), "Unknown field: MYSTERY_COLUMN");
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn inner() -> Result<()> {
            Err(TitleblockError::CatalogError("duplicate label".to_string()))
        }
        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }
        match outer() {
            Err(TitleblockError::CatalogError(msg)) => assert_eq!(msg, "duplicate label"),
            _ => panic!("Expected CatalogError to propagate"),
        }
    }
}
