//! Tabular stage artifacts.
//!
//! Every pipeline stage reads its input table in full, mutates the batch in
//! memory and replaces its output artifact whole — no incremental merge.
//! The table format is CSV with a fixed header: `Image`, the field catalog
//! in canonical order, then the pipeline-added columns.

use crate::error::{Result, TitleblockError};
use crate::field::FieldName;
use crate::record::{CellFlag, Record, RowStatus};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Pipeline-added columns, appended after the field catalog.
const STATUS_COLUMNS: [&str; 4] = ["BLAD_STATUS", "FINAL_REV", "REV_DATE", "REV_STATUS"];

/// The full artifact header, in order.
#[must_use = "returns the artifact column header"]
pub fn column_header() -> Vec<String> {
    let mut header = Vec::with_capacity(1 + FieldName::ALL.len() + STATUS_COLUMNS.len());
    header.push("Image".to_string());
    header.extend(FieldName::ALL.iter().map(|f| f.label().to_string()));
    header.extend(STATUS_COLUMNS.iter().map(ToString::to_string));
    header
}

/// Write a batch of records as a CSV stage artifact, replacing any existing
/// file.
///
/// # Errors
///
/// Returns an error when the file cannot be created or a row fails to
/// serialize.
pub fn write_batch(path: &Path, records: &[Record]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    writer.write_record(column_header())?;

    for record in records {
        let mut row = Vec::with_capacity(1 + FieldName::ALL.len() + STATUS_COLUMNS.len());
        row.push(record.image.clone());
        for field in FieldName::ALL {
            row.push(record.get(field).to_string());
        }
        row.push(record.blad_status.as_str().to_string());
        row.push(record.final_rev.clone());
        row.push(record.rev_date.clone());
        row.push(record.rev_status.as_str().to_string());
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Read a batch of records from a CSV stage artifact.
///
/// Columns are matched by header name so column order does not matter.
/// Unknown columns are rejected: a record schema is fixed, and a stray
/// column means the artifact was not produced by this pipeline.
///
/// # Errors
///
/// Returns [`TitleblockError::MissingArtifact`] when the file does not
/// exist, and a CSV or schema error when it is malformed.
pub fn read_batch(path: &Path) -> Result<Vec<Record>> {
    if !path.exists() {
        return Err(TitleblockError::MissingArtifact(path.to_path_buf()));
    }

    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    let headers = reader.headers()?.clone();
    let mut image_idx = None;
    // column index → how to apply the cell to a record
    let mut columns: Vec<(usize, Column)> = Vec::new();

    for (idx, name) in headers.iter().enumerate() {
        let name = name.trim();
        if name == "Image" {
            image_idx = Some(idx);
        } else if let Some(pos) = STATUS_COLUMNS.iter().position(|c| *c == name) {
            columns.push((idx, Column::Status(pos)));
        } else {
            let field: FieldName = name.parse()?;
            columns.push((idx, Column::Field(field)));
        }
    }

    let image_idx = image_idx
        .ok_or_else(|| TitleblockError::StageError(format!("{}: no Image column", path.display())))?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let image = row.get(image_idx).unwrap_or("").trim();
        let mut record = Record::new(image);
        for &(idx, ref column) in &columns {
            let cell = row.get(idx).unwrap_or("");
            match *column {
                Column::Field(field) => record.set(field, cell),
                Column::Status(0) => record.blad_status = RowStatus::from_cell(cell),
                Column::Status(1) => record.final_rev = cell.to_string(),
                Column::Status(2) => record.rev_date = cell.to_string(),
                Column::Status(_) => record.rev_status = RowStatus::from_cell(cell),
            }
        }
        records.push(record);
    }

    Ok(records)
}

enum Column {
    Field(FieldName),
    Status(usize),
}

/// Write the per-field flag sidecar (image name → flags) as JSON.
///
/// CSV carries the authoritative status columns but not the per-cell notes;
/// the sidecar preserves those for rendering and downstream consumers.
///
/// # Errors
///
/// Returns an error when the file cannot be written.
pub fn write_flags(path: &Path, records: &[Record]) -> Result<()> {
    let flags: BTreeMap<&str, &Vec<CellFlag>> = records
        .iter()
        .filter(|r| !r.flags.is_empty())
        .map(|r| (r.image.as_str(), &r.flags))
        .collect();
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), &flags)?;
    Ok(())
}

/// Re-attach flags from a sidecar to a batch read via [`read_batch`].
///
/// # Errors
///
/// Returns an error when the sidecar exists but cannot be parsed. A missing
/// sidecar is not an error: flags are simply absent.
pub fn read_flags(path: &Path, records: &mut [Record]) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let file = File::open(path)?;
    let flags: BTreeMap<String, Vec<CellFlag>> = serde_json::from_reader(BufReader::new(file))?;
    for record in records.iter_mut() {
        if let Some(cell_flags) = flags.get(&record.image) {
            record.flags = cell_flags.clone();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_record(image: &str) -> Record {
        let mut record = Record::new(image);
        record.set(FieldName::Blad, "012");
        record.set(FieldName::Skala, "1:100 / 1:200");
        record.set(FieldName::Andr, "A.1");
        record.final_rev = "A.1".to_string();
        record
    }

    #[test]
    fn test_write_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cleaning_file.csv");

        let records = vec![sample_record("A_stamp.png"), sample_record("B_stamp.png")];
        write_batch(&path, &records).unwrap();

        let loaded = read_batch(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].image, "A_stamp.png");
        assert_eq!(loaded[0].get(FieldName::Skala), "1:100 / 1:200");
        assert_eq!(loaded[0].final_rev, "A.1");
        assert_eq!(loaded[0].rev_status, RowStatus::Ok);
    }

    #[test]
    fn test_missing_artifact_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("does_not_exist.csv");
        match read_batch(&path) {
            Err(TitleblockError::MissingArtifact(p)) => assert_eq!(p, path),
            other => panic!("expected MissingArtifact, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_column_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stray.csv");
        std::fs::write(&path, "Image,MYSTERY\nA_stamp.png,1\n").unwrap();
        match read_batch(&path) {
            Err(TitleblockError::UnknownField(name)) => assert_eq!(name, "MYSTERY"),
            other => panic!("expected UnknownField, got {other:?}"),
        }
    }

    #[test]
    fn test_status_columns_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("raw_validated.csv");

        let mut record = sample_record("A_stamp.png");
        record.rev_status = RowStatus::Error;
        record.blad_status = RowStatus::Error;
        write_batch(&path, &[record]).unwrap();

        let loaded = read_batch(&path).unwrap();
        assert_eq!(loaded[0].rev_status, RowStatus::Error);
        assert_eq!(loaded[0].blad_status, RowStatus::Error);
    }

    #[test]
    fn test_flags_sidecar_roundtrip() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("validation_file.csv");
        let flags_path = dir.path().join("validation_flags.json");

        let mut record = sample_record("A_stamp.png");
        record.flag(FieldName::Skala, "no matching pattern");
        write_batch(&csv_path, std::slice::from_ref(&record)).unwrap();
        write_flags(&flags_path, std::slice::from_ref(&record)).unwrap();

        let mut loaded = read_batch(&csv_path).unwrap();
        read_flags(&flags_path, &mut loaded).unwrap();
        assert!(loaded[0].is_flagged(FieldName::Skala));
    }
}
