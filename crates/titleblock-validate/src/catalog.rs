//! The master rule catalog.
//!
//! Three disjoint rule collections keyed by field label, loaded once from
//! the reference workbook and read-only during a validation run:
//!
//! - `VALUE`: exact-match value sets
//! - `PATTERN`: ordered regex lists
//! - `FREETEXT`: labels exempt from validation
//!
//! A label may appear in at most one collection; fields absent from all
//! three are left unchecked.

use calamine::{open_workbook, Data, DataType, Reader, Xlsx};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use titleblock_core::{Result, TitleblockError};

/// The three workbook sheet names.
const SHEETS: [&str; 3] = ["VALUE", "PATTERN", "FREETEXT"];

/// Immutable rule catalog.
#[derive(Debug, Default)]
pub struct RuleCatalog {
    value_rules: HashMap<String, HashSet<String>>,
    pattern_rules: HashMap<String, Vec<Regex>>,
    freetext: HashSet<String>,
}

impl RuleCatalog {
    /// Build a catalog from raw `(LABEL, VALUE)` section rows.
    ///
    /// # Errors
    ///
    /// Returns [`TitleblockError::CatalogError`] when a pattern fails to
    /// compile or a label appears in more than one section.
    pub fn from_sections(
        value_rows: &[(String, String)],
        pattern_rows: &[(String, String)],
        freetext_labels: &[String],
    ) -> Result<Self> {
        let mut value_rules: HashMap<String, HashSet<String>> = HashMap::new();
        for (label, value) in value_rows {
            value_rules
                .entry(label.trim().to_string())
                .or_default()
                .insert(value.trim().to_string());
        }

        let mut pattern_rules: HashMap<String, Vec<Regex>> = HashMap::new();
        for (label, pattern) in pattern_rows {
            let pattern = pattern.trim();
            if pattern.is_empty() {
                continue;
            }
            // Patterns must match the whole value.
            let anchored = format!("^(?:{pattern})$");
            let regex = Regex::new(&anchored).map_err(|e| {
                TitleblockError::CatalogError(format!("bad pattern for {label}: {e}"))
            })?;
            pattern_rules
                .entry(label.trim().to_string())
                .or_default()
                .push(regex);
        }

        let freetext: HashSet<String> =
            freetext_labels.iter().map(|l| l.trim().to_string()).collect();

        let catalog = Self {
            value_rules,
            pattern_rules,
            freetext,
        };
        catalog.check_disjoint()?;
        Ok(catalog)
    }

    /// A label in two collections would make rule selection ambiguous.
    fn check_disjoint(&self) -> Result<()> {
        for label in self.value_rules.keys() {
            if self.pattern_rules.contains_key(label) || self.freetext.contains(label) {
                return Err(TitleblockError::CatalogError(format!(
                    "label {label} appears in more than one rule section"
                )));
            }
        }
        for label in self.pattern_rules.keys() {
            if self.freetext.contains(label) {
                return Err(TitleblockError::CatalogError(format!(
                    "label {label} appears in more than one rule section"
                )));
            }
        }
        Ok(())
    }

    /// Load the catalog from the master reference workbook
    /// (sheets `VALUE`, `PATTERN`, `FREETEXT`, columns `LABEL`, `VALUE`).
    ///
    /// # Errors
    ///
    /// Returns [`TitleblockError::MissingArtifact`] when the workbook does
    /// not exist and [`TitleblockError::CatalogError`] when it cannot be
    /// read. A missing catalog is fatal: no partial validation is produced.
    pub fn from_workbook(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TitleblockError::MissingArtifact(path.to_path_buf()));
        }

        let mut workbook: Xlsx<_> = open_workbook(path)
            .map_err(|e| TitleblockError::CatalogError(format!("{}: {e}", path.display())))?;

        let mut sections: Vec<Vec<(String, String)>> = Vec::with_capacity(SHEETS.len());
        for sheet in SHEETS {
            let range = workbook.worksheet_range(sheet).map_err(|e| {
                TitleblockError::CatalogError(format!("missing sheet {sheet}: {e}"))
            })?;

            let mut rows = Vec::new();
            for row in range.rows() {
                let label = cell_text(row.first());
                if label.is_empty() || label == "LABEL" {
                    continue;
                }
                let value = cell_text(row.get(1));
                rows.push((label, value));
            }
            sections.push(rows);
        }

        let freetext: Vec<String> = sections[2].iter().map(|(l, _)| l.clone()).collect();
        Self::from_sections(&sections[0], &sections[1], &freetext)
    }

    /// Load the catalog from a single CSV with columns
    /// `SECTION,LABEL,VALUE`, the hand-off format used in tests and
    /// CSV-sourced deployments.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`RuleCatalog::from_workbook`].
    pub fn from_csv(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TitleblockError::MissingArtifact(path.to_path_buf()));
        }

        let file = File::open(path)?;
        let mut reader = csv::Reader::from_reader(BufReader::new(file));

        let mut value_rows = Vec::new();
        let mut pattern_rows = Vec::new();
        let mut freetext = Vec::new();

        for row in reader.records() {
            let row = row?;
            let section = row.get(0).unwrap_or("").trim().to_uppercase();
            let label = row.get(1).unwrap_or("").trim().to_string();
            let value = row.get(2).unwrap_or("").trim().to_string();
            if label.is_empty() {
                continue;
            }
            match section.as_str() {
                "VALUE" => value_rows.push((label, value)),
                "PATTERN" => pattern_rows.push((label, value)),
                "FREETEXT" => freetext.push(label),
                other => {
                    return Err(TitleblockError::CatalogError(format!(
                        "unknown rule section: {other}"
                    )))
                }
            }
        }

        Self::from_sections(&value_rows, &pattern_rows, &freetext)
    }

    /// The allowed value set for a label, if it is value-ruled.
    #[inline]
    #[must_use = "returns the value rule set"]
    pub fn value_rule(&self, label: &str) -> Option<&HashSet<String>> {
        self.value_rules.get(label)
    }

    /// The pattern list for a label, if it is pattern-ruled.
    #[inline]
    #[must_use = "returns the pattern rule list"]
    pub fn pattern_rule(&self, label: &str) -> Option<&[Regex]> {
        self.pattern_rules.get(label).map(Vec::as_slice)
    }

    /// Whether a label is exempt from validation.
    #[inline]
    #[must_use = "returns whether the label is freetext"]
    pub fn is_freetext(&self, label: &str) -> bool {
        self.freetext.contains(label)
    }
}

fn cell_text(cell: Option<&Data>) -> String {
    cell.and_then(DataType::as_string)
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(l, v)| ((*l).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_from_sections() {
        let catalog = RuleCatalog::from_sections(
            &rows(&[("FORMAT", "A1"), ("FORMAT", "A3")]),
            &rows(&[("BLAD", r"\d{2,4}")]),
            &["TITLE".to_string()],
        )
        .unwrap();

        assert!(catalog.value_rule("FORMAT").unwrap().contains("A1"));
        assert_eq!(catalog.pattern_rule("BLAD").unwrap().len(), 1);
        assert!(catalog.is_freetext("TITLE"));
        assert!(catalog.value_rule("UNRULED").is_none());
    }

    #[test]
    fn test_patterns_are_anchored() {
        let catalog = RuleCatalog::from_sections(
            &[],
            &rows(&[("BLAD", r"\d{2,4}")]),
            &[],
        )
        .unwrap();
        let patterns = catalog.pattern_rule("BLAD").unwrap();
        assert!(patterns[0].is_match("012"));
        // A full match is required, not a substring hit.
        assert!(!patterns[0].is_match("x012y"));
    }

    #[test]
    fn test_disjointness_enforced() {
        let result = RuleCatalog::from_sections(
            &rows(&[("FORMAT", "A1")]),
            &rows(&[("FORMAT", r"A\d")]),
            &[],
        );
        assert!(matches!(result, Err(TitleblockError::CatalogError(_))));
    }

    #[test]
    fn test_empty_patterns_skipped() {
        let catalog =
            RuleCatalog::from_sections(&[], &rows(&[("BLAD", ""), ("BLAD", r"\d+")]), &[]).unwrap();
        assert_eq!(catalog.pattern_rule("BLAD").unwrap().len(), 1);
    }

    #[test]
    fn test_bad_pattern_is_fatal() {
        let result = RuleCatalog::from_sections(&[], &rows(&[("BLAD", "(")]), &[]);
        assert!(matches!(result, Err(TitleblockError::CatalogError(_))));
    }

    #[test]
    fn test_from_csv() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("master_rules.csv");
        std::fs::write(
            &path,
            "SECTION,LABEL,VALUE\nVALUE,FORMAT,A1\nVALUE,FORMAT,A3\nPATTERN,BLAD,\"\\d{2,4}\"\nFREETEXT,TITLE,\n",
        )
        .unwrap();

        let catalog = RuleCatalog::from_csv(&path).unwrap();
        assert!(catalog.value_rule("FORMAT").unwrap().contains("A3"));
        assert!(catalog.is_freetext("TITLE"));
    }

    #[test]
    fn test_missing_workbook_is_fatal() {
        let result = RuleCatalog::from_workbook(Path::new("/nonexistent/master.xlsx"));
        assert!(matches!(result, Err(TitleblockError::MissingArtifact(_))));
    }
}
