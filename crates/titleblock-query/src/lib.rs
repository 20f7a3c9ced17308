//! # titleblock-query - Filtered projection over validated records
//!
//! A read-only query surface over the final validated table: a boolean
//! filter expression of exact field equalities (`AND`-joined) and a
//! result-size cap. Clauses containing statement separators or mutating
//! keywords are rejected outright — defense in depth, not a parser — and
//! return an empty result.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use titleblock_core::{FieldName, Record};

/// Default result-size cap.
pub const DEFAULT_TOP_N: usize = 50;

/// Tokens that mark a clause as unsafe. Matched case-insensitively as
/// substrings, mirroring the guard on the original query front-end.
const FORBIDDEN_TOKENS: [&str; 6] = [";", "--", "DROP", "DELETE", "INSERT", "UPDATE"];

static CONDITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*([A-Za-z_0-9]+)\s*=\s*(?:'([^']*)'|"([^"]*)"|(\S+))\s*$"#)
        .expect("Invalid regex")
});
static AND_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+AND\s+").expect("Invalid regex"));

/// Whether a filter clause is free of forbidden tokens.
#[must_use = "returns whether the clause is safe to evaluate"]
pub fn is_safe_clause(clause: &str) -> bool {
    let upper = clause.to_uppercase();
    !FORBIDDEN_TOKENS.iter().any(|token| upper.contains(token))
}

/// A column addressable in a filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Column {
    Image,
    Field(FieldName),
    BladStatus,
    FinalRev,
    RevDate,
    RevStatus,
}

impl Column {
    fn parse(label: &str) -> Option<Self> {
        match label {
            "Image" | "IMAGE" | "FILE" => Some(Self::Image),
            "BLAD_STATUS" => Some(Self::BladStatus),
            "FINAL_REV" => Some(Self::FinalRev),
            "REV_DATE" => Some(Self::RevDate),
            "REV_STATUS" => Some(Self::RevStatus),
            other => other.parse::<FieldName>().ok().map(Self::Field),
        }
    }

    fn value<'a>(&self, record: &'a Record) -> &'a str {
        match self {
            Self::Image => &record.image,
            Self::Field(field) => record.get(*field),
            Self::BladStatus => record.blad_status.as_str(),
            Self::FinalRev => &record.final_rev,
            Self::RevDate => &record.rev_date,
            Self::RevStatus => record.rev_status.as_str(),
        }
    }
}

/// A parsed conjunction of exact-equality conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpr {
    conditions: Vec<(Column, String)>,
}

impl FilterExpr {
    /// Parse a clause. Returns `None` for unsafe or malformed input —
    /// callers answer both with an empty result, never an error.
    #[must_use = "returns the parsed filter, if valid"]
    pub fn parse(clause: &str) -> Option<Self> {
        let clause = clause.trim();
        if clause.is_empty() {
            return Some(Self {
                conditions: Vec::new(),
            });
        }
        if !is_safe_clause(clause) {
            warn!("unsafe filter clause blocked");
            return None;
        }

        let mut conditions = Vec::new();
        for part in AND_SPLIT.split(clause) {
            let caps = CONDITION.captures(part)?;
            let column = Column::parse(caps.get(1)?.as_str())?;
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string())?;
            conditions.push((column, value));
        }
        Some(Self { conditions })
    }

    /// Whether a record satisfies every condition.
    #[must_use = "returns whether the record matches"]
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions
            .iter()
            .all(|(column, value)| column.value(record) == value)
    }
}

/// Filter the validated table. Unsafe or malformed clauses yield an empty
/// result; an empty clause yields the first `top_n` records.
#[must_use = "returns the matching records"]
pub fn search<'a>(records: &'a [Record], clause: &str, top_n: usize) -> Vec<&'a Record> {
    let Some(filter) = FilterExpr::parse(clause) else {
        return Vec::new();
    };
    records
        .iter()
        .filter(|r| filter.matches(r))
        .take(top_n)
        .collect()
}
