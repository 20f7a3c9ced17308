//! # titleblock-normalize - Field normalization engine
//!
//! Turns ragged OCR strings into canonical field values via alias tables,
//! OCR-confusion repair and structural regex rules. Cleaners are pure and
//! total: structural malformation never raises — a value that cannot be
//! repaired degrades to a best-effort string and is judged by the
//! validator, not here.

pub mod aliases;
pub mod cleaners;
pub mod engine;

pub use aliases::OrgAliasTable;
pub use cleaners::{repair_with_expected, NO_REVISION_CODE};
pub use engine::Normalizer;
