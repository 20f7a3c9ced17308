//! The normalization engine: dispatches each field to its cleaner.

use crate::aliases::OrgAliasTable;
use crate::cleaners;
use titleblock_core::{FieldName, NormalizerKind};

/// Pure-function field cleaner dispatch.
///
/// Built once at process start (the alias table is immutable configuration)
/// and passed by reference into the cleaning stage. Normalizers never fail:
/// a missing value normalizes to the empty string, except the
/// revision-change code which normalizes to its `"_"` sentinel.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    aliases: OrgAliasTable,
}

impl Normalizer {
    /// Create an engine with the built-in alias table.
    #[inline]
    #[must_use = "creates a normalizer instance"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with a custom alias table.
    #[inline]
    #[must_use = "creates a normalizer instance"]
    pub fn with_aliases(aliases: OrgAliasTable) -> Self {
        Self { aliases }
    }

    /// The alias table in use.
    #[inline]
    #[must_use = "returns the alias table"]
    pub fn aliases(&self) -> &OrgAliasTable {
        &self.aliases
    }

    /// Normalize a raw OCR value for a field.
    #[must_use = "returns the normalized value"]
    pub fn normalize(&self, field: FieldName, raw: &str) -> String {
        match field.normalizer() {
            NormalizerKind::Default => cleaners::clean_default(raw),
            NormalizerKind::UpperCase => cleaners::clean_upper(raw),
            NormalizerKind::SupplierPrimary => {
                cleaners::clean_supplier_primary(raw, &self.aliases)
            }
            NormalizerKind::SupplierSecondary => {
                cleaners::clean_supplier_secondary(raw, &self.aliases)
            }
            NormalizerKind::Person => cleaners::clean_person(raw, &self.aliases),
            NormalizerKind::Title => cleaners::clean_title(raw),
            NormalizerKind::TechnicalArea => cleaners::clean_technical_area(raw),
            NormalizerKind::ReviewStatus => cleaners::clean_review_status(raw),
            NormalizerKind::DeliveryNote => cleaners::clean_delivery_note(raw),
            NormalizerKind::DistanceMarker => cleaners::clean_distance_marker(raw),
            NormalizerKind::SheetNumber => cleaners::clean_sheet_number(raw),
            NormalizerKind::Scale => cleaners::clean_scale(raw),
            NormalizerKind::PaperFormat => cleaners::clean_paper_format(raw),
            NormalizerKind::Description { keep_slash } => {
                cleaners::clean_description(raw, keep_slash)
            }
            NormalizerKind::RevisionCode => cleaners::clean_revision_code(raw),
            NormalizerKind::DrawingNumber => cleaners::clean_drawing_number(raw),
        }
    }

    /// Normalize a possibly-missing raw value.
    #[must_use = "returns the normalized value"]
    pub fn normalize_opt(&self, field: FieldName, raw: Option<&str>) -> String {
        match raw {
            Some(text) => self.normalize(field, text),
            None if field.normalizer() == NormalizerKind::RevisionCode => {
                cleaners::NO_REVISION_CODE.to_string()
            }
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_matches_field_catalog() {
        let engine = Normalizer::new();
        assert_eq!(engine.normalize(FieldName::Andr, "41"), "A.1");
        assert_eq!(engine.normalize(FieldName::Blad, "O12"), "012");
        assert_eq!(engine.normalize(FieldName::Format, "AI"), "A1");
        assert_eq!(engine.normalize(FieldName::Leverantor1, "tyrens"), "TYRÉNS");
        assert_eq!(engine.normalize(FieldName::Datum, " 2024-01-02 \n"), "2024-01-02");
    }

    #[test]
    fn test_missing_input() {
        let engine = Normalizer::new();
        assert_eq!(engine.normalize_opt(FieldName::Title, None), "");
        assert_eq!(engine.normalize_opt(FieldName::Andr, None), "_");
    }

    #[test]
    fn test_idempotence_over_canonical_values() {
        let engine = Normalizer::new();
        let canonical: [(FieldName, &str); 10] = [
            (FieldName::RitningsnummerProjekt, "X-12-034-0099-0_0-AB12"),
            (FieldName::Leverantor1, "TYRÉNS"),
            (FieldName::SkapadAv, "TYRÉNS / J.SMITH"),
            (FieldName::Title, "VÄSTLÄNKEN ETAPP 2"),
            (FieldName::Andr, "A.1"),
            (FieldName::KilometerMeter, "123+456"),
            (FieldName::Blad, "012"),
            (FieldName::Skala, "1:100 / 1:200"),
            (FieldName::Format, "A1"),
            (FieldName::GranskningsstatusSyfte, "GODKÄND"),
        ];
        for (field, value) in canonical {
            assert_eq!(
                engine.normalize(field, value),
                value,
                "normalizer for {field} is not idempotent"
            );
        }
    }

    #[test]
    fn test_alias_closure() {
        let engine = Normalizer::new();
        let pairs: Vec<(String, String)> = engine
            .aliases()
            .iter_pairs()
            .map(|(c, v)| (c.to_string(), v.to_string()))
            .collect();
        for (canon, variant) in pairs {
            assert_eq!(
                engine.normalize(FieldName::Leverantor2, &variant),
                canon,
                "alias {variant} did not close to {canon}"
            );
        }
    }
}
