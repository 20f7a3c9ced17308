//! Static field catalog for the title-block record schema.
//!
//! The field set is fixed: the labels the detection model was trained on,
//! in the original Swedish title-block vocabulary. Records are validated
//! against this catalog at construction time so an unknown column is
//! rejected early instead of being carried silently through the pipeline.

use crate::error::TitleblockError;
use serde::{Deserialize, Serialize};

/// A title-block field, identified by its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum FieldName {
    /// Project-level drawing number, the multi-part structured code.
    RitningsnummerProjekt,
    /// First supplier / organization slot.
    Leverantor1,
    /// Second supplier / organization slot.
    Leverantor2,
    /// Created-by signature (person or person/organization compound).
    SkapadAv,
    /// Reviewed-by signature.
    GranskadAv,
    /// Approved-by signature.
    GodkandAv,
    /// Drawing title.
    Title,
    /// Drawing date.
    Datum,
    /// Recorded revision-change code.
    Andr,
    /// Technical area code.
    Teknikomrade,
    /// Review status / purpose.
    GranskningsstatusSyfte,
    /// Document type.
    Handlingstyp,
    /// Construction type.
    Anlaggningstyp,
    /// Delivery / change-memo note.
    LeveransAndringsPm,
    /// Distance marker (kilometer+meter chainage).
    KilometerMeter,
    /// Line section.
    Bandel,
    /// Sheet number.
    Blad,
    /// Next sheet number.
    NastaBlad,
    /// Drawing scale, possibly several ratios.
    Skala,
    /// Paper format.
    Format,
    /// Descriptive row 1.
    BeskrivningRow1,
    /// Descriptive row 2.
    BeskrivningRow2,
    /// Descriptive row 3.
    BeskrivningRow3,
    /// Descriptive row 4.
    BeskrivningRow4,
}

impl FieldName {
    /// All fields, in canonical column order.
    pub const ALL: [Self; 24] = [
        Self::RitningsnummerProjekt,
        Self::Leverantor1,
        Self::Leverantor2,
        Self::SkapadAv,
        Self::GranskadAv,
        Self::GodkandAv,
        Self::Title,
        Self::Datum,
        Self::Andr,
        Self::Teknikomrade,
        Self::GranskningsstatusSyfte,
        Self::Handlingstyp,
        Self::Anlaggningstyp,
        Self::LeveransAndringsPm,
        Self::KilometerMeter,
        Self::Bandel,
        Self::Blad,
        Self::NastaBlad,
        Self::Skala,
        Self::Format,
        Self::BeskrivningRow1,
        Self::BeskrivningRow2,
        Self::BeskrivningRow3,
        Self::BeskrivningRow4,
    ];

    /// The column label as it appears in stage artifacts and the rule
    /// workbook.
    #[inline]
    #[must_use = "returns the column label for this field"]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RitningsnummerProjekt => "RITNINGSNUMMER_PROJEKT",
            Self::Leverantor1 => "LEVERANTOR_1",
            Self::Leverantor2 => "LEVERANTOR_2",
            Self::SkapadAv => "SKAPAD_AV",
            Self::GranskadAv => "GRANSKAD_AV",
            Self::GodkandAv => "GODKAND_AV",
            Self::Title => "TITLE",
            Self::Datum => "DATUM",
            Self::Andr => "ANDR",
            Self::Teknikomrade => "TEKNIKOMRADE",
            Self::GranskningsstatusSyfte => "GRANSKNINGSSTATUS_SYFTE",
            Self::Handlingstyp => "HANDLINGSTYP",
            Self::Anlaggningstyp => "ANLAGGNINGSTYP",
            Self::LeveransAndringsPm => "LEVERANS_ANDRINGS_PM",
            Self::KilometerMeter => "KILOMETER_METER",
            Self::Bandel => "BANDEL",
            Self::Blad => "BLAD",
            Self::NastaBlad => "NASTA_BLAD",
            Self::Skala => "SKALA",
            Self::Format => "FORMAT",
            Self::BeskrivningRow1 => "BESKRIVNING_ROW_1",
            Self::BeskrivningRow2 => "BESKRIVNING_ROW_2",
            Self::BeskrivningRow3 => "BESKRIVNING_ROW_3",
            Self::BeskrivningRow4 => "BESKRIVNING_ROW_4",
        }
    }

    /// Whether an empty normalized value is acceptable for this field.
    ///
    /// Fields outside this set with an empty value violate their Value or
    /// Pattern rule during master validation.
    #[inline]
    #[must_use = "returns the empty-value policy for this field"]
    pub const fn empty_allowed(self) -> bool {
        matches!(
            self,
            Self::Bandel
                | Self::Blad
                | Self::NastaBlad
                | Self::KilometerMeter
                | Self::Andr
                | Self::Anlaggningstyp
                | Self::GranskningsstatusSyfte
                | Self::Handlingstyp
                | Self::Skala
                | Self::Format
                | Self::Datum
                | Self::Teknikomrade
        )
    }

    /// The normalizer applied to this field during the cleaning stage.
    #[must_use = "returns the normalizer kind for this field"]
    pub const fn normalizer(self) -> NormalizerKind {
        match self {
            Self::RitningsnummerProjekt => NormalizerKind::DrawingNumber,
            Self::Leverantor1 => NormalizerKind::SupplierPrimary,
            Self::Leverantor2 => NormalizerKind::SupplierSecondary,
            Self::SkapadAv | Self::GranskadAv | Self::GodkandAv => NormalizerKind::Person,
            Self::Title => NormalizerKind::Title,
            Self::Andr => NormalizerKind::RevisionCode,
            Self::Teknikomrade => NormalizerKind::TechnicalArea,
            Self::GranskningsstatusSyfte => NormalizerKind::ReviewStatus,
            Self::Handlingstyp | Self::Anlaggningstyp => NormalizerKind::UpperCase,
            Self::LeveransAndringsPm => NormalizerKind::DeliveryNote,
            Self::KilometerMeter => NormalizerKind::DistanceMarker,
            Self::Blad => NormalizerKind::SheetNumber,
            Self::Skala => NormalizerKind::Scale,
            Self::Format => NormalizerKind::PaperFormat,
            Self::BeskrivningRow1 | Self::BeskrivningRow2 | Self::BeskrivningRow3 => {
                NormalizerKind::Description { keep_slash: false }
            }
            Self::BeskrivningRow4 => NormalizerKind::Description { keep_slash: true },
            Self::Datum | Self::Bandel | Self::NastaBlad => NormalizerKind::Default,
        }
    }
}

impl std::fmt::Display for FieldName {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for FieldName {
    type Err = TitleblockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.label() == s)
            .ok_or_else(|| TitleblockError::UnknownField(s.to_string()))
    }
}

/// Which cleaning routine applies to a field.
///
/// The cleaning stage dispatches on this; the catalog here stays a pure
/// declaration so the rule set is visible in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalizerKind {
    /// Whitespace/newline collapse and trim only.
    Default,
    /// Uppercase + whitespace collapse.
    UpperCase,
    /// Supplier slot 1: section-label prefix repair, then alias match.
    SupplierPrimary,
    /// Supplier slot 2: leading-artifact strip, then alias match.
    SupplierSecondary,
    /// Person/organization compound signatures.
    Person,
    /// Drawing title with known OCR repairs.
    Title,
    /// Letters-only technical area code.
    TechnicalArea,
    /// Review status canonicalization.
    ReviewStatus,
    /// Delivery note: discard short or digit-free values.
    DeliveryNote,
    /// Kilometer+meter chainage repair.
    DistanceMarker,
    /// Digits-only sheet number repair.
    SheetNumber,
    /// Scale ratio splitting and fusion repair.
    Scale,
    /// Paper format (A1, A3, ...) repair.
    PaperFormat,
    /// Symbol removal for descriptive rows.
    Description {
        /// Row 4 carries `/`-separated codes and keeps the slash.
        keep_slash: bool,
    },
    /// Revision-change code canonicalization (sentinel `"_"` when absent).
    RevisionCode,
    /// Structured multi-part drawing number grammar.
    DrawingNumber,
}
