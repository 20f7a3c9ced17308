//! Organization alias table.
//!
//! Maps a canonical organization name to the OCR-garbled variants seen in
//! production scans. Matching is substring-based after whitespace removal,
//! so "T.YRÉNS AB" and "TYRENS" both resolve to the same canonical
//! spelling. Loaded once at process start and passed by reference.

/// Immutable canonical-name → garbled-variants table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgAliasTable {
    entries: Vec<(String, Vec<String>)>,
}

impl OrgAliasTable {
    /// Build a table from `(canonical, variants)` pairs.
    #[must_use = "creates an alias table"]
    pub fn new(entries: Vec<(String, Vec<String>)>) -> Self {
        Self { entries }
    }

    /// The organizations observed on this drawing corpus.
    #[must_use = "creates the built-in alias table"]
    pub fn builtin() -> Self {
        let entries = [
            (
                "TYRÉNS",
                vec!["TYRÉNS", "TYRENS", "YRENS", "T.YRÉNS", "T YRÉNS"],
            ),
            (
                "ÅF INFRASTRUCTURE AB",
                vec![
                    "ÅF INFRASTRUCTURE AB",
                    "AF INFRASTRUCTURE AB",
                    "ÄF INFRASTRUCTURE AB",
                ],
            ),
            ("SWECO", vec!["SWECO", "SWECO CIVIL AB"]),
            ("NCC", vec!["NCC", "NCO"]),
            ("BERGAB", vec!["BERGAB"]),
            ("NORCONSULT", vec!["NORCONSULT"]),
            ("TRAFIKVERKET", vec!["TRAFIKVERKET"]),
            ("AMBERG", vec!["AMBERG"]),
        ];
        Self::new(
            entries
                .into_iter()
                .map(|(canon, variants)| {
                    (
                        canon.to_string(),
                        variants.into_iter().map(ToString::to_string).collect(),
                    )
                })
                .collect(),
        )
    }

    /// Resolve uppercased text to a canonical name, if any variant occurs
    /// in it as a whitespace-compacted substring.
    #[must_use = "returns the canonical name when a variant matches"]
    pub fn resolve(&self, upper_text: &str) -> Option<&str> {
        let compact: String = upper_text.chars().filter(|c| !c.is_whitespace()).collect();
        for (canon, variants) in &self.entries {
            for variant in variants {
                let variant_compact: String =
                    variant.chars().filter(|c| !c.is_whitespace()).collect();
                if compact.contains(&variant_compact) {
                    return Some(canon);
                }
            }
        }
        None
    }

    /// Whether `name` is one of the canonical names.
    #[must_use = "returns whether the name is canonical"]
    pub fn is_canonical(&self, name: &str) -> bool {
        self.entries.iter().any(|(canon, _)| canon == name)
    }

    /// Iterate `(canonical, variant)` pairs, for the alias-closure tests.
    pub fn iter_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(canon, variants)| {
            variants
                .iter()
                .map(move |v| (canon.as_str(), v.as_str()))
        })
    }
}

impl Default for OrgAliasTable {
    #[inline]
    fn default() -> Self {
        Self::builtin()
    }
}
