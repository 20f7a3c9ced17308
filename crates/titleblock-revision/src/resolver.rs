//! Revision candidate arbitration.
//!
//! OCR on small printed revision letters is unreliable; this module
//! reconciles many weak signals — several extraction rules over several
//! preprocessing variants — under a structural sanity check (the table
//! gate) and a fixed selection order (labeled rows first, topmost row
//! wins).

use crate::preprocess::{safe_resize, PreprocessVariant};
use crate::types::{Candidate, OcrEngine, RegionSpec, ResolvedRevision, TextDetection};
use chrono::NaiveDate;
use image::GrayImage;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

static REV_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bREV[:\-\s]*([A-G])\b").expect("Invalid regex"));
static SHORT_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-G])(?:\.([1-9]))?$").expect("Invalid regex"));
static DOTTED_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-G])\.(\d)").expect("Invalid regex"));
static SPACED_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-G])\s+(\d)").expect("Invalid regex"));
static DOTTED_ONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-G])\.(I|L|\|)").expect("Invalid regex"));
static SPACED_ONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-G])\s+(I|L|\|)").expect("Invalid regex"));
static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4}[-/.]\d{2}[-/.]\d{2})\b|\b(\d{2}[-/.]\d{2}[-/.]\d{4})\b")
        .expect("Invalid regex")
});

/// Single-glyph confusions the recognizer makes on revision letters.
fn repair_glyph(token: &str) -> Option<&'static str> {
    match token {
        "(" => Some("C"),
        ")" => Some("D"),
        _ => None,
    }
}

/// Parse a date substring (`YYYY-MM-DD` or `DD-MM-YYYY`, separators
/// `-`, `/` or `.`) out of a detection's text.
#[must_use = "returns the parsed date, if any"]
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let m = DATE.find(text)?;
    let raw = m.as_str().replace(['.', '/'], "-");
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&raw, "%d-%m-%Y"))
        .ok()
}

/// Free-text extraction: `letter<sep>digit` with sep in `, / \ - :` or
/// whitespace, plus `I`/`L`/`|` read as the digit 1.
fn extract_from_free_text(raw: &str) -> Option<String> {
    let raw = raw.trim().to_uppercase();
    if raw.is_empty() {
        return None;
    }
    let dotted = raw.replace([',', '/', '\\', '-', ':'], ".");

    if let Some(caps) = DOTTED_DIGIT.captures(&dotted) {
        return Some(format!("{}.{}", &caps[1], &caps[2]));
    }
    if let Some(caps) = SPACED_DIGIT.captures(&raw) {
        return Some(format!("{}.{}", &caps[1], &caps[2]));
    }
    if let Some(caps) = DOTTED_ONE.captures(&dotted) {
        return Some(format!("{}.1", &caps[1]));
    }
    if let Some(caps) = SPACED_ONE.captures(&raw) {
        return Some(format!("{}.1", &caps[1]));
    }
    None
}

/// Tunables for revision arbitration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverConfig {
    /// Detections below this confidence are ignored.
    pub min_confidence: f32,
    /// Vertical tolerance when bucketing candidates into row groups.
    pub row_tolerance: f32,
    /// Maximum rendered width for the exact short-token rule.
    pub short_token_max_width: f32,
}

impl Default for ResolverConfig {
    #[inline]
    fn default() -> Self {
        Self {
            min_confidence: 0.30,
            row_tolerance: 18.0,
            short_token_max_width: 120.0,
        }
    }
}

/// Resolves a single authoritative revision code (and optional date) out of
/// noisy, possibly conflicting OCR detections.
#[derive(Debug, Clone, Default)]
pub struct RevisionResolver {
    config: ResolverConfig,
}

impl RevisionResolver {
    /// Create a resolver with the default tunables.
    #[inline]
    #[must_use = "creates a resolver instance"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with custom tunables.
    #[inline]
    #[must_use = "creates a resolver instance"]
    pub const fn with_config(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Build the candidate pool from raw detections. Each extraction rule
    /// appends independently, so one detection can contribute several
    /// candidates.
    #[must_use = "returns the candidate pool"]
    pub fn collect_candidates(&self, detections: &[TextDetection]) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for det in detections {
            if det.confidence < self.config.min_confidence {
                continue;
            }

            let clean = det.text.trim().to_uppercase();
            let date = parse_date(&clean);
            let y_center = det.y_center();
            let from_labeled_row = clean.contains("REV");

            let mut push = |value: String, date: Option<NaiveDate>| {
                candidates.push(Candidate {
                    confidence: det.confidence,
                    y_center,
                    value,
                    date,
                    from_labeled_row,
                });
            };

            // (i) explicit "REV: <letter>" phrase
            if let Some(caps) = REV_PHRASE.captures(&clean) {
                push(caps[1].to_string(), date);
            }

            // (ii) single-glyph confusion for the whole token
            if let Some(repaired) = repair_glyph(&clean) {
                push(repaired.to_string(), None);
            }

            // (iii) short token matching letter[.digit] exactly
            if det.bbox_width() <= self.config.short_token_max_width {
                let token = repair_glyph(&clean).unwrap_or(&clean);
                if let Some(caps) = SHORT_TOKEN.captures(token) {
                    let value = match caps.get(2) {
                        Some(digit) => format!("{}.{}", &caps[1], digit.as_str()),
                        None => caps[1].to_string(),
                    };
                    push(value, date);
                }
            }

            // (iv) longer free-text match
            if let Some(value) = extract_from_free_text(&det.text) {
                push(value, date);
            }
        }

        candidates
    }

    /// Table-structure gate: bucket candidate vertical positions into row
    /// groups; a region without at least one group of ≥2 members does not
    /// contain a genuine revision table.
    #[must_use = "returns whether the candidates form a table"]
    pub fn has_table_structure(&self, candidates: &[Candidate]) -> bool {
        if candidates.is_empty() {
            return false;
        }

        let mut ys: Vec<f32> = candidates.iter().map(|c| c.y_center).collect();
        ys.sort_by(f32::total_cmp);

        let mut largest = 1usize;
        let mut current = 1usize;
        for pair in ys.windows(2) {
            if (pair[1] - pair[0]).abs() <= self.config.row_tolerance {
                current += 1;
            } else {
                current = 1;
            }
            largest = largest.max(current);
        }

        largest >= 2
    }

    /// Arbitrate a pooled candidate set: labeled rows take priority, and
    /// within the chosen subset the topmost row wins.
    #[must_use = "returns the selected revision, if any"]
    pub fn select(&self, candidates: &[Candidate]) -> Option<ResolvedRevision> {
        if candidates.is_empty() {
            return None;
        }
        if !self.has_table_structure(candidates) {
            debug!("no table structure detected; suppressing {} candidates", candidates.len());
            return None;
        }

        let labeled: Vec<&Candidate> = candidates.iter().filter(|c| c.from_labeled_row).collect();
        let pool: Vec<&Candidate> = if labeled.is_empty() {
            candidates.iter().collect()
        } else {
            labeled
        };

        let best = pool
            .into_iter()
            .min_by(|a, b| a.y_center.total_cmp(&b.y_center))?;

        debug!(
            "selected revision {} (conf {:.3}, y {:.1})",
            best.value, best.confidence, best.y_center
        );
        Some(ResolvedRevision {
            code: best.value.clone(),
            date: best.date,
        })
    }

    /// Resolve directly from pre-pooled detections (the collaborator
    /// hand-off path used by the batch pipeline).
    #[must_use = "returns the resolved revision, if any"]
    pub fn resolve_detections(&self, detections: &[TextDetection]) -> Option<ResolvedRevision> {
        let candidates = self.collect_candidates(detections);
        self.select(&candidates)
    }

    /// Run the OCR collaborator over a region crop under every
    /// preprocessing variant and arbitrate the pooled detections.
    pub fn resolve_region<E: OcrEngine>(
        &self,
        engine: &E,
        region: &GrayImage,
    ) -> Option<ResolvedRevision> {
        let region = safe_resize(region);
        let mut detections = Vec::new();

        for variant in PreprocessVariant::ALL {
            let processed = variant.apply(&region);
            match engine.read_text(&processed) {
                Ok(mut found) => {
                    debug!("variant {}: {} detections", variant.tag(), found.len());
                    detections.append(&mut found);
                }
                Err(err) => {
                    warn!("OCR failed on variant {}: {err}", variant.tag());
                }
            }
        }

        self.resolve_detections(&detections)
    }

    /// Resolve a full page: primary region first, fallback region only when
    /// the primary yields nothing.
    pub fn resolve_page<E: OcrEngine>(
        &self,
        engine: &E,
        page: &GrayImage,
    ) -> Option<ResolvedRevision> {
        if let Some(region) = RegionSpec::PRIMARY.crop(page) {
            if let Some(resolved) = self.resolve_region(engine, &region) {
                return Some(resolved);
            }
        }
        if let Some(region) = RegionSpec::FALLBACK.crop(page) {
            if let Some(resolved) = self.resolve_region(engine, &region) {
                return Some(resolved);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(text: &str, confidence: f32, width: f32, y: f32) -> TextDetection {
        TextDetection {
            text: text.to_string(),
            confidence,
            bbox: [(0.0, y - 5.0), (width, y - 5.0), (width, y + 5.0), (0.0, y + 5.0)],
            label: None,
        }
    }

    fn candidate(value: &str, y: f32, labeled: bool) -> Candidate {
        Candidate {
            confidence: 0.9,
            y_center: y,
            value: value.to_string(),
            date: None,
            from_labeled_row: labeled,
        }
    }

    #[test]
    fn test_parse_date_both_orders() {
        assert_eq!(
            parse_date("REV A 2024-03-01"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(
            parse_date("01.03.2024"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(parse_date("no date here"), None);
    }

    #[test]
    fn test_labeled_rows_preferred() {
        let resolver = RevisionResolver::new();
        let candidates = vec![
            candidate("A", 10.0, false),
            candidate("B", 12.0, false),
            candidate("C", 50.0, true),
            candidate("D", 52.0, true),
        ];
        // The unlabeled candidates sit higher, but labeled rows win.
        let resolved = resolver.select(&candidates).unwrap();
        assert_eq!(resolved.code, "C");
    }

    #[test]
    fn test_ties_broken_by_lowest_vertical_position() {
        let resolver = RevisionResolver::new();
        let candidates = vec![
            candidate("B", 40.0, false),
            candidate("A", 10.0, false),
            candidate("C", 12.0, false),
        ];
        let resolved = resolver.select(&candidates).unwrap();
        assert_eq!(resolved.code, "A");
    }

    #[test]
    fn test_selection_is_deterministic() {
        let resolver = RevisionResolver::new();
        let candidates = vec![
            candidate("A", 10.0, false),
            candidate("B", 11.0, true),
            candidate("C", 12.0, true),
        ];
        for _ in 0..10 {
            assert_eq!(resolver.select(&candidates).unwrap().code, "B");
        }
    }

    #[test]
    fn test_table_gate_suppresses_scattered_marks() {
        let resolver = RevisionResolver::new();
        // All distinct, widely spaced rows: group size 1 everywhere.
        let candidates = vec![
            candidate("A", 0.0, false),
            candidate("B", 100.0, false),
            candidate("C", 200.0, false),
        ];
        assert!(!resolver.has_table_structure(&candidates));
        assert_eq!(resolver.select(&candidates), None);
    }

    #[test]
    fn test_table_gate_accepts_aligned_rows() {
        let resolver = RevisionResolver::new();
        let candidates = vec![candidate("A", 10.0, false), candidate("B", 20.0, false)];
        assert!(resolver.has_table_structure(&candidates));
    }

    #[test]
    fn test_collect_rev_phrase() {
        let resolver = RevisionResolver::new();
        let dets = vec![detection("REV: B 2024-01-15", 0.8, 300.0, 10.0)];
        let candidates = resolver.collect_candidates(&dets);
        assert!(candidates.iter().any(|c| c.value == "B" && c.from_labeled_row));
        assert!(candidates
            .iter()
            .any(|c| c.date == NaiveDate::from_ymd_opt(2024, 1, 15)));
    }

    #[test]
    fn test_collect_glyph_confusion() {
        let resolver = RevisionResolver::new();
        let dets = vec![detection("(", 0.9, 40.0, 10.0)];
        let candidates = resolver.collect_candidates(&dets);
        assert!(candidates.iter().any(|c| c.value == "C"));
    }

    #[test]
    fn test_collect_short_token_width_limit() {
        let resolver = RevisionResolver::new();
        // Same text, but rendered too wide for the exact-token rule.
        let narrow = resolver.collect_candidates(&[detection("A.1", 0.9, 100.0, 10.0)]);
        let wide = resolver.collect_candidates(&[detection("A.1", 0.9, 200.0, 10.0)]);
        // Narrow: exact-token rule plus free-text rule both fire.
        assert_eq!(narrow.len(), 2);
        // Wide: only the free-text rule fires.
        assert_eq!(wide.len(), 1);
    }

    #[test]
    fn test_collect_free_text_separators() {
        let resolver = RevisionResolver::new();
        for text in ["B/2", "B-2", "B:2", "B,2"] {
            let candidates = resolver.collect_candidates(&[detection(text, 0.9, 300.0, 10.0)]);
            assert!(
                candidates.iter().any(|c| c.value == "B.2"),
                "separator variant {text} did not extract"
            );
        }
        // I / L / | read as digit 1.
        let candidates = resolver.collect_candidates(&[detection("B.I", 0.9, 300.0, 10.0)]);
        assert!(candidates.iter().any(|c| c.value == "B.1"));
    }

    #[test]
    fn test_low_confidence_detections_ignored() {
        let resolver = RevisionResolver::new();
        let candidates = resolver.collect_candidates(&[detection("A", 0.1, 40.0, 10.0)]);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_resolve_detections_end_to_end() {
        let resolver = RevisionResolver::new();
        let dets = vec![
            detection("REV: A", 0.8, 300.0, 12.0),
            detection("B", 0.9, 40.0, 14.0),
            detection("2023-11-05", 0.9, 200.0, 13.0),
        ];
        let resolved = resolver.resolve_detections(&dets).unwrap();
        assert_eq!(resolved.code, "A");
    }

    struct FakeEngine;

    impl OcrEngine for FakeEngine {
        fn read_text(&self, image: &GrayImage) -> anyhow::Result<Vec<TextDetection>> {
            // The primary crop of a 1000px page is 90px tall; the fallback
            // crop is 60px. Only the fallback "contains" a revision table.
            if image.height() == 60 {
                Ok(vec![
                    detection("REV: C", 0.9, 300.0, 10.0),
                    detection("C", 0.9, 40.0, 12.0),
                ])
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[test]
    fn test_resolve_page_falls_back() {
        let resolver = RevisionResolver::new();
        let page = GrayImage::from_pixel(1000, 1000, image::Luma([255]));
        let resolved = resolver.resolve_page(&FakeEngine, &page).unwrap();
        assert_eq!(resolved.code, "C");
    }
}
