//! Field cleaning routines.
//!
//! Every cleaner is a total function from ragged OCR text to a best-effort
//! canonical string. Cleaners never fail: an irrecoverable value is passed
//! through (or reduced to a sentinel) and judged later by the validator.

use crate::aliases::OrgAliasTable;
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex"));
static LEADING_NON_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^A-ZÅÄÖ]+").expect("Invalid regex"));

/// Collapse newlines and runs of whitespace to single spaces and trim.
#[must_use = "returns the collapsed text"]
pub fn collapse_whitespace(text: &str) -> String {
    let replaced = text.replace('\n', " ");
    WHITESPACE.replace_all(&replaced, " ").trim().to_string()
}

/// Fallback cleaner for fields without a dedicated routine.
#[must_use = "returns the cleaned text"]
pub fn clean_default(text: &str) -> String {
    collapse_whitespace(text)
}

/// Uppercase + whitespace collapse (document and construction types).
#[must_use = "returns the cleaned text"]
pub fn clean_upper(text: &str) -> String {
    collapse_whitespace(text).to_uppercase()
}

/// Organization name: uppercase, then alias-table match. Unmatched text is
/// returned upper-cased, unchanged.
#[must_use = "returns the canonical organization name"]
pub fn normalize_company(text: &str, aliases: &OrgAliasTable) -> String {
    let upper = collapse_whitespace(text).to_uppercase();
    match aliases.resolve(&upper) {
        Some(canon) => canon.to_string(),
        None => upper,
    }
}

static SUPPLIER_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(LEVERANTÖR|LEVERANTOR|VERANTOR|EVERANTOR)\s*").expect("Invalid regex")
});

/// Supplier slot 1: the OCR often swallows part of the printed
/// "LEVERANTÖR" section label into the value.
#[must_use = "returns the cleaned supplier name"]
pub fn clean_supplier_primary(text: &str, aliases: &OrgAliasTable) -> String {
    let upper = collapse_whitespace(text).to_uppercase();
    let stripped = SUPPLIER_PREFIX.replace(&upper, "");
    normalize_company(&stripped, aliases)
}

/// Supplier slot 2: strip leading OCR artifacts, then alias match.
#[must_use = "returns the cleaned supplier name"]
pub fn clean_supplier_secondary(text: &str, aliases: &OrgAliasTable) -> String {
    let upper = collapse_whitespace(text).to_uppercase();
    let stripped = LEADING_NON_LETTER.replace(&upper, "");
    normalize_company(&stripped, aliases)
}

static PERSON_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-ZÅÄÖ]{4,}$").expect("Invalid regex"));
static PERSON_INITIAL_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-ZÅÄÖ])\s+([A-ZÅÄÖ]{3,})$").expect("Invalid regex"));

/// Insert the separator the recognizer lost in "J.SMITH"-style signatures.
///
/// A bare run of ≥4 letters becomes `X.EST`; an initial followed by a
/// ≥3-letter word becomes `X.WORD`. Short tokens and tokens that already
/// carry a period are left alone.
#[must_use = "returns the dotted signature"]
pub fn dot_person(name: &str) -> String {
    let name = name.trim();
    if name.contains('.') {
        return name.to_string();
    }
    let letter_count = name.chars().filter(|c| is_swedish_letter(*c)).count();
    if letter_count <= 3 {
        return name.to_string();
    }
    if PERSON_RUN.is_match(name) {
        let mut chars = name.chars();
        let first = chars.next().expect("non-empty run");
        return format!("{first}.{}", chars.as_str());
    }
    if let Some(caps) = PERSON_INITIAL_WORD.captures(name) {
        return format!("{}.{}", &caps[1], &caps[2]);
    }
    name.to_string()
}

fn is_swedish_letter(c: char) -> bool {
    c.is_ascii_uppercase() || matches!(c, 'Å' | 'Ä' | 'Ö')
}

static GLUED_I: Lazy<Regex> = Lazy::new(|| Regex::new(r"^I([A-ZÅÄÖ])").expect("Invalid regex"));
static INITIAL_SURNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z])\s+([A-ZÅÄÖ]{3,})").expect("Invalid regex"));
static COMPONENT_SEP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-ZÅÄÖ])\s*[/|]\s*([A-ZÅÄÖ])").expect("Invalid regex"));
static TYRENS_TRIGRAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(TYRÉNS)\s+(JEB|JEK|FBE|PHN|MBM|THO)").expect("Invalid regex"));
static TYRENS_GLUED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(TYRÉNS)I").expect("Invalid regex"));

/// Person/organization compound signature (`SKAPAD_AV` and friends).
#[must_use = "returns the cleaned signature"]
pub fn clean_person(text: &str, aliases: &OrgAliasTable) -> String {
    let upper = collapse_whitespace(text).to_uppercase();

    let t = GLUED_I.replace(&upper, "$1");
    let t = LEADING_NON_LETTER.replace(&t, "");
    let t = INITIAL_SURNAME.replace_all(&t, "$1.$2");

    let t = t.replace(',', " / ");

    let t = COMPONENT_SEP.replace_all(&t, "$1 / $2");
    let t = TYRENS_TRIGRAM.replace_all(&t, "$1 / $2");
    let t = TYRENS_GLUED.replace_all(&t, "$1 / ");

    let cleaned: Vec<String> = t
        .split('/')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|part| {
            let company = normalize_company(part, aliases);
            if aliases.is_canonical(&company) {
                company
            } else {
                dot_person(part)
            }
        })
        .collect();

    cleaned.join(" / ")
}

static TITLE_DAMAGE_A: Lazy<Regex> = Lazy::new(|| Regex::new("VASTLANKEN").expect("Invalid regex"));
static TITLE_DAMAGE_B: Lazy<Regex> = Lazy::new(|| Regex::new("VÄSTLANKEN").expect("Invalid regex"));

/// Drawing title.
#[must_use = "returns the cleaned title"]
pub fn clean_title(text: &str) -> String {
    let upper = collapse_whitespace(text).to_uppercase();
    let t = TITLE_DAMAGE_A.replace_all(&upper, "VÄSTLÄNKEN");
    let t = TITLE_DAMAGE_B.replace_all(&t, "VÄSTLÄNKEN");
    LEADING_NON_LETTER.replace(&t, "").to_string()
}

/// Technical area: letters only.
#[must_use = "returns the cleaned technical-area code"]
pub fn clean_technical_area(text: &str) -> String {
    collapse_whitespace(text)
        .to_uppercase()
        .chars()
        .filter(|c| is_swedish_letter(*c))
        .collect()
}

/// Review status: canonicalize the handful of known stamp phrases; other
/// text passes through.
#[must_use = "returns the canonical review status"]
pub fn clean_review_status(text: &str) -> String {
    let upper = collapse_whitespace(text).to_uppercase();
    let folded: String = upper
        .chars()
        .map(|c| match c {
            'Ä' | 'Å' => 'A',
            'Ö' => 'O',
            other => other,
        })
        .collect();
    let compact: String = folded.chars().filter(|c| !c.is_whitespace()).collect();

    if compact.contains("GODKAND") {
        return "GODKÄND".to_string();
    }
    if compact.contains("FORGRANSKNING") {
        return "FÖR GRANSKNING".to_string();
    }
    if compact.contains("FORFRAGNING") {
        return "FÖRFRÅGNINGSUNDERLAG".to_string();
    }
    upper
}

/// Delivery note: short or digit-free values are OCR noise, not a note.
#[must_use = "returns the cleaned delivery note"]
pub fn clean_delivery_note(text: &str) -> String {
    let upper = collapse_whitespace(text).to_uppercase();
    if upper.chars().count() <= 4 || !upper.chars().any(|c| c.is_ascii_digit()) {
        return String::new();
    }
    upper
}

/// Descriptive rows: keep letters, digits and spaces (row 4 also keeps the
/// `/` separating its codes).
#[must_use = "returns the cleaned description"]
pub fn clean_description(text: &str, keep_slash: bool) -> String {
    let upper = collapse_whitespace(text).to_uppercase();
    let replaced: String = upper
        .chars()
        .map(|c| {
            let keep = is_swedish_letter(c)
                || c.is_ascii_digit()
                || c.is_whitespace()
                || (keep_slash && c == '/');
            if keep {
                c
            } else {
                ' '
            }
        })
        .collect();
    collapse_whitespace(&replaced)
}

// ============================================================
// SKALA
// ============================================================

static SCALE_FUSED_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^1:(\d{2,4})(\d{2,4})$").expect("Invalid regex"));
static SCALE_FUSED_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^1:?(\d{5,8})$").expect("Invalid regex"));
static SCALE_RATIO: Lazy<Regex> = Lazy::new(|| Regex::new(r"^1:\d+$").expect("Invalid regex"));
static SCALE_BARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2,5}$").expect("Invalid regex"));
static TRAILING_COLONS: Lazy<Regex> = Lazy::new(|| Regex::new(r":+$").expect("Invalid regex"));

fn normalize_single_scale(token: &str) -> String {
    let val = token.trim().replace('-', ":").replace('.', ":");
    let val = TRAILING_COLONS.replace(&val, "").to_string();

    // Two ratios fused into one token, e.g. "1:1001500".
    if let Some(caps) = SCALE_FUSED_PAIR.captures(&val) {
        return format!("1:{} / 1:{}", &caps[1], &caps[2]);
    }
    if let Some(caps) = SCALE_FUSED_RUN.captures(&val) {
        let digits = &caps[1];
        if digits.len() >= 6 {
            let mid = digits.len() / 2;
            return format!("1:{} / 1:{}", &digits[..mid], &digits[mid..]);
        }
    }

    if SCALE_RATIO.is_match(&val) {
        return val;
    }

    if SCALE_BARE.is_match(&val) {
        let mut digits = val;
        if digits.len() == 4 && digits.starts_with('1') {
            digits = digits[1..].to_string();
        }
        if digits.len() == 5 {
            digits.truncate(4);
        }
        return format!("1:{digits}");
    }

    val
}

static SLASH_SPACING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*/\s*").expect("Invalid regex"));
static SCALE_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+|/").expect("Invalid regex"));

/// Scale field: split on separators, repair each ratio, de-duplicate
/// preserving first-seen order.
#[must_use = "returns the cleaned scale"]
pub fn clean_scale(text: &str) -> String {
    let t = collapse_whitespace(text)
        .replace(',', " / ")
        .replace(';', " / ")
        .replace('\\', " / ");
    let t = SLASH_SPACING.replace_all(&t, " / ");

    let mut seen: Vec<String> = Vec::new();
    for part in SCALE_SPLIT.split(&t) {
        if part.trim().is_empty() {
            continue;
        }
        let ratio = normalize_single_scale(part);
        if !seen.contains(&ratio) {
            seen.push(ratio);
        }
    }

    seen.join(" / ")
}

// ============================================================
// KILOMETER_METER
// ============================================================

static KM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,4})\s*([+/])?\s*(\d{1,3}(?:[.,]\d+)?)").expect("Invalid regex"));
static KM_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([~≈])\s*").expect("Invalid regex"));
static BROKEN_PLUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{3})\s+4\s+(\d{3})").expect("Invalid regex"));

fn trim_km(km: &str) -> String {
    let tail = if km.len() > 3 { &km[km.len() - 3..] } else { km };
    let stripped = tail.trim_start_matches('0');
    if stripped.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

/// Distance marker: extract one or two kilometer+meter chainages.
///
/// The recognizer reads the printed `+` as a `4`, so `123 4 456` is
/// repaired to `123+456` before matching. Two chainages join with ` - `.
#[must_use = "returns the cleaned distance marker"]
pub fn clean_distance_marker(text: &str) -> String {
    let prefix = KM_PREFIX
        .captures(text)
        .map(|c| c[1].to_string())
        .unwrap_or_default();

    let original = collapse_whitespace(text);
    let t = BROKEN_PLUS.replace_all(&original, "$1+$2");

    let sep_style = if t.contains('/') { "/" } else { "+" };

    let values: Vec<String> = KM_PATTERN
        .captures_iter(&t)
        .map(|caps| {
            let meter = caps[3].replace(',', ".");
            format!("{}{sep_style}{meter}", trim_km(&caps[1]))
        })
        .collect();

    match values.len() {
        0 => original.to_uppercase(),
        1 => format!("{prefix}{}", values[0]),
        _ => format!("{prefix}{} - {}", values[0], values[1]),
    }
}

// ============================================================
// FORMAT
// ============================================================

static FORMAT_AI: Lazy<Regex> = Lazy::new(|| Regex::new(r"^A[IL|]$").expect("Invalid regex"));
static FORMAT_FOUR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^4(\d)").expect("Invalid regex"));

/// Paper format: repair `AI`/`AL` → `A1` and a leading `4` → `A`.
#[must_use = "returns the cleaned paper format"]
pub fn clean_paper_format(text: &str) -> String {
    let upper = collapse_whitespace(text).to_uppercase();
    if upper == "AI" {
        return "A1".to_string();
    }
    let t = FORMAT_AI.replace(&upper, "A1");
    let t = FORMAT_FOUR.replace(&t, "A$1");
    t.chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}

/// Sheet number: digits only, after the usual glyph confusions.
///
/// Length is not enforced here; out-of-range values are returned as-is for
/// the validator to judge.
#[must_use = "returns the digits of the sheet number"]
pub fn clean_sheet_number(text: &str) -> String {
    text.trim()
        .replace('O', "0")
        .replace(['I', 'l'], "1")
        .chars()
        .filter(char::is_ascii_digit)
        .collect()
}

// ============================================================
// ANDR
// ============================================================

static ANDR_CANONICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]\.\d+$").expect("Invalid regex"));
static ANDR_FUSED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^4(\d)$").expect("Invalid regex"));
static ANDR_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]$").expect("Invalid regex"));

/// Sentinel for "no revision-change code".
pub const NO_REVISION_CODE: &str = "_";

/// Revision-change code: canonicalize to `letter[.digit]` or the `"_"`
/// sentinel.
///
/// The recognizer renders the stamped `A` as a `4` often enough that a
/// stray `4` is read as `A`, and `4<digit>` as `A.<digit>`.
#[must_use = "returns the canonical revision-change code"]
pub fn clean_revision_code(text: &str) -> String {
    let upper = collapse_whitespace(text).to_uppercase();
    if upper.is_empty() {
        return NO_REVISION_CODE.to_string();
    }
    if ANDR_CANONICAL.is_match(&upper) {
        return upper;
    }

    let compact: String = upper
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect();

    if let Some(caps) = ANDR_FUSED.captures(&compact) {
        return format!("A.{}", &caps[1]);
    }
    if compact.contains('4') {
        return "A".to_string();
    }

    let starts_with_letter = compact.chars().next().is_some_and(|c| c.is_ascii_uppercase());
    if compact.contains('1') && !starts_with_letter {
        return "_.1".to_string();
    }
    if compact.contains('2') && !starts_with_letter {
        return "_.2".to_string();
    }
    if ANDR_LETTER.is_match(&compact) {
        return compact;
    }

    NO_REVISION_CODE.to_string()
}

// ============================================================
// RITNINGSNUMMER_PROJEKT
// ============================================================

static SECTION_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"BBP[0OQ]S").expect("Invalid regex"));
static S_BETWEEN_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d)S(\d)").expect("Invalid regex"));
static LEADING_ARTIFACTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[IJ1|/\\`']+").expect("Invalid regex"));
static SECTION_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"RITNINGSNUMMER[_\s-]*PROJEKT").expect("Invalid regex"));
static LEADING_NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^A-Z0-9]+").expect("Invalid regex"));
static ZERO_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"0\s+0").expect("Invalid regex"));
static TRAILING_JUNK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[/'`]+$").expect("Invalid regex"));
static DASH_SPACING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*-\s*").expect("Invalid regex"));
static DRAWING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Z0-9]+-\d{2}-\d{3}-\d{4}-0_0-[A-Z0-9]+)\b").expect("Invalid regex")
});

/// Project drawing number: digit/letter confusion fixes, section-label
/// strip, then the structured multi-part layout
/// `SEGMENT-NN-NNN-NNNN-0_0-TAIL` with the tail capped at 4 characters.
///
/// When the structured pattern is absent the cleaned string is returned
/// unmodified; the filename-evidence repair runs afterwards.
#[must_use = "returns the cleaned drawing number"]
pub fn clean_drawing_number(text: &str) -> String {
    let mut t: String = text
        .trim()
        .to_uppercase()
        .chars()
        .map(|c| match c {
            'O' | 'Q' => '0',
            other => other,
        })
        .collect();

    t = SECTION_CODE.replace_all(&t, "BBP05").to_string();

    // "S" read for "5" between digits; repeat because matches may overlap.
    loop {
        let replaced = S_BETWEEN_DIGITS.replace_all(&t, "${1}5${2}").to_string();
        if replaced == t {
            break;
        }
        t = replaced;
    }

    // Leading pen strokes and frame lines, but only when glued to content.
    if let Some(m) = LEADING_ARTIFACTS.find(&t) {
        if t[m.end()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        {
            t = t[m.end()..].to_string();
        }
    }

    t = SECTION_LABEL.replace_all(&t, " ").to_string();
    t = LEADING_NON_ALNUM.replace(&t, "").to_string();

    t = t.replace("BBPO5", "BBP05").replace("BBPOS", "BBP05");
    t = t.replace("IBBPO5", "BBP05");

    t = ZERO_GAP.replace_all(&t, "0_0").to_string();
    t = t.replace("-00-", "-0_0-");

    t = TRAILING_JUNK.replace(&t, "").to_string();
    t = DASH_SPACING.replace_all(&t, "-").to_string();
    t = WHITESPACE.replace_all(&t, "").to_string();

    let Some(caps) = DRAWING_NUMBER.captures(&t) else {
        return t;
    };
    let full = caps[1].to_string();

    let Some((base, tail)) = full.rsplit_once("-0_0-") else {
        return t;
    };

    let mut tail = tail.replace('M', "1");
    if tail.len() > 4 {
        tail.truncate(4);
    }
    if tail.len() < 3 {
        return base.to_string();
    }

    format!("{base}-0_0-{tail}")
}

/// Levenshtein distance over characters.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.iter().enumerate() {
        let mut current = Vec::with_capacity(b.len() + 1);
        current.push(i + 1);
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            let deletion = prev[j + 1] + 1;
            let insertion = current[j] + 1;
            current.push(substitution.min(deletion).min(insertion));
        }
        prev = current;
    }

    prev[b.len()]
}

/// Accept filename evidence over the OCR value when they are within
/// `edit_budget` edits of each other (and not already identical).
///
/// The budget defaults to 1 in the pipeline configuration, covering the
/// common cases of one misread or one lost character.
#[must_use = "returns the repaired drawing number"]
pub fn repair_with_expected(ocr_value: &str, expected: &str, edit_budget: usize) -> String {
    let ocr_value = ocr_value.trim().to_uppercase();
    let expected = expected.trim().to_uppercase();
    if ocr_value.is_empty() || expected.is_empty() {
        return ocr_value;
    }

    let distance = edit_distance(&ocr_value, &expected);
    if distance >= 1 && distance <= edit_budget {
        expected
    } else {
        ocr_value
    }
}
