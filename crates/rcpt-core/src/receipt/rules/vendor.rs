//! Vendor name heuristics.
//!
//! Every line is scored independently by [`score_line`]; the best positive
//! candidate wins. The weights are empirical and meant to be tuned, not
//! relied upon as invariants.

use super::normalize_lines;
use super::patterns::{is_address_line, is_boilerplate, LABEL_PREFIX, LEGAL_SUFFIX, STREET_TAIL};

/// Maximum length of a suggested vendor name, in characters.
pub const MAX_VENDOR_LEN: usize = 40;

const ADDRESS_PENALTY: i32 = -4;
const BOILERPLATE_PENALTY: i32 = -3;
const DIGIT_HEAVY_PENALTY: i32 = -2;
const LEGAL_SUFFIX_BONUS: i32 = 4;
const CASING_BONUS: i32 = 2;
const PRECEDES_ADDRESS_BONUS: i32 = 2;
const LABEL_STRIPPED_BONUS: i32 = 2;
/// Bonus for the first line; each following line gets one less, down to 0.
const TOP_OF_DOCUMENT_BONUS: i32 = 3;

/// A scored vendor candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorCandidate {
    /// Index into the normalized lines.
    pub line_index: usize,
    /// Cleaned candidate value.
    pub value: String,
    /// Additive score; only positive scores are eligible.
    pub score: i32,
}

/// Strip field labels ("Sold By:", "Invoice from") and any trailing street
/// address from a line.
pub fn clean_candidate(line: &str) -> String {
    let stripped = LABEL_PREFIX.replace(line, "");
    let without_address = STREET_TAIL.replace(&stripped, "");
    without_address
        .trim()
        .trim_end_matches([',', '-', ':', '|'])
        .trim()
        .to_string()
}

fn has_letters(s: &str) -> bool {
    s.chars().any(|c| c.is_alphabetic())
}

fn is_title_case(s: &str) -> bool {
    let words: Vec<&str> = s
        .split_whitespace()
        .filter(|w| w.chars().next().is_some_and(|c| c.is_alphabetic()))
        .collect();

    !words.is_empty()
        && words
            .iter()
            .all(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
        && s.chars().any(|c| c.is_lowercase())
}

fn is_short_all_caps(s: &str) -> bool {
    let letters = s.chars().filter(|c| c.is_alphabetic()).count();
    letters >= 2
        && !s.chars().any(|c| c.is_lowercase())
        && s.split_whitespace().count() <= 4
        && s.chars().count() <= 32
}

fn is_digit_heavy(s: &str) -> bool {
    let total = s.chars().filter(|c| !c.is_whitespace()).count();
    let digits = s.chars().filter(|c| c.is_ascii_digit()).count();
    total > 0 && digits * 10 > total * 3
}

fn truncate(s: &str) -> String {
    s.chars().take(MAX_VENDOR_LEN).collect::<String>().trim_end().to_string()
}

/// Score one line as a vendor candidate. Returns `None` when the cleaned
/// line has no letters.
pub fn score_line(lines: &[String], index: usize) -> Option<VendorCandidate> {
    let raw = lines.get(index)?;
    let value = clean_candidate(raw);
    if !has_letters(&value) {
        return None;
    }

    let mut score = 0;

    if is_address_line(raw) {
        score += ADDRESS_PENALTY;
    }
    if is_boilerplate(&value) {
        score += BOILERPLATE_PENALTY;
    }
    if is_digit_heavy(&value) {
        score += DIGIT_HEAVY_PENALTY;
    }
    if LEGAL_SUFFIX.is_match(&value) {
        score += LEGAL_SUFFIX_BONUS;
    }
    if is_title_case(&value) || is_short_all_caps(&value) {
        score += CASING_BONUS;
    }
    score += (TOP_OF_DOCUMENT_BONUS - index as i32).max(0);

    // A vendor usually sits directly above its own address
    if lines.get(index + 1).is_some_and(|next| is_address_line(next)) && !is_address_line(raw) {
        score += PRECEDES_ADDRESS_BONUS;
    }
    if value != raw.trim() {
        score += LABEL_STRIPPED_BONUS;
    }

    Some(VendorCandidate {
        line_index: index,
        value: truncate(&value),
        score,
    })
}

/// Score every line of the text.
pub fn score_candidates(text: &str) -> Vec<VendorCandidate> {
    let lines = normalize_lines(text);
    (0..lines.len())
        .filter_map(|i| score_line(&lines, i))
        .collect()
}

/// Extract the vendor name.
pub fn extract_vendor(text: &str) -> Option<String> {
    let lines = normalize_lines(text);

    // Strictly greater keeps the earliest line on ties
    let mut best: Option<VendorCandidate> = None;
    for candidate in (0..lines.len()).filter_map(|i| score_line(&lines, i)) {
        if candidate.score > best.as_ref().map_or(0, |b| b.score) {
            best = Some(candidate);
        }
    }
    if let Some(best) = best {
        return Some(best.value);
    }

    let plain = |line: &String| has_letters(line) && !is_address_line(line) && !is_boilerplate(line);

    let after_label = lines
        .windows(2)
        .find(|pair| is_boilerplate(&pair[0]) && plain(&pair[1]))
        .map(|pair| &pair[1]);

    after_label
        .or_else(|| lines.iter().find(|line| plain(*line)))
        .map(|line| truncate(&clean_candidate(line)))
        .filter(|v| !v.is_empty())
}
