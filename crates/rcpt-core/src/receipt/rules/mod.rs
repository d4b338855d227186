//! Rule-based field extractors for receipts.

pub mod amounts;
pub mod category;
pub mod dates;
pub mod location;
pub mod patterns;
pub mod vendor;

pub use amounts::{extract_total, parse_amount, AmountExtractor};
pub use category::{infer_category, CATEGORY_RULES};
pub use dates::{extract_date, DateExtractor};
pub use location::extract_location;
pub use patterns::{is_address_line, is_boilerplate};
pub use vendor::{extract_vendor, score_candidates, VendorCandidate};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;
}

/// Extraction context with confidence scores.
#[derive(Debug, Clone)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Position in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}

/// Split OCR text into trimmed, whitespace-collapsed, non-empty lines.
pub fn normalize_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lines() {
        let lines = normalize_lines("  STARBUCKS   COFFEE \n\n\t Total:  $6.75  \r\n");
        assert_eq!(lines, vec!["STARBUCKS COFFEE", "Total: $6.75"]);
    }
}
