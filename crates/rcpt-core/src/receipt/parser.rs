//! Assembles a suggestion from OCR text, provider fields and vendor memory.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::memory::{VendorMatch, VendorMemory};
use crate::models::receipt::OcrSuggestion;
use crate::ocr::CloudDocument;

use super::rules::vendor::{clean_candidate, MAX_VENDOR_LEN};
use super::rules::{
    extract_date, extract_location, extract_total, extract_vendor, infer_category, parse_amount,
};

/// Where the suggested vendor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VendorSource {
    /// A remembered vendor signature matched with enough confidence.
    Memory,
    /// The cloud service named the vendor.
    Provider,
    /// The line-scoring heuristic.
    Heuristic,
}

/// Parser output for one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReceipt {
    /// `None` only when no field could be found.
    pub suggestion: Option<OcrSuggestion>,
    /// Inferred category, empty when no rule matched.
    pub category: String,
    pub vendor_source: Option<VendorSource>,
    /// The memory entry that decided the vendor, if any.
    pub memory_match: Option<VendorMatch>,
}

/// Receipt parser. Infallible: absent fields are `None`.
#[derive(Debug, Clone, Default)]
pub struct ReceiptParser;

impl ReceiptParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse free OCR text.
    pub fn parse(&self, text: &str, memory: &VendorMemory) -> ParsedReceipt {
        self.parse_with_hints(text, None, memory)
    }

    /// Parse text, preferring provider fields where the cloud service
    /// returned them.
    pub fn parse_with_hints(
        &self,
        text: &str,
        hints: Option<&CloudDocument>,
        memory: &VendorMemory,
    ) -> ParsedReceipt {
        let date = hint(hints.and_then(|h| h.date.as_ref()))
            .and_then(extract_date)
            .or_else(|| extract_date(text));

        let total = hint(hints.and_then(|h| h.total.as_ref()))
            .and_then(|t| extract_total(t).or_else(|| parse_amount(t)))
            .or_else(|| extract_total(text));

        let location = hint(hints.and_then(|h| h.address.as_ref()))
            .and_then(extract_location)
            .or_else(|| extract_location(text));

        let memory_match = memory.find_match(text);

        let (vendor, vendor_source) = match (&memory_match, hint(hints.and_then(|h| h.vendor.as_ref()))) {
            (Some(found), _) => (Some(found.name.clone()), Some(VendorSource::Memory)),
            (None, Some(provided)) => (
                Some(truncate_vendor(&clean_candidate(provided))).filter(|v| !v.is_empty()),
                Some(VendorSource::Provider),
            ),
            (None, None) => {
                let heuristic = extract_vendor(text);
                let source = heuristic.as_ref().map(|_| VendorSource::Heuristic);
                (heuristic, source)
            }
        };
        let vendor_source = vendor.as_ref().and(vendor_source);

        let category = infer_category(text, vendor.as_deref());
        debug!(
            "Parsed receipt: vendor={:?} ({:?}), category='{}'",
            vendor, vendor_source, category
        );

        ParsedReceipt {
            suggestion: OcrSuggestion::from_parts(date, vendor, location, total),
            category,
            vendor_source,
            memory_match,
        }
    }
}

fn hint(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

fn truncate_vendor(s: &str) -> String {
    s.chars().take(MAX_VENDOR_LEN).collect::<String>().trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const STARBUCKS: &str =
        "STARBUCKS COFFEE\n123 Main St, Seattle, WA 98101\nDate: 01/15/2024\nTotal: $6.75";

    #[test]
    fn test_starbucks_receipt() {
        let parsed = ReceiptParser::new().parse(STARBUCKS, &VendorMemory::default());

        assert_eq!(
            parsed.suggestion,
            Some(OcrSuggestion {
                date: NaiveDate::from_ymd_opt(2024, 1, 15),
                vendor: Some("STARBUCKS COFFEE".to_string()),
                location: Some("Seattle, WA".to_string()),
                total: Some(Decimal::from_str("6.75").unwrap()),
            })
        );
        assert_eq!(parsed.category, "Meals & Entertainment");
        assert_eq!(parsed.vendor_source, Some(VendorSource::Heuristic));
        assert_eq!(parsed.memory_match, None);
    }

    #[test]
    fn test_nothing_found() {
        let parsed = ReceiptParser::new().parse("   \n", &VendorMemory::default());
        assert_eq!(parsed.suggestion, None);
        assert_eq!(parsed.category, "");
        assert_eq!(parsed.vendor_source, None);
    }

    #[test]
    fn test_memory_overrides_heuristic() {
        let mut memory = VendorMemory::default();
        memory.remember(
            "Blue Bottle Coffee\n300 Webster St\nOakland, CA 94607\nhello@bluebottle.com",
            "Blue Bottle Coffee",
        );

        let text = "WELCOME!!\nTHANKS FOR VISITING\nhello@bluebottle.com\nTotal $4.50";
        let parsed = ReceiptParser::new().parse(text, &memory);
        let suggestion = parsed.suggestion.unwrap();

        assert_eq!(suggestion.vendor.as_deref(), Some("Blue Bottle Coffee"));
        assert_eq!(parsed.vendor_source, Some(VendorSource::Memory));
        assert_eq!(parsed.category, "Meals & Entertainment");

        let without = ReceiptParser::new().parse(text, &VendorMemory::default());
        assert_ne!(without.vendor_source, Some(VendorSource::Memory));
    }

    #[test]
    fn test_provider_fields_win_over_text() {
        let hints = CloudDocument {
            raw_text: STARBUCKS.to_string(),
            vendor: Some("Starbucks Store #1234".to_string()),
            date: Some("2024-01-16".to_string()),
            total: Some("$7.25".to_string()),
            address: Some("1 Pike Pl, Seattle, WA 98101".to_string()),
        };
        let parsed = ReceiptParser::new().parse_with_hints(STARBUCKS, Some(&hints), &VendorMemory::default());
        let suggestion = parsed.suggestion.unwrap();

        assert_eq!(suggestion.date, NaiveDate::from_ymd_opt(2024, 1, 16));
        assert_eq!(suggestion.total, Some(Decimal::from_str("7.25").unwrap()));
        assert_eq!(suggestion.vendor.as_deref(), Some("Starbucks Store #1234"));
        assert_eq!(suggestion.location.as_deref(), Some("Seattle, WA"));
        assert_eq!(parsed.vendor_source, Some(VendorSource::Provider));
    }

    #[test]
    fn test_unusable_hints_fall_back_to_text() {
        let hints = CloudDocument {
            raw_text: STARBUCKS.to_string(),
            date: Some("sometime".to_string()),
            total: Some("n/a".to_string()),
            ..CloudDocument::default()
        };
        let parsed = ReceiptParser::new().parse_with_hints(STARBUCKS, Some(&hints), &VendorMemory::default());
        let suggestion = parsed.suggestion.unwrap();

        assert_eq!(suggestion.date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(suggestion.total, Some(Decimal::from_str("6.75").unwrap()));
        assert_eq!(parsed.vendor_source, Some(VendorSource::Heuristic));
    }
}
