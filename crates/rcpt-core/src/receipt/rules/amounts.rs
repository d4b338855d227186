//! Total amount extraction for receipts.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::{AMOUNT, TOTAL_KEYWORD};
use super::{normalize_lines, ExtractionMatch, FieldExtractor};

/// Currency amount extractor (optional `$`, optional thousands separators,
/// exactly two decimals).
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl AmountExtractor {
    /// Every well-formed amount in `text`, in order of appearance.
    pub fn extract_all(&self, text: &str) -> Vec<ExtractionMatch<Decimal>> {
        let mut results = Vec::new();

        for caps in AMOUNT.captures_iter(text) {
            let (Some(full_match), Some(digits)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            // The match may open on "$" or a space; neighbours are judged
            // from the digits themselves.
            if !is_isolated(text, digits.start(), full_match.end()) {
                continue;
            }

            let integer_part = caps[1].replace(',', "");
            let amount_str = format!("{}.{}", integer_part, &caps[2]);
            if let Ok(amount) = Decimal::from_str(&amount_str) {
                results.push(
                    ExtractionMatch::new(amount, 0.8, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                );
            }
        }

        results
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }
}

/// Reject numbers that are really part of a date or version string
/// ("01.15.2024", "1.2.30").
fn is_isolated(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let mut after = text[end..].chars();
    let next = after.next();
    let next_next = after.next();

    let glued_before = matches!(before, Some(c) if c == '.' || c == '/' || c.is_ascii_digit());
    let glued_after = matches!(next, Some('.' | '/' | '-'))
        && matches!(next_next, Some(c) if c.is_ascii_digit());

    !glued_before && !glued_after
}

/// Extract the grand total.
///
/// The largest amount on a total/amount/balance/paid line wins, so the
/// total outranks subtotals and taxes. Without such a line, the largest
/// amount anywhere in the text is used.
pub fn extract_total(text: &str) -> Option<Decimal> {
    let extractor = AmountExtractor::new();

    let labeled = normalize_lines(text)
        .iter()
        .filter(|line| TOTAL_KEYWORD.is_match(line))
        .flat_map(|line| extractor.extract_all(line))
        .map(|m| m.value)
        .max();

    labeled.or_else(|| {
        extractor
            .extract_all(text)
            .into_iter()
            .map(|m| m.value)
            .max()
    })
}

/// Parse a free-form amount such as "$1,234.56" or "12.5".
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned).ok().filter(|d| !d.is_sign_negative())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_total_is_max_labeled_amount() {
        let text = "Subtotal $10.00\nTax $1.00\nTotal $11.00";
        assert_eq!(extract_total(text), Some(dec("11.00")));
    }

    #[test]
    fn test_labeled_beats_unlabeled() {
        let text = "Latte 25.00\nAmount Due: $6.75";
        assert_eq!(extract_total(text), Some(dec("6.75")));
    }

    #[test]
    fn test_fallback_to_max_anywhere() {
        let text = "Latte 4.50\nMuffin 3.25";
        assert_eq!(extract_total(text), Some(dec("4.50")));
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!(extract_total("TOTAL $1,234.56"), Some(dec("1234.56")));
    }

    #[test]
    fn test_dates_are_not_amounts() {
        assert_eq!(extract_total("Date: 01.15.2024"), None);
        assert_eq!(extract_total("Paid 01/15/2024"), None);
    }

    #[test]
    fn test_requires_two_decimals() {
        assert_eq!(extract_total("Total 12.5"), None);
        assert_eq!(extract_total("Total 12"), None);
    }

    #[test]
    fn test_amount_after_card_digits() {
        let text = "Subtotal 10.00\nTax 1.00\nAmount Paid VISA 4242 11.00";
        assert_eq!(extract_total(text), Some(dec("11.00")));
    }

    #[test]
    fn test_amount_after_quantity() {
        assert_eq!(extract_total("Total 2 11.00"), Some(dec("11.00")));
        assert_eq!(extract_total("Total 2 $11.00"), Some(dec("11.00")));
    }

    #[test]
    fn test_extract_first_amount() {
        let found = AmountExtractor::new().extract("Qty 3 4.50 ea").unwrap();
        assert_eq!(found.value, dec("4.50"));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("6.75 USD"), Some(dec("6.75")));
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn test_extract_all_amounts() {
        let extractor = AmountExtractor::new();
        let results = extractor.extract_all("Coffee 4.50, Total: $1,004.50");
        assert_eq!(results.len(), 2);
    }
}
