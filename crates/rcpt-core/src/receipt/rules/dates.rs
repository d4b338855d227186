//! Date extraction for receipts.

use chrono::NaiveDate;
use regex::Regex;

use super::patterns::{
    month_from_name, DATE_DAY_MONTH_NAME, DATE_KEYWORD, DATE_MDY, DATE_MONTH_NAME, DATE_YMD,
};
use super::{normalize_lines, ExtractionMatch, FieldExtractor};

/// Which capture group holds which date part.
#[derive(Clone, Copy)]
enum Layout {
    /// month name, day, year
    MonthName,
    /// day, month name, year
    DayMonthName,
    /// year, month, day
    YearFirst,
    /// month, day, year
    MonthFirst,
}

/// Date field extractor.
///
/// Tries month-name forms before numeric forms; numeric dates are read
/// year-first or month-first, never day-first.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }

    fn named_patterns() -> [(&'static Regex, Layout); 2] {
        [
            (&DATE_MONTH_NAME, Layout::MonthName),
            (&DATE_DAY_MONTH_NAME, Layout::DayMonthName),
        ]
    }

    fn numeric_patterns() -> [(&'static Regex, Layout); 2] {
        [(&DATE_YMD, Layout::YearFirst), (&DATE_MDY, Layout::MonthFirst)]
    }

    /// First valid date for the given patterns, in pattern order.
    fn first_match(
        text: &str,
        patterns: &[(&'static Regex, Layout)],
    ) -> Option<ExtractionMatch<NaiveDate>> {
        patterns
            .iter()
            .find_map(|(pattern, layout)| Self::matches(text, pattern, *layout).into_iter().next())
    }

    fn matches(text: &str, pattern: &Regex, layout: Layout) -> Vec<ExtractionMatch<NaiveDate>> {
        pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let (year, month, day) = match layout {
                    Layout::MonthName => (
                        parse_year(&caps[3]),
                        month_from_name(&caps[1])?,
                        caps[2].parse().ok()?,
                    ),
                    Layout::DayMonthName => (
                        parse_year(&caps[3]),
                        month_from_name(&caps[2])?,
                        caps[1].parse().ok()?,
                    ),
                    Layout::YearFirst => (
                        parse_year(&caps[1]),
                        caps[2].parse().ok()?,
                        caps[3].parse().ok()?,
                    ),
                    Layout::MonthFirst => (
                        parse_year(&caps[3]),
                        caps[1].parse().ok()?,
                        caps[2].parse().ok()?,
                    ),
                };

                // from_ymd_opt rejects roll-overs such as Feb 30
                let date = NaiveDate::from_ymd_opt(year, month, day)?;
                let full_match = caps.get(0)?;
                let confidence = match layout {
                    Layout::MonthName | Layout::DayMonthName => 0.95,
                    Layout::YearFirst | Layout::MonthFirst => 0.9,
                };
                Some(
                    ExtractionMatch::new(date, confidence, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                )
            })
            .collect()
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        let lines = normalize_lines(text);
        let all_patterns = [Self::named_patterns(), Self::numeric_patterns()].concat();

        // Keyworded lines first, each tried against every pattern in order
        for line in lines.iter().filter(|l| DATE_KEYWORD.is_match(l)) {
            if let Some(found) = Self::first_match(line, &all_patterns) {
                return Some(found);
            }
        }

        let whole = lines.join("\n");
        Self::first_match(&whole, &Self::named_patterns())
            .or_else(|| Self::first_match(&whole, &Self::numeric_patterns()))
    }
}

/// Extract the receipt date.
pub fn extract_date(text: &str) -> Option<NaiveDate> {
    DateExtractor::new().extract(text).map(|m| m.value)
}

fn parse_year(s: &str) -> i32 {
    let year: i32 = s.parse().unwrap_or(0);
    if year < 100 { 2000 + year } else { year }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_equivalent_formats() {
        assert_eq!(extract_date("Paid on March 5th, 2024"), ymd(2024, 3, 5));
        assert_eq!(extract_date("2024-03-05"), ymd(2024, 3, 5));
        assert_eq!(extract_date("03/05/2024"), ymd(2024, 3, 5));
    }

    #[test]
    fn test_month_name_variants() {
        assert_eq!(extract_date("Jan 5, 2024"), ymd(2024, 1, 5));
        assert_eq!(extract_date("Sept. 12 2023"), ymd(2023, 9, 12));
        assert_eq!(extract_date("5 January 2024"), ymd(2024, 1, 5));
        assert_eq!(extract_date("Issued 21st Feb, 2022"), ymd(2022, 2, 21));
    }

    #[test]
    fn test_two_digit_year() {
        assert_eq!(extract_date("Date: 01/15/24"), ymd(2024, 1, 15));
    }

    #[test]
    fn test_rollover_rejected() {
        assert_eq!(extract_date("Feb 30, 2024"), None);
        assert_eq!(extract_date("Date: 13/45/2024"), None);
        assert_eq!(extract_date("Date: Feb 30, 2024\nMar 1, 2024"), ymd(2024, 3, 1));
    }

    #[test]
    fn test_keyword_line_wins() {
        let text = "Order 02/01/2024\nDate: 01/15/2024\nThank you";
        assert_eq!(extract_date(text), ymd(2024, 1, 15));
    }

    #[test]
    fn test_named_before_numeric_in_whole_text() {
        let text = "Store 04/02/2024\nVisited March 9, 2024";
        assert_eq!(extract_date(text), ymd(2024, 3, 9));
    }

    #[test]
    fn test_no_date() {
        assert_eq!(extract_date("STARBUCKS COFFEE\nTotal: $6.75"), None);
        assert_eq!(extract_date(""), None);
    }
}
