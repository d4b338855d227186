//! Location ("City, ST") extraction.

use regex::Regex;

use super::normalize_lines;
use super::patterns::{CITY_COMMA_STATE, CITY_STATE_ZIP, REGION_CODES, STREET_TYPE_WORD};

/// Extract the receipt location as `"City, ST"`.
///
/// All lines are scanned for a city/state/ZIP triple before any line is
/// scanned for the looser "City, ST" form.
pub fn extract_location(text: &str) -> Option<String> {
    let lines = normalize_lines(text);

    [&*CITY_STATE_ZIP, &*CITY_COMMA_STATE]
        .into_iter()
        .find_map(|pattern| lines.iter().find_map(|line| find_in_line(pattern, line)))
}

fn find_in_line(pattern: &Regex, line: &str) -> Option<String> {
    let mut start = 0;
    while start < line.len() {
        let caps = pattern.captures_at(line, start)?;
        let whole = caps.get(0)?;
        let city = strip_street(&caps[1]);
        let region = &caps[2];

        if REGION_CODES.contains(&region) {
            return Some(format!("{}, {}", display_city(&city), region));
        }

        // Retry from the next word so a multi-word prefix does not hide a
        // valid city further right
        start = line[whole.start()..]
            .char_indices()
            .skip(1)
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, _)| whole.start() + i + 1)
            .unwrap_or(line.len());
    }
    None
}

/// Drop a street name captured ahead of the city on single-line addresses
/// ("Pike Pl Seattle" -> "Seattle"). A leading street word is kept so
/// "St. Louis" survives.
fn strip_street(city: &str) -> String {
    let words: Vec<&str> = city.split_whitespace().collect();

    let cut = (1..words.len().saturating_sub(1))
        .filter(|&i| STREET_TYPE_WORD.is_match(words[i]))
        .last();

    match cut {
        Some(i) => words[i + 1..].join(" "),
        None => words.join(" "),
    }
}

/// Title-case shouted city names ("SEATTLE" -> "Seattle").
fn display_city(city: &str) -> String {
    if city.chars().any(|c| c.is_lowercase()) {
        return city.to_string();
    }

    city.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_city_state_zip() {
        let text = "STARBUCKS COFFEE\n123 Main St, Seattle, WA 98101\nTotal: $6.75";
        assert_eq!(extract_location(text).as_deref(), Some("Seattle, WA"));
    }

    #[test]
    fn test_space_joined_zip() {
        assert_eq!(extract_location("Portland OR 97201").as_deref(), Some("Portland, OR"));
    }

    #[test]
    fn test_zip_form_preferred_over_loose() {
        let text = "Shipped from Austin, TX\nStore: Denver, CO 80202";
        assert_eq!(extract_location(text).as_deref(), Some("Denver, CO"));
    }

    #[test]
    fn test_loose_city_state() {
        assert_eq!(extract_location("Brooklyn, NY").as_deref(), Some("Brooklyn, NY"));
    }

    #[test]
    fn test_uppercase_city_is_title_cased() {
        assert_eq!(
            extract_location("1 MARKET ST\nSAN FRANCISCO, CA 94105").as_deref(),
            Some("San Francisco, CA")
        );
    }

    #[test]
    fn test_single_line_address() {
        assert_eq!(
            extract_location("1912 Pike Pl Seattle WA 98101").as_deref(),
            Some("Seattle, WA")
        );
        assert_eq!(
            extract_location("2 Broadway Ave. Portland OR 97201").as_deref(),
            Some("Portland, OR")
        );
    }

    #[test]
    fn test_leading_street_word_is_part_of_city() {
        assert_eq!(
            extract_location("St. Louis, MO 63101").as_deref(),
            Some("St. Louis, MO")
        );
        assert_eq!(strip_street("Salt Lake City"), "Salt Lake City");
    }

    #[test]
    fn test_unknown_region_skipped() {
        assert_eq!(extract_location("VISA XX 12345"), None);
        assert_eq!(extract_location("Total: $6.75"), None);
    }
}
