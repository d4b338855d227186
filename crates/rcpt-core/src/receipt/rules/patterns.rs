//! Common regex patterns for receipt field extraction.

use lazy_static::lazy_static;
use regex::Regex;

const MONTH_NAMES: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

const STREET_TYPES: &str = r"street|st|avenue|ave|road|rd|boulevard|blvd|drive|dr|lane|ln|way|court|ct|place|pl|parkway|pkwy|highway|hwy|square|sq|terrace|circle|cir|plaza";

lazy_static! {
    // Dates
    pub static ref DATE_KEYWORD: Regex = Regex::new(
        r"(?i)date|paid|invoice|issued|billing"
    ).unwrap();

    /// "Jan 5, 2024", "March 5th, 2024", "Sept. 12 2023"
    pub static ref DATE_MONTH_NAME: Regex = Regex::new(&format!(
        r"(?i)\b({MONTH_NAMES})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b"
    )).unwrap();

    /// "5 Jan 2024", "5th March, 2024"
    pub static ref DATE_DAY_MONTH_NAME: Regex = Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+({MONTH_NAMES})\.?,?\s+(\d{{4}})\b"
    )).unwrap();

    /// "2024-03-05", "2024/3/5", "2024.03.05"
    pub static ref DATE_YMD: Regex = Regex::new(
        r"\b(\d{4})[./\-](\d{1,2})[./\-](\d{1,2})\b"
    ).unwrap();

    /// "03/05/2024", "3-5-24"
    pub static ref DATE_MDY: Regex = Regex::new(
        r"\b(\d{1,2})[./\-](\d{1,2})[./\-](\d{4}|\d{2})\b"
    ).unwrap();

    // Amounts
    pub static ref TOTAL_KEYWORD: Regex = Regex::new(
        r"(?i)total|amount|balance|paid"
    ).unwrap();

    /// "$1,234.56", "6.75", "$ 10.00"
    pub static ref AMOUNT: Regex = Regex::new(
        r"\$?\s?(\d{1,3}(?:,\d{3})+|\d+)\.(\d{2})\b"
    ).unwrap();

    // Vendor scoring
    pub static ref LEGAL_SUFFIX: Regex = Regex::new(
        r"(?i)\b(?:inc|llc|l\.l\.c|ltd|limited|corp|corporation|co|company|gmbh|plc|llp|pty|s\.a|ag|bv)\b\.?"
    ).unwrap();

    pub static ref STREET_LINE: Regex = Regex::new(&format!(
        r"(?i)^\s*\d+[a-z]?\s+(?:[a-z0-9.'\-]+\s+){{0,4}}(?:{STREET_TYPES})\b"
    )).unwrap();

    /// Street address embedded after a name, e.g. "Acme Corp, 12 Oak Ave".
    pub static ref STREET_TAIL: Regex = Regex::new(&format!(
        r"(?i)[,\s]+\d+[a-z]?\s+(?:[a-z0-9.'\-]+\s+){{0,4}}(?:{STREET_TYPES})\b.*$"
    )).unwrap();

    pub static ref UNIT_MARKER: Regex = Regex::new(
        r"(?i)\b(?:(?:suite|ste|unit|apt|bldg)\.?\s*#?\s*\d+|\d+(?:st|nd|rd|th)\s+floor|floor\s+\d+|p\.?\s?o\.?\s+box)\b"
    ).unwrap();

    pub static ref CITY_STATE: Regex = Regex::new(
        r"\b[A-Z][A-Za-z.'\-]+(?:\s+[A-Z][A-Za-z.'\-]+)*,\s*[A-Z]{2}\b"
    ).unwrap();

    pub static ref ZIP_CODE: Regex = Regex::new(
        r"\b\d{5}(?:-\d{4})?\b"
    ).unwrap();

    pub static ref BOILERPLATE: Regex = Regex::new(
        r"(?i)\b(?:invoice|receipt|total|subtotal|sub-total|tax|vat|payment|paid|amount|balance|due|change|cash|visa|mastercard|amex|debit|credit|card|tip|gratuity|thank|thanks|order|qty|quantity|price|items?|date|time|tel|phone|fax|www|https?|email|bill|billing|transaction|auth|approval|ref|reference|account|customer|server|table|guest|register|cashier)\b|@"
    ).unwrap();

    pub static ref LABEL_PREFIX: Regex = Regex::new(
        r"(?i)^(?:invoice(?:\s+(?:from|number|no\.?))?|receipt(?:\s+from)?|date\s+paid|date|bill(?:ed)?\s+to|bill\s+from|sold\s+by|vendor|merchant|seller|supplier|payee|company)\b\s*[:#\-]?\s*"
    ).unwrap();

    // Location
    /// "Seattle, WA 98101" or "Seattle WA 98101"
    pub static ref CITY_STATE_ZIP: Regex = Regex::new(
        r"\b([A-Z][A-Za-z.'\-]*(?:\s+[A-Z][A-Za-z.'\-]*){0,2})(?:,\s*|\s+)([A-Z]{2})\s+\d{5}(?:-\d{4})?\b"
    ).unwrap();

    /// A lone street-type word such as "Pl" or "Ave."
    pub static ref STREET_TYPE_WORD: Regex = Regex::new(&format!(
        r"(?i)^(?:{STREET_TYPES})\.?$"
    )).unwrap();

    /// "Seattle, WA"
    pub static ref CITY_COMMA_STATE: Regex = Regex::new(
        r"\b([A-Z][A-Za-z.'\-]*(?:\s+[A-Z][A-Za-z.'\-]*){0,2}),\s*([A-Z]{2})\b"
    ).unwrap();

    // Vendor signatures
    pub static ref EMAIL: Regex = Regex::new(
        r"[a-zA-Z0-9._%+-]+@([a-zA-Z0-9.-]+\.[a-zA-Z]{2,})"
    ).unwrap();

    pub static ref WEB_DOMAIN: Regex = Regex::new(
        r"(?i)\b(?:https?://)?(?:www\.)?((?:[a-z0-9-]+\.)+(?:com|net|org|io|co|us|ca|uk|de|biz|info|app|shop|store))\b"
    ).unwrap();
}

/// US state and Canadian province codes accepted as the region part of a
/// location.
pub const REGION_CODES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN",
    "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH",
    "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
    "VT", "VA", "WA", "WV", "WI", "WY", "PR", "AB", "BC", "MB", "NB", "NL", "NS", "NT", "NU",
    "ON", "PE", "QC", "SK", "YT",
];

/// Month number for an English month name or abbreviation.
pub fn month_from_name(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// True when the line looks like part of a postal address.
pub fn is_address_line(line: &str) -> bool {
    STREET_LINE.is_match(line)
        || UNIT_MARKER.is_match(line)
        || ZIP_CODE.is_match(line)
        || CITY_STATE
            .find_iter(line)
            .any(|m| REGION_CODES.contains(&&m.as_str()[m.as_str().len() - 2..]))
}

/// True when the line carries receipt boilerplate (totals, payment, labels).
pub fn is_boilerplate(line: &str) -> bool {
    BOILERPLATE.is_match(line)
}
