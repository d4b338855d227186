//! Keyword-rule expense category inference.
//!
//! First match wins: rules are evaluated in order and the first one with
//! any keyword in the haystack decides. A later, more specific rule never
//! overrides an earlier one.

/// Ordered (category, keywords) rules. Keywords are lower-case substrings.
pub const CATEGORY_RULES: &[(&str, &[&str])] = &[
    (
        "Travel",
        &[
            "airline", "airways", "flight", "boarding pass", "hotel", "marriott", "hilton",
            "hyatt", "airbnb", "expedia", "motel", "resort", "amtrak", "car rental", "hertz",
        ],
    ),
    (
        "Meals & Entertainment",
        &[
            "restaurant", "cafe", "café", "coffee", "starbucks", "espresso", "pizza", "burger",
            "grill", "diner", "bistro", "bakery", "taco", "sushi", "mcdonald", "chipotle",
            "doordash", "grubhub", "uber eats", "brewery", "tavern", "catering", "cinema",
            "theater", "theatre",
        ],
    ),
    (
        "Transportation",
        &[
            "uber", "lyft", "taxi", "parking", "shell", "chevron", "exxon", "gasoline", "fuel",
            "toll", "transit",
        ],
    ),
    (
        "Office Supplies",
        &["staples", "office depot", "officemax", "toner", "printer paper", "stationery"],
    ),
    (
        "Software & Subscriptions",
        &[
            "subscription", "software", "saas", "adobe", "microsoft", "github", "google workspace",
            "aws", "license",
        ],
    ),
    (
        "Utilities",
        &["electric", "utility", "water bill", "comcast", "verizon", "at&t", "internet service"],
    ),
    (
        "Shipping & Postage",
        &["fedex", "ups store", "usps", "postage", "shipping", "dhl"],
    ),
    (
        "Professional Services",
        &["consulting", "legal services", "attorney", "accounting", "bookkeeping"],
    ),
    (
        "Equipment",
        &["best buy", "apple store", "laptop", "monitor", "hardware", "home depot"],
    ),
];

/// Infer an expense category from vendor name and receipt text. Returns an
/// empty string when no rule matches.
pub fn infer_category(text: &str, vendor: Option<&str>) -> String {
    let haystack = format!("{} {}", vendor.unwrap_or(""), text).to_lowercase();

    CATEGORY_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(category, _)| category.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_coffee_is_meals() {
        let text = "STARBUCKS COFFEE\n123 Main St, Seattle, WA 98101\nDate: 01/15/2024\nTotal: $6.75";
        assert_eq!(infer_category(text, Some("STARBUCKS COFFEE")), "Meals & Entertainment");
    }

    #[test]
    fn test_vendor_alone_can_decide() {
        assert_eq!(infer_category("Total $12.00", Some("Lyft")), "Transportation");
    }

    #[test]
    fn test_first_match_not_best_match() {
        // Both a travel and a meals keyword appear; travel is listed first
        let text = "Hilton Garden Inn\nRestaurant charge\nTotal $40.00";
        assert_eq!(infer_category(text, None), "Travel");
    }

    #[test]
    fn test_uber_eats_before_uber() {
        assert_eq!(infer_category("Uber Eats order", None), "Meals & Entertainment");
    }

    #[test]
    fn test_no_match_is_empty() {
        assert_eq!(infer_category("Thank you", None), "");
    }
}
