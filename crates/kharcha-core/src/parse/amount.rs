//! Amount normalization shared by every parser
//!
//! Indian notation is the norm in these emails: `Rs. 1,50,000.00`
//! groups lakhs and crores, and the currency marker may be `Rs.`,
//! `INR`, or `₹` on either side of the number.

use std::sync::LazyLock;

use regex::Regex;

static AMOUNT_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:rs\.?|inr|₹)\s*([0-9][0-9,]*(?:\.[0-9]+)?)").unwrap()
});

/// Normalize an amount string to a positive value.
///
/// Strips currency markers and grouping commas, takes the absolute
/// value, and rejects empty, unparseable, non-finite, and zero inputs.
pub fn normalize_amount(raw: &str) -> Option<f64> {
    let stripped = strip_currency_markers(raw);
    let cleaned: String = stripped
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() || value == 0.0 {
        return None;
    }
    Some(value.abs())
}

/// First currency-marked amount in a blob of text
pub fn find_amount(text: &str) -> Option<f64> {
    AMOUNT_IN_TEXT
        .captures(text)
        .and_then(|c| normalize_amount(c.get(1)?.as_str()))
}

/// Every currency-marked amount in a blob of text, in order
pub fn find_all_amounts(text: &str) -> Vec<f64> {
    AMOUNT_IN_TEXT
        .captures_iter(text)
        .filter_map(|c| normalize_amount(c.get(1)?.as_str()))
        .collect()
}

fn strip_currency_markers(raw: &str) -> String {
    let mut out = raw.trim().to_string();
    // "rs." before "rs" so the dot goes with the marker
    for marker in ["rs.", "rs", "inr", "₹"] {
        loop {
            let lower = out.to_lowercase();
            match lower.find(marker) {
                Some(idx) => out.replace_range(idx..idx + marker.len(), ""),
                None => break,
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_table() {
        // The canonical set of inputs this normalizer must handle
        assert_eq!(normalize_amount("Rs. 1,50,000.00"), Some(150_000.0));
        assert_eq!(normalize_amount("₹500"), Some(500.0));
        assert_eq!(normalize_amount("INR 1000"), Some(1000.0));
        assert_eq!(normalize_amount("500 INR"), Some(500.0));
        assert_eq!(normalize_amount("-500"), Some(500.0));
        assert_eq!(normalize_amount(""), None);
    }

    #[test]
    fn test_rejects_zero_and_garbage() {
        assert_eq!(normalize_amount("0"), None);
        assert_eq!(normalize_amount("0.00"), None);
        assert_eq!(normalize_amount("Rs."), None);
        assert_eq!(normalize_amount("around five hundred"), None);
        assert_eq!(normalize_amount("NaN"), None);
        assert_eq!(normalize_amount("inf"), None);
    }

    #[test]
    fn test_plain_numbers() {
        assert_eq!(normalize_amount("1234.56"), Some(1234.56));
        assert_eq!(normalize_amount("1,234.56"), Some(1234.56));
    }

    #[test]
    fn test_find_amount_in_sentence() {
        let body = "Dear customer, Rs.2,500.00 has been debited from your account.";
        assert_eq!(find_amount(body), Some(2500.0));
        assert_eq!(find_amount("no money mentioned here"), None);
    }

    #[test]
    fn test_find_all_amounts() {
        let body = "Paid Rs. 100 to A and INR 250.50 to B";
        assert_eq!(find_all_amounts(body), vec![100.0, 250.5]);
    }
}
