//! Bank and direction detection shared by the deterministic parsers

use std::sync::LazyLock;

use regex::Regex;

use crate::models::Direction;

/// Ordered name-pattern table. First match wins, so more specific
/// patterns sit above catch-alls.
static BANK_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("HDFC Bank", r"(?i)hdfc"),
        ("ICICI Bank", r"(?i)icici"),
        ("Axis Bank", r"(?i)axis\s*bank|axisbank"),
        ("State Bank of India", r"(?i)\bsbi\b|state\s*bank"),
        ("Kotak Mahindra Bank", r"(?i)kotak"),
        ("IDFC FIRST Bank", r"(?i)idfc"),
        ("Yes Bank", r"(?i)yes\s*bank"),
        ("Punjab National Bank", r"(?i)\bpnb\b|punjab\s*national"),
        ("Bank of Baroda", r"(?i)\bbob\b|bank\s*of\s*baroda"),
        ("IndusInd Bank", r"(?i)indusind"),
        ("Federal Bank", r"(?i)federal\s*bank"),
        ("Paytm Payments Bank", r"(?i)paytm"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).unwrap()))
    .collect()
});

/// Credit-class keywords are checked first; they are the more specific
/// signals, and debit is the default for payment notifications.
const CREDIT_KEYWORDS: &[&str] = &[
    "credited",
    "received",
    "deposited",
    "refunded",
    "refund of",
    "cashback",
    "credit of",
    "reversed",
];

/// Scan from, subject, and body (in that order) against the table
pub fn detect_bank(from: &str, subject: &str, body: &str) -> Option<&'static str> {
    for haystack in [from, subject, body] {
        for (name, pattern) in BANK_PATTERNS.iter() {
            if pattern.is_match(haystack) {
                return Some(name);
            }
        }
    }
    None
}

/// Keyword-based direction detection, defaulting to debit
pub fn detect_direction(text: &str) -> Direction {
    let lower = text.to_lowercase();
    if CREDIT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Direction::Credit
    } else {
        Direction::Debit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_from_sender_wins_over_body() {
        let bank = detect_bank(
            "alerts@icicibank.com",
            "Transaction alert",
            "transfer to your HDFC account",
        );
        assert_eq!(bank, Some("ICICI Bank"));
    }

    #[test]
    fn test_bank_from_body() {
        let bank = detect_bank(
            "noreply@example.com",
            "Payment receipt",
            "Your Kotak Mahindra Bank account was used",
        );
        assert_eq!(bank, Some("Kotak Mahindra Bank"));
        assert_eq!(detect_bank("a@b.c", "x", "y"), None);
    }

    #[test]
    fn test_direction_defaults_to_debit() {
        assert_eq!(detect_direction("Rs. 500 debited from a/c"), Direction::Debit);
        assert_eq!(detect_direction("payment of Rs. 500 made"), Direction::Debit);
    }

    #[test]
    fn test_credit_keywords_win() {
        assert_eq!(
            detect_direction("Rs. 500 credited to your account"),
            Direction::Credit
        );
        assert_eq!(
            detect_direction("cashback of Rs. 50 received"),
            Direction::Credit
        );
        // "credit card" alone is not a credit-class signal
        assert_eq!(
            detect_direction("spent on your credit card"),
            Direction::Debit
        );
    }
}
