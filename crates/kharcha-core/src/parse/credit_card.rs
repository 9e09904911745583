//! Credit card spend notification parser
//!
//! Covers the alert shapes like:
//! "Thank you for using your HDFC Bank Credit Card ending 5522 for
//!  Rs. 2,349.00 at AMAZON PAY INDIA on 15-01-2025."

use std::sync::LazyLock;

use regex::Regex;

use super::{amount, banks, deterministic_transaction, EmailParser};
use crate::models::{NewTransaction, RawEmail, TransactionType};

static SPEND_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\bat|\btowards)\s+([A-Z][A-Za-z0-9 &._'*-]{2,40}?)(?:\s+on\b|[.,]|$)")
        .unwrap()
});

static AUTH_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:auth(?:orization)?\s*(?:code)?|approval\s*code)\s*[:\-]?\s*([A-Z0-9]{4,10})\b")
        .unwrap()
});

pub struct CreditCardParser;

impl EmailParser for CreditCardParser {
    fn name(&self) -> &'static str {
        "credit_card"
    }

    fn can_parse(&self, email: &RawEmail) -> bool {
        let haystack = format!("{} {}", email.subject, email.body_text).to_lowercase();
        haystack.contains("credit card")
            || (haystack.contains("card ending")
                && (haystack.contains("spent") || haystack.contains("used")))
    }

    fn parse(&self, email: &RawEmail) -> Option<Vec<NewTransaction>> {
        let body = &email.body_text;
        let value = amount::find_amount(body).or_else(|| amount::find_amount(&email.subject))?;
        let merchant = SPEND_LOCATION.captures(body).map(|c| c[1].trim().to_string())?;

        let direction = banks::detect_direction(body);
        let mut tx = deterministic_transaction(
            email,
            value,
            direction,
            TransactionType::CreditCard,
            merchant,
        );
        tx.reference = AUTH_CODE.captures(body).map(|c| c[1].to_string());

        Some(vec![tx])
    }
}
