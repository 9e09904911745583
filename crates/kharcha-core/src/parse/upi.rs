//! UPI payment notification parser
//!
//! Covers the bank alert shapes like:
//! "Rs.500.00 is debited from account **1234 to VPA swiggy@icici
//!  SWIGGY on 15-01-25. UPI transaction reference number is 500123456789."

use std::sync::LazyLock;

use regex::Regex;

use super::{amount, banks, deterministic_transaction, EmailParser};
use crate::models::{NewTransaction, RawEmail, TransactionType};

static VPA_MERCHANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:to|from)\s+VPA\s+\S+@\S+\s+([A-Za-z0-9][A-Za-z0-9 &._'-]{1,40}?)(?:\s+on\b|[.,]|$)")
        .unwrap()
});

static NAMED_PARTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:paid to|to|from)\s+([A-Z][A-Za-z0-9 &._'-]{2,40}?)(?:\s+on\b|\s+via\b|\s+using\b|[.,])")
        .unwrap()
});

static BARE_VPA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:to|from)\s+(?:VPA\s+)?([\w.\-]+@[\w]+)").unwrap());

static UPI_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)UPI\s*(?:txn\s*)?(?:transaction\s*)?(?:ref(?:erence)?)?\s*(?:no\.?|number)?\s*(?:is)?\s*[:\-]?\s*(\d{9,14})")
        .unwrap()
});

pub struct UpiParser;

impl EmailParser for UpiParser {
    fn name(&self) -> &'static str {
        "upi"
    }

    fn can_parse(&self, email: &RawEmail) -> bool {
        let haystack = format!("{} {}", email.subject, email.body_text).to_lowercase();
        haystack.contains("upi") || haystack.contains("vpa")
    }

    fn parse(&self, email: &RawEmail) -> Option<Vec<NewTransaction>> {
        let body = &email.body_text;
        let value = amount::find_amount(body).or_else(|| amount::find_amount(&email.subject))?;

        // Counterparty preference: name printed after the VPA, then the
        // bare VPA, then any named party phrase
        let merchant = VPA_MERCHANT
            .captures(body)
            .or_else(|| BARE_VPA.captures(body))
            .or_else(|| NAMED_PARTY.captures(body))
            .map(|c| c[1].trim().to_string())?;

        let direction = banks::detect_direction(body);
        let mut tx =
            deterministic_transaction(email, value, direction, TransactionType::Upi, merchant);
        tx.reference = UPI_REFERENCE.captures(body).map(|c| c[1].to_string());

        Some(vec![tx])
    }
}
