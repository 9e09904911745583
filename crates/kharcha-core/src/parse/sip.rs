//! Mutual fund SIP installment notification parser

use std::sync::LazyLock;

use regex::Regex;

use super::{amount, deterministic_transaction, EmailParser};
use crate::models::{Direction, NewTransaction, RawEmail, TransactionType};

static FUND_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:in|towards|for)\s+([A-Z][A-Za-z0-9 &\-]{2,60}?Fund(?:\s*-\s*(?:Direct|Regular|Growth|IDCW)(?:\s+(?:Plan|Growth))?)?)",
    )
    .unwrap()
});

static FOLIO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)folio\s*(?:no\.?|number)?\s*[:\-]?\s*([A-Z0-9/]{4,20})").unwrap()
});

static SIP_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bsip\b").unwrap());

pub struct SipParser;

impl EmailParser for SipParser {
    fn name(&self) -> &'static str {
        "sip"
    }

    fn can_parse(&self, email: &RawEmail) -> bool {
        let haystack = format!("{} {}", email.subject, email.body_text);
        SIP_WORD.is_match(&haystack)
            || haystack.to_lowercase().contains("mutual fund")
            || haystack.to_lowercase().contains("folio")
    }

    fn parse(&self, email: &RawEmail) -> Option<Vec<NewTransaction>> {
        let body = &email.body_text;
        let value = amount::find_amount(body).or_else(|| amount::find_amount(&email.subject))?;

        let merchant = FUND_NAME
            .captures(body)
            .or_else(|| FUND_NAME.captures(&email.subject))
            .map(|c| c[1].trim().to_string())
            .unwrap_or_else(|| "Mutual Fund SIP".to_string());

        // An SIP installment is always money out
        let mut tx = deterministic_transaction(
            email,
            value,
            Direction::Debit,
            TransactionType::Sip,
            merchant,
        );
        tx.reference = FOLIO.captures(body).map(|c| c[1].to_string());

        Some(vec![tx])
    }
}
