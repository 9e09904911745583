//! Account transfer (NEFT/RTGS/IMPS) and plain debit/credit alert parser

use std::sync::LazyLock;

use regex::Regex;

use super::{amount, banks, deterministic_transaction, EmailParser};
use crate::models::{NewTransaction, RawEmail, TransactionType};

static COUNTERPARTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:to|from|favou?ring)\s+(?:beneficiary\s+)?([A-Z][A-Za-z0-9 &._'-]{2,40}?)(?:\s+on\b|\s+via\b|\s+through\b|[.,]|$)")
        .unwrap()
});

static INFO_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)info\s*[:\-]\s*([^\r\n.]{3,60})").unwrap());

static TRANSFER_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:utr|ref(?:erence)?)\s*(?:no\.?|number)?\s*(?:is)?\s*[:\-]?\s*([A-Z0-9]{8,22})\b")
        .unwrap()
});

pub struct BankTransferParser;

impl EmailParser for BankTransferParser {
    fn name(&self) -> &'static str {
        "bank_transfer"
    }

    fn can_parse(&self, email: &RawEmail) -> bool {
        let haystack = format!("{} {}", email.subject, email.body_text).to_lowercase();
        ["neft", "rtgs", "imps"]
            .iter()
            .any(|rail| haystack.contains(rail))
            || ((haystack.contains("a/c") || haystack.contains("account"))
                && (haystack.contains("debited") || haystack.contains("credited")))
    }

    fn parse(&self, email: &RawEmail) -> Option<Vec<NewTransaction>> {
        let body = &email.body_text;
        let value = amount::find_amount(body).or_else(|| amount::find_amount(&email.subject))?;

        let merchant = COUNTERPARTY
            .captures(body)
            .map(|c| c[1].trim().to_string())
            .or_else(|| INFO_LINE.captures(body).map(|c| c[1].trim().to_string()))?;

        let direction = banks::detect_direction(body);
        let mut tx = deterministic_transaction(
            email,
            value,
            direction,
            TransactionType::BankTransfer,
            merchant,
        );
        tx.reference = TRANSFER_REFERENCE.captures(body).map(|c| c[1].to_string());

        Some(vec![tx])
    }
}
