//! The two-tier parsing pipeline
//!
//! An ordered chain of deterministic per-format parsers, then an
//! LLM-backed fallback. The dispatch rule that matters: a parser that
//! recognizes an email (`can_parse` true) but fails to extract
//! anything must NOT consume it — the email continues down the chain
//! and ultimately reaches the fallback. Nothing in this module throws
//! for a bad email; an email nobody can parse yields an empty list.

pub mod ai_fallback;
pub mod amount;
pub mod banks;
mod bank_transfer;
mod credit_card;
mod loan;
mod sip;
mod upi;

pub use ai_fallback::AiFallbackParser;
pub use bank_transfer::BankTransferParser;
pub use credit_card::CreditCardParser;
pub use loan::LoanParser;
pub use sip::SipParser;
pub use upi::UpiParser;

use std::panic::AssertUnwindSafe;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, warn};

use crate::models::{NewTransaction, RawEmail};

/// A deterministic per-format parser.
///
/// `parse` returning None or an empty list means "not mine after all";
/// the pipeline keeps going either way.
pub trait EmailParser: Send + Sync {
    fn name(&self) -> &'static str;
    fn can_parse(&self, email: &RawEmail) -> bool;
    fn parse(&self, email: &RawEmail) -> Option<Vec<NewTransaction>>;
}

/// Ordered parser chain plus the optional AI fallback
pub struct ParserRegistry {
    parsers: Vec<Box<dyn EmailParser>>,
    fallback: Option<AiFallbackParser>,
}

impl ParserRegistry {
    pub fn new(parsers: Vec<Box<dyn EmailParser>>, fallback: Option<AiFallbackParser>) -> Self {
        Self { parsers, fallback }
    }

    /// The shipped wiring: five format parsers, then the fallback.
    ///
    /// An all-AI pipeline is the same registry with an empty parser
    /// list; it is an operational mode, not the default.
    pub fn with_default_parsers(fallback: Option<AiFallbackParser>) -> Self {
        Self::new(
            vec![
                Box::new(UpiParser),
                Box::new(CreditCardParser),
                Box::new(BankTransferParser),
                Box::new(SipParser),
                Box::new(LoanParser),
            ],
            fallback,
        )
    }

    /// Dispatch one email through the chain.
    ///
    /// A parser panic is contained and treated exactly like a None
    /// return, so one bad regex path cannot drop an email.
    pub async fn parse_email(&self, email: &RawEmail) -> Vec<NewTransaction> {
        for parser in &self.parsers {
            if !parser.can_parse(email) {
                continue;
            }
            let outcome =
                std::panic::catch_unwind(AssertUnwindSafe(|| parser.parse(email)));
            match outcome {
                Ok(Some(txs)) if !txs.is_empty() => {
                    debug!(parser = parser.name(), count = txs.len(), "Parsed email");
                    return txs;
                }
                Ok(_) => {
                    debug!(
                        parser = parser.name(),
                        message_id = %email.message_id,
                        "Parser claimed email but extracted nothing, escalating"
                    );
                }
                Err(_) => {
                    warn!(
                        parser = parser.name(),
                        message_id = %email.message_id,
                        "Parser panicked, escalating"
                    );
                }
            }
        }

        if let Some(fallback) = &self.fallback {
            if let Some(txs) = fallback.parse(email).await {
                if !txs.is_empty() {
                    debug!(count = txs.len(), "Fallback parsed email");
                    return txs;
                }
            }
        }

        debug!(message_id = %email.message_id, "Email is unparseable");
        Vec::new()
    }
}

static ACCOUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:a/c|acct|account|card)\s*(?:no\.?|number)?\s*(?:ending(?:\s+in)?)?\s*[:#]?\s*[Xx\*]*(\d{3,6})",
    )
    .unwrap()
});

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4}-\d{2}-\d{2}|\d{1,2}[-/]\d{1,2}[-/]\d{2,4})\b").unwrap()
});

/// Masked account number, normalized to `**NNNN`
pub(crate) fn capture_account(text: &str) -> Option<String> {
    ACCOUNT_PATTERN
        .captures(text)
        .map(|c| format!("**{}", &c[1]))
}

/// First in-body date, tried against the formats these emails use
pub(crate) fn capture_date(text: &str) -> Option<NaiveDate> {
    let token = DATE_PATTERN.captures(text)?.get(1)?.as_str();
    parse_date_token(token)
}

pub(crate) fn parse_date_token(token: &str) -> Option<NaiveDate> {
    let formats = [
        "%Y-%m-%d", // 2025-01-15
        "%d-%m-%Y", // 15-01-2025
        "%d/%m/%Y", // 15/01/2025
        "%d-%m-%y", // 15-01-25
        "%d/%m/%y", // 15/01/25
    ];
    formats
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(token, f).ok())
}

/// Skeleton transaction for the deterministic tier: fresh id,
/// `source = regex`, no review flag, account/bank/date pulled from the
/// email where detectable.
pub(crate) fn deterministic_transaction(
    email: &RawEmail,
    amount: f64,
    direction: crate::models::Direction,
    tx_type: crate::models::TransactionType,
    merchant: String,
) -> NewTransaction {
    NewTransaction {
        id: crate::models::new_transaction_id(),
        email_message_id: email.message_id.clone(),
        date: capture_date(&email.body_text).unwrap_or_else(|| email.date.date_naive()),
        amount,
        currency: "INR".to_string(),
        direction,
        tx_type,
        merchant,
        account: capture_account(&email.body_text).unwrap_or_else(|| "unknown".to_string()),
        bank: banks::detect_bank(&email.from, &email.subject, &email.body_text)
            .unwrap_or("unknown")
            .to_string(),
        reference: None,
        description: Some(email.subject.clone()),
        category: None,
        source: crate::models::TransactionSource::Regex,
        confidence: None,
        needs_review: false,
    }
}

#[cfg(test)]
pub(crate) fn test_email(subject: &str, body: &str) -> RawEmail {
    use chrono::{TimeZone, Utc};
    RawEmail {
        message_id: "test-email".to_string(),
        from: "alerts@hdfcbank.net".to_string(),
        subject: subject.to_string(),
        date: Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap(),
        body_text: body.to_string(),
        body_html: None,
        fetched_at: Utc::now(),
    }
}
