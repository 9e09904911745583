//! Domain models for kharcha

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A raw notification email as fetched from the provider.
///
/// Created once per unique `message_id`, never mutated, and never
/// deleted while a transaction references it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEmail {
    /// Opaque provider message id (primary key)
    pub message_id: String,
    pub from: String,
    pub subject: String,
    /// Send time of the email
    pub date: DateTime<Utc>,
    pub body_text: String,
    pub body_html: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Money direction relative to the user's account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Money leaving the user's account
    Debit,
    /// Money entering the user's account
    Credit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of payment rail the transaction moved over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Instant peer/merchant push payment (UPI)
    Upi,
    CreditCard,
    /// NEFT/RTGS/IMPS-class account transfer
    BankTransfer,
    /// Recurring mutual-fund purchase
    Sip,
    /// EMI / loan repayment debit
    Loan,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upi => "upi",
            Self::CreditCard => "credit_card",
            Self::BankTransfer => "bank_transfer",
            Self::Sip => "sip",
            Self::Loan => "loan",
        }
    }

    pub fn all() -> &'static [TransactionType] {
        &[
            Self::Upi,
            Self::CreditCard,
            Self::BankTransfer,
            Self::Sip,
            Self::Loan,
        ]
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "upi" => Ok(Self::Upi),
            "credit_card" | "creditcard" | "card" => Ok(Self::CreditCard),
            "bank_transfer" | "banktransfer" | "transfer" => Ok(Self::BankTransfer),
            "sip" | "mutual_fund" => Ok(Self::Sip),
            "loan" | "emi" => Ok(Self::Loan),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a transaction was extracted from its email
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionSource {
    /// Deterministic per-format parser
    #[default]
    Regex,
    /// LLM fallback parser
    Ai,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regex => "regex",
            Self::Ai => "ai",
        }
    }
}

impl std::str::FromStr for TransactionSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "regex" => Ok(Self::Regex),
            "ai" => Ok(Self::Ai),
            _ => Err(format!("Unknown transaction source: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A normalized ledger transaction extracted from one email
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Locally generated unique token
    pub id: String,
    /// Email this transaction was extracted from
    pub email_message_id: String,
    pub date: NaiveDate,
    /// Always positive; sign is carried by `direction`
    pub amount: f64,
    /// ISO 4217 code, default INR
    pub currency: String,
    pub direction: Direction,
    pub tx_type: TransactionType,
    pub merchant: String,
    /// Masked account identifier, or "unknown"
    pub account: String,
    /// Issuing bank, or "unknown"
    pub bank: String,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub source: TransactionSource,
    /// In [0, 1]; present iff `source = ai`
    pub confidence: Option<f64>,
    pub needs_review: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A transaction produced by the parsing pipeline, before insertion
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub id: String,
    pub email_message_id: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub currency: String,
    pub direction: Direction,
    pub tx_type: TransactionType,
    pub merchant: String,
    pub account: String,
    pub bank: String,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub source: TransactionSource,
    pub confidence: Option<f64>,
    pub needs_review: bool,
}

/// Generate a fresh transaction id token
pub fn new_transaction_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// An append-only record of a user category correction.
///
/// Reused as few-shot conditioning by the categorizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCorrection {
    pub id: i64,
    pub merchant: String,
    pub description: Option<String>,
    pub original_category: String,
    pub corrected_category: String,
    pub created_at: DateTime<Utc>,
}

/// A confirmed duplicate relationship between two transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub id: i64,
    pub kept_transaction_id: String,
    /// A transaction can be the duplicate of at most one other
    pub duplicate_transaction_id: String,
    pub reason: String,
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// User-supplied ground-truth verdict on an extracted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalVerdict {
    Correct,
    Wrong,
}

impl EvalVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Wrong => "wrong",
        }
    }
}

impl std::str::FromStr for EvalVerdict {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "correct" => Ok(Self::Correct),
            "wrong" => Ok(Self::Wrong),
            _ => Err(format!("Unknown eval verdict: {}", s)),
        }
    }
}

impl std::fmt::Display for EvalVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An eval flag row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalFlag {
    pub id: i64,
    pub transaction_id: String,
    pub verdict: EvalVerdict,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Result of one ingestion run
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    /// Message ids matched by the provider query
    pub messages_found: usize,
    /// Raw emails newly persisted this run
    pub new_emails_stored: usize,
    /// Ids of the newly persisted emails, in listing order
    pub new_message_ids: Vec<String>,
    pub sync_timestamp: Option<DateTime<Utc>>,
}
