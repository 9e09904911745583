//! LLM fallback parser
//!
//! Last tier of the pipeline: everything the deterministic parsers
//! could not claim (or claimed and failed on) lands here. The model's
//! output is validated field by field and coerced into the closed
//! enums; a transaction that survives validation is marked
//! `source = ai` and queued for review when confidence is low.

use serde::Deserialize;
use tracing::debug;

use super::amount;
use crate::ai::ModelGateway;
use crate::config::ParserConfig;
use crate::models::{
    new_transaction_id, Direction, NewTransaction, RawEmail, TransactionSource, TransactionType,
};
use crate::prompts;

#[derive(Debug, Deserialize)]
struct FallbackResponse {
    #[serde(default)]
    transactions: Vec<FallbackEntry>,
}

#[derive(Debug, Deserialize)]
struct FallbackEntry {
    /// Number or currency string; validated below
    amount: Option<serde_json::Value>,
    direction: Option<String>,
    #[serde(rename = "type")]
    tx_type: Option<String>,
    merchant: Option<String>,
    account: Option<String>,
    bank: Option<String>,
    reference: Option<String>,
    description: Option<String>,
    date: Option<String>,
    confidence: Option<f64>,
}

pub struct AiFallbackParser {
    gateway: ModelGateway,
    config: ParserConfig,
}

impl AiFallbackParser {
    pub fn new(gateway: ModelGateway, config: ParserConfig) -> Self {
        Self { gateway, config }
    }

    /// Ask the model to extract transactions from the email.
    ///
    /// None means the model was unavailable or its output did not
    /// normalize; the email then counts as unparseable upstream.
    pub async fn parse(&self, email: &RawEmail) -> Option<Vec<NewTransaction>> {
        let prompt = prompts::fallback_parse(email, self.config.body_truncation_limit);
        let response: FallbackResponse = self.gateway.run_json(&prompt).await?;

        let txs: Vec<NewTransaction> = response
            .transactions
            .into_iter()
            .filter_map(|entry| self.validate_entry(entry, email))
            .collect();

        debug!(
            message_id = %email.message_id,
            count = txs.len(),
            "Fallback extraction complete"
        );
        Some(txs)
    }

    fn validate_entry(&self, entry: FallbackEntry, email: &RawEmail) -> Option<NewTransaction> {
        let value = match entry.amount? {
            serde_json::Value::Number(n) => n.as_f64().filter(|v| v.is_finite() && *v > 0.0)?,
            serde_json::Value::String(s) => amount::normalize_amount(&s)?,
            _ => return None,
        };

        // Invalid enum values coerce to the defaults rather than
        // dropping the transaction
        let direction = entry
            .direction
            .as_deref()
            .and_then(|d| d.parse().ok())
            .unwrap_or(Direction::Debit);
        let tx_type = entry
            .tx_type
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or(TransactionType::BankTransfer);

        let confidence = entry.confidence.unwrap_or(0.5).clamp(0.0, 1.0);
        let date = entry
            .date
            .as_deref()
            .and_then(super::parse_date_token)
            .unwrap_or_else(|| email.date.date_naive());

        Some(NewTransaction {
            id: new_transaction_id(),
            email_message_id: email.message_id.clone(),
            date,
            amount: value,
            currency: "INR".to_string(),
            direction,
            tx_type,
            merchant: entry
                .merchant
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            account: entry.account.unwrap_or_else(|| "unknown".to_string()),
            bank: entry.bank.unwrap_or_else(|| "unknown".to_string()),
            reference: entry.reference,
            description: entry.description,
            category: None,
            source: TransactionSource::Ai,
            confidence: Some(confidence),
            needs_review: confidence < self.config.confidence_threshold,
        })
    }
}
