//! Gmail ingestion: query construction, REST client, auth, and the
//! sync protocol
//!
//! Access is read-only. Every network call is wrapped in the retry
//! controller by the ingestor; the client maps provider rate limits
//! to `Error::RateLimited` so the retry predicate can see them.

mod auth;
mod client;
mod message;
mod sync;

pub use auth::ensure_access_token;
pub use client::{GmailClient, MailClient};
pub use message::{GmailMessage, MessageList, MessageRef};
pub use sync::{MailIngestor, SyncOptions};

use chrono::NaiveDate;

use crate::config::GmailConfig;

/// Build the provider search query: OR within each allow-list, AND
/// across lists, optionally narrowed by an `after:` date.
pub fn build_query(config: &GmailConfig, after: Option<NaiveDate>) -> String {
    let mut clauses = Vec::new();

    if !config.senders.is_empty() {
        let froms: Vec<String> = config
            .senders
            .iter()
            .map(|s| format!("from:{}", s))
            .collect();
        clauses.push(format!("({})", froms.join(" OR ")));
    }

    if !config.subject_keywords.is_empty() {
        let subjects: Vec<String> = config
            .subject_keywords
            .iter()
            .map(|k| format!("subject:{}", k))
            .collect();
        clauses.push(format!("({})", subjects.join(" OR ")));
    }

    if let Some(date) = after {
        clauses.push(format!("after:{}", date.format("%Y/%m/%d")));
    }

    clauses.join(" ")
}
