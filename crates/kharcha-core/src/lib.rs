//! kharcha core library
//!
//! Turns a bank/card/UPI/mutual-fund notification email stream into a
//! normalized, categorized, deduplicated local ledger:
//! - Gmail ingestion with rate-limit-aware retry
//! - A two-tier parsing pipeline (format parsers, then an LLM fallback)
//! - Categorization with a user-correction feedback loop
//! - SQL + pairwise-LLM duplicate detection
//! - Natural-language queries behind a read-only SQL guard
//! - Derived insights and post-sync alerts
//!
//! All model calls go through one gateway over an opaque external
//! subprocess; all persisted state lives in one SQLite store.

pub mod ai;
pub mod categories;
pub mod categorize;
pub mod config;
pub mod db;
pub mod dedup;
pub mod error;
pub mod gmail;
pub mod insights;
pub mod models;
pub mod nlquery;
pub mod parse;
pub mod pipeline;
pub mod prompts;
pub mod retry;
pub mod review;

pub use ai::{ModelGateway, ModelResponse, OutputFormat, ProcessRunner, StubRunner};
pub use categorize::Categorizer;
pub use config::Config;
pub use db::{Database, QueryRows, TransactionFilter};
pub use dedup::DedupEngine;
pub use error::{Error, Result};
pub use gmail::{GmailClient, MailClient, MailIngestor, SyncOptions};
pub use insights::{Alert, AlertKind, InsightsEngine, Suggestion};
pub use models::{
    Direction, EvalVerdict, NewTransaction, RawEmail, SyncOutcome, Transaction,
    TransactionSource, TransactionType,
};
pub use nlquery::{ChatAnswer, NlQueryEngine};
pub use parse::{AiFallbackParser, EmailParser, ParserRegistry};
pub use pipeline::{ExpensePipeline, PipelineOptions, PipelineReport};
pub use retry::{with_retry, RetryPolicy};
pub use review::ReviewQueue;
