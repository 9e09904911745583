//! Command implementations

mod chat;
mod list;
mod review;
mod setup;
mod sync;

pub use chat::cmd_chat;
pub use list::{cmd_list, cmd_summary};
pub use review::{cmd_flag, cmd_recategorize, cmd_remerchant, cmd_review};
pub use setup::cmd_setup;
pub use sync::{cmd_reparse, cmd_sync};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use kharcha_core::{Config, Database, ModelGateway, Transaction};

/// Open (or create) the store at the configured path
pub(crate) fn open_db(config: &Config) -> Result<Database> {
    let path = config.db_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Database::new(path.to_string_lossy().as_ref())
        .with_context(|| format!("Failed to open store at {}", path.display()))
}

pub(crate) fn gateway(config: &Config) -> ModelGateway {
    ModelGateway::new(&config.model_bin())
}

pub(crate) fn parse_date_arg(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}' (use YYYY-MM-DD)", raw))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

/// Signed, colored amount: red for debits, green for credits
pub(crate) fn fmt_amount(tx: &Transaction) -> String {
    match tx.direction {
        kharcha_core::Direction::Debit => format!("\x1b[31m-₹{:.2}\x1b[0m", tx.amount),
        kharcha_core::Direction::Credit => format!("\x1b[32m+₹{:.2}\x1b[0m", tx.amount),
    }
}

pub(crate) fn print_transaction_line(tx: &Transaction) {
    let review_marker = if tx.needs_review { " ⚠" } else { "" };
    println!(
        "   {} │ {:>14} │ {:<12} │ {}{}",
        tx.date,
        fmt_amount(tx),
        tx.tx_type,
        truncate(&tx.merchant, 32),
        review_marker
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_arg() {
        assert_eq!(
            parse_date_arg("2025-01-15").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
        );
        assert!(parse_date_arg("15/01/2025").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long merchant name", 10), "a very lo…");
    }
}
