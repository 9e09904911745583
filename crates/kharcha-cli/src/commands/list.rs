//! List and summary commands

use std::collections::BTreeMap;

use anyhow::Result;
use kharcha_core::{Config, Direction, TransactionFilter};

#[allow(clippy::too_many_arguments)]
pub fn cmd_list(
    from: Option<&str>,
    to: Option<&str>,
    tx_type: Option<&str>,
    category: Option<String>,
    direction: Option<&str>,
    bank: Option<String>,
    limit: i64,
    offset: i64,
    review: bool,
) -> Result<()> {
    let cfg = Config::load()?;
    let db = super::open_db(&cfg)?;

    let tx_type = tx_type
        .map(|t| t.parse().map_err(anyhow::Error::msg))
        .transpose()?;
    let direction = direction
        .map(|d| d.parse().map_err(anyhow::Error::msg))
        .transpose()?;

    let filter = TransactionFilter::new()
        .start_date(from.map(super::parse_date_arg).transpose()?)
        .end_date(to.map(super::parse_date_arg).transpose()?)
        .tx_type(tx_type)
        .category(category)
        .direction(direction)
        .bank(bank)
        .needs_review(review.then_some(true))
        .limit(limit)
        .offset(offset);

    let transactions = db.list_transactions(&filter)?;
    let total = db.count_transactions(&filter)?;

    if transactions.is_empty() {
        println!("No transactions found. Run 'kharcha sync' to pull new emails.");
        return Ok(());
    }

    println!();
    println!("📒 Transactions ({} matching)", total);
    println!("   ──────────────────────────────────────────────────────────────");
    for tx in &transactions {
        super::print_transaction_line(tx);
        println!(
            "     id {} │ {} │ {}",
            tx.id,
            tx.bank,
            tx.category.as_deref().unwrap_or("uncategorized")
        );
    }

    Ok(())
}

pub fn cmd_summary(from: Option<&str>, to: Option<&str>, direction: Option<&str>) -> Result<()> {
    let cfg = Config::load()?;
    let db = super::open_db(&cfg)?;

    let direction: Option<Direction> = direction
        .map(|d| d.parse().map_err(anyhow::Error::msg))
        .transpose()?;

    let filter = TransactionFilter::new()
        .start_date(from.map(super::parse_date_arg).transpose()?)
        .end_date(to.map(super::parse_date_arg).transpose()?)
        .direction(direction);

    let transactions = db.list_transactions(&filter)?;
    if transactions.is_empty() {
        println!("Nothing in that window.");
        return Ok(());
    }

    let mut debit_total = 0.0;
    let mut credit_total = 0.0;
    let mut by_category: BTreeMap<String, f64> = BTreeMap::new();
    for tx in &transactions {
        match tx.direction {
            Direction::Debit => {
                debit_total += tx.amount;
                *by_category
                    .entry(
                        tx.category
                            .clone()
                            .unwrap_or_else(|| "uncategorized".to_string()),
                    )
                    .or_insert(0.0) += tx.amount;
            }
            Direction::Credit => credit_total += tx.amount,
        }
    }

    println!();
    println!("💰 Summary ({} transactions)", transactions.len());
    println!("   ──────────────────────────────────────────────");
    println!("   Money out   \x1b[31m₹{:>12.2}\x1b[0m", debit_total);
    println!("   Money in    \x1b[32m₹{:>12.2}\x1b[0m", credit_total);

    if !by_category.is_empty() {
        println!();
        println!("   Spending by category:");
        let mut categories: Vec<(String, f64)> = by_category.into_iter().collect();
        categories.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        for (category, total) in categories {
            println!("   {:<16} ₹{:>12.2}", category, total);
        }
    }

    Ok(())
}
