//! Interactive review plus the direct override commands

use std::io::Write;

use anyhow::Result;
use kharcha_core::{Config, EvalVerdict, ReviewQueue};

/// Interactive adjudication: a = accept, c <cat> = correct the
/// category, s = skip, q = quit.
pub fn cmd_review() -> Result<()> {
    let cfg = Config::load()?;
    let db = super::open_db(&cfg)?;
    let queue = ReviewQueue::new(&db);

    let pending = queue.list(None)?;
    if pending.is_empty() {
        println!("Review queue is empty. ✅");
        return Ok(());
    }

    println!();
    println!("🔎 {} transaction(s) to review", pending.len());
    println!("   a = accept, c <category> = correct, s = skip, q = quit");
    println!();

    let stdin = std::io::stdin();
    for tx in &pending {
        super::print_transaction_line(tx);
        println!(
            "     id {} │ {} │ {} │ confidence {}",
            tx.id,
            tx.bank,
            tx.category.as_deref().unwrap_or("uncategorized"),
            tx.confidence
                .map(|c| format!("{:.2}", c))
                .unwrap_or_else(|| "-".to_string()),
        );

        loop {
            print!("   > ");
            std::io::stdout().flush()?;
            let mut line = String::new();
            if stdin.read_line(&mut line)? == 0 {
                return Ok(());
            }
            let line = line.trim();

            match line {
                "a" => {
                    queue.resolve(&tx.id, None)?;
                    println!("   ✅ accepted");
                    break;
                }
                "s" => break,
                "q" => return Ok(()),
                _ => {
                    if let Some(category) = line.strip_prefix("c ") {
                        let category = category.trim();
                        if category.is_empty() {
                            println!("   usage: c <category>");
                            continue;
                        }
                        queue.resolve(&tx.id, Some(category))?;
                        println!("   ✅ recorded as {}", category);
                        break;
                    }
                    println!("   a = accept, c <category> = correct, s = skip, q = quit");
                }
            }
        }
    }

    println!();
    println!("Done. {} left in the queue.", queue.count()?);
    Ok(())
}

pub fn cmd_recategorize(id: &str, category: &str) -> Result<()> {
    let cfg = Config::load()?;
    let db = super::open_db(&cfg)?;

    ReviewQueue::new(&db).recategorize(id, category)?;
    println!("✅ Transaction {} recategorized as {}.", id, category);
    println!("   The correction will guide future categorization.");
    Ok(())
}

pub fn cmd_remerchant(id: &str, name: &str) -> Result<()> {
    let cfg = Config::load()?;
    let db = super::open_db(&cfg)?;

    db.update_transaction_merchant(id, name)?;
    println!("✅ Transaction {} merchant set to {}.", id, name);
    Ok(())
}

pub fn cmd_flag(id: &str, verdict: &str, notes: Option<&str>) -> Result<()> {
    let cfg = Config::load()?;
    let db = super::open_db(&cfg)?;

    let verdict: EvalVerdict = verdict.parse().map_err(anyhow::Error::msg)?;
    db.insert_eval_flag(id, verdict, notes)?;
    println!("✅ Flagged {} as {}.", id, verdict);
    Ok(())
}
