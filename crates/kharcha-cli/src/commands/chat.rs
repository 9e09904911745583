//! Natural-language chat over the ledger

use std::io::Write;

use anyhow::Result;
use kharcha_core::{ChatAnswer, Config, NlQueryEngine};

pub async fn cmd_chat(question: Option<&str>) -> Result<()> {
    let cfg = Config::load()?;
    let db = super::open_db(&cfg)?;
    let gateway = super::gateway(&cfg);

    if !gateway.available().await {
        println!(
            "❌ Model binary '{}' is not available; chat needs it.",
            cfg.model_bin()
        );
        anyhow::bail!("model unavailable");
    }

    let engine = NlQueryEngine::new(&db, &gateway);

    if let Some(question) = question {
        let answer = engine.ask(question).await;
        print_answer(&answer);
        return Ok(());
    }

    println!();
    println!("💬 Ask about your spending (empty line or 'exit' to quit)");
    let stdin = std::io::stdin();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() || line == "exit" || line == "quit" {
            break;
        }

        let answer = engine.ask(line).await;
        print_answer(&answer);
    }

    Ok(())
}

fn print_answer(answer: &ChatAnswer) {
    println!();
    println!("{}", answer.answer);
    if let Some(error) = &answer.error {
        println!("   ({})", error);
    }
    if let Some(sql) = &answer.sql {
        tracing::debug!(%sql, "Query behind the answer");
    }
    println!();
}
