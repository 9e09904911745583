//! Sync and reparse commands

use anyhow::Result;
use chrono::Utc;
use kharcha_core::{
    config, gmail, AiFallbackParser, Config, ExpensePipeline, GmailClient, InsightsEngine,
    MailIngestor, ParserRegistry, PipelineOptions, SyncOptions,
};

pub async fn cmd_sync(since: Option<&str>, skip_categorize: bool) -> Result<()> {
    let cfg = Config::load()?;
    let db = super::open_db(&cfg)?;
    let gateway = super::gateway(&cfg);

    let model_available = gateway.available().await;
    if !model_available {
        println!(
            "⚠  Model binary '{}' unavailable; continuing without AI extraction or categorization.",
            cfg.model_bin()
        );
    }

    let since = since.map(super::parse_date_arg).transpose()?;

    let token = gmail::ensure_access_token(&config::data_dir(), &cfg.gmail).await?;
    let client = GmailClient::new(token);

    println!();
    println!("📬 Syncing notification emails...");
    let outcome = MailIngestor::new(&db, &client, &cfg)
        .sync(&SyncOptions { since })
        .await?;
    println!(
        "   {} matched, {} new email(s) stored",
        outcome.messages_found, outcome.new_emails_stored
    );

    let fallback = model_available
        .then(|| AiFallbackParser::new(gateway.clone(), cfg.parser.clone()));
    let registry = ParserRegistry::with_default_parsers(fallback);
    let pipeline = ExpensePipeline::new(&db, &registry, &gateway, &cfg);

    let report = pipeline
        .process_emails(
            &outcome.new_message_ids,
            &PipelineOptions {
                skip_categorize: skip_categorize || !model_available,
            },
        )
        .await?;

    println!(
        "   {} transaction(s) extracted, {} email(s) unparseable, {} duplicate(s) flagged",
        report.transactions_created, report.unparseable_emails, report.duplicates_flagged
    );

    let alerts = InsightsEngine::new(&db, &cfg.alerts).post_sync_alerts(Utc::now().date_naive())?;
    if !alerts.is_empty() {
        println!();
        println!("🔔 Alerts");
        for alert in &alerts {
            println!("   [{}] {}", alert.kind.as_str(), alert.message);
        }
    }

    let review_count = db.review_count()?;
    if review_count > 0 {
        println!();
        println!(
            "   {} transaction(s) waiting for review. Run 'kharcha review'.",
            review_count
        );
    }

    Ok(())
}

pub async fn cmd_reparse(missing: bool, skip_categorize: bool) -> Result<()> {
    let cfg = Config::load()?;
    let db = super::open_db(&cfg)?;
    let gateway = super::gateway(&cfg);

    let model_available = gateway.available().await;
    if !model_available {
        println!(
            "⚠  Model binary '{}' unavailable; reparsing with format parsers only.",
            cfg.model_bin()
        );
    }

    let fallback = model_available
        .then(|| AiFallbackParser::new(gateway.clone(), cfg.parser.clone()));
    let registry = ParserRegistry::with_default_parsers(fallback);
    let pipeline = ExpensePipeline::new(&db, &registry, &gateway, &cfg);

    println!();
    if missing {
        println!("🔁 Reparsing emails that produced no transactions...");
    } else {
        println!("🔁 Reparsing all stored emails...");
    }

    let report = pipeline
        .reparse(
            missing,
            &PipelineOptions {
                skip_categorize: skip_categorize || !model_available,
            },
        )
        .await?;

    println!(
        "   {} email(s) processed, {} new transaction(s), {} still unparseable",
        report.emails_processed, report.transactions_created, report.unparseable_emails
    );
    Ok(())
}
