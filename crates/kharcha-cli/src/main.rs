//! kharcha CLI - expense tracking from notification emails
//!
//! Usage:
//!   kharcha setup                Authorize mail access, create the store
//!   kharcha sync                 Fetch and extract new transactions
//!   kharcha list --from ...      Browse the ledger
//!   kharcha chat "how much ..."  Ask in plain language

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (warn)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Setup => commands::cmd_setup().await,
        Commands::Sync {
            since,
            skip_categorize,
        } => commands::cmd_sync(since.as_deref(), skip_categorize).await,
        Commands::List {
            from,
            to,
            tx_type,
            category,
            direction,
            bank,
            limit,
            offset,
            review,
        } => commands::cmd_list(
            from.as_deref(),
            to.as_deref(),
            tx_type.as_deref(),
            category,
            direction.as_deref(),
            bank,
            limit,
            offset,
            review,
        ),
        Commands::Summary {
            from,
            to,
            direction,
        } => commands::cmd_summary(from.as_deref(), to.as_deref(), direction.as_deref()),
        Commands::Review => commands::cmd_review(),
        Commands::Recategorize { id, category } => commands::cmd_recategorize(&id, &category),
        Commands::Remerchant { id, name } => commands::cmd_remerchant(&id, &name),
        Commands::Reparse {
            missing,
            skip_categorize,
        } => commands::cmd_reparse(missing, skip_categorize).await,
        Commands::Chat { question } => commands::cmd_chat(question.as_deref()).await,
        Commands::Flag { id, verdict, notes } => {
            commands::cmd_flag(&id, &verdict, notes.as_deref())
        }
    }
}
