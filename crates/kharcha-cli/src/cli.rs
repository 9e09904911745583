//! CLI argument definitions using clap
//!
//! This module contains the clap structs and enums for parsing CLI
//! arguments. The command implementations live in `commands`.

use clap::{Parser, Subcommand};

/// kharcha - a personal expense tracker fed by your notification emails
#[derive(Parser)]
#[command(name = "kharcha")]
#[command(about = "Track expenses from bank/card/UPI notification emails", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Authorize mail access and initialize the local store
    Setup,

    /// Fetch new notification emails and extract transactions
    Sync {
        /// Sync emails after this date (YYYY-MM-DD); wins over the stored cursor
        #[arg(long)]
        since: Option<String>,

        /// Skip AI categorization of new transactions
        #[arg(long)]
        skip_categorize: bool,
    },

    /// List transactions
    List {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Transaction type: upi, credit_card, bank_transfer, sip, loan
        #[arg(long = "type")]
        tx_type: Option<String>,

        /// Category filter
        #[arg(long)]
        category: Option<String>,

        /// Direction filter: debit or credit
        #[arg(long)]
        direction: Option<String>,

        /// Bank filter
        #[arg(long)]
        bank: Option<String>,

        /// Max rows to print
        #[arg(long, default_value = "50")]
        limit: i64,

        /// Rows to skip
        #[arg(long, default_value = "0")]
        offset: i64,

        /// Only rows waiting for review
        #[arg(long)]
        review: bool,
    },

    /// Spending summary for a date window
    Summary {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Direction filter: debit or credit
        #[arg(long)]
        direction: Option<String>,
    },

    /// Review low-confidence and duplicate-flagged transactions
    Review,

    /// Change a transaction's category (teaches the categorizer)
    Recategorize {
        /// Transaction id
        id: String,
        /// New category
        category: String,
    },

    /// Change a transaction's merchant
    Remerchant {
        /// Transaction id
        id: String,
        /// New merchant name
        name: String,
    },

    /// Re-run the parsing pipeline over stored emails
    Reparse {
        /// Only emails that never produced a transaction
        #[arg(long)]
        missing: bool,

        /// Skip AI categorization
        #[arg(long)]
        skip_categorize: bool,
    },

    /// Ask questions about your spending in plain language
    Chat {
        /// One-shot question; omit for an interactive session
        question: Option<String>,
    },

    /// Record a ground-truth verdict on an extracted transaction
    Flag {
        /// Transaction id
        id: String,
        /// Verdict: correct or wrong
        verdict: String,
        /// Optional notes
        #[arg(long)]
        notes: Option<String>,
    },
}
