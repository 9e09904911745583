//! Post-sync processing: parse, categorize, persist, deduplicate
//!
//! Takes the message ids a sync (or reparse) produced and runs them
//! through the pipeline in order: raw email -> parser chain ->
//! categorizer -> store -> dedup. The same path serves the
//! non-destructive reparse commands, which is why it works from
//! message ids rather than from the sync outcome directly.

use tracing::{info, warn};

use crate::ai::ModelGateway;
use crate::categorize::Categorizer;
use crate::config::Config;
use crate::db::Database;
use crate::dedup::DedupEngine;
use crate::error::Result;
use crate::parse::ParserRegistry;

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Leave categories empty (sync --skip-categorize)
    pub skip_categorize: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub emails_processed: usize,
    pub transactions_created: usize,
    pub unparseable_emails: usize,
    pub duplicates_flagged: usize,
}

pub struct ExpensePipeline<'a> {
    db: &'a Database,
    registry: &'a ParserRegistry,
    gateway: &'a ModelGateway,
    config: &'a Config,
}

impl<'a> ExpensePipeline<'a> {
    pub fn new(
        db: &'a Database,
        registry: &'a ParserRegistry,
        gateway: &'a ModelGateway,
        config: &'a Config,
    ) -> Self {
        Self {
            db,
            registry,
            gateway,
            config,
        }
    }

    /// Run the given raw emails through parse -> categorize -> persist,
    /// then dedup restricted to the transactions this run attempted.
    pub async fn process_emails(
        &self,
        message_ids: &[String],
        options: &PipelineOptions,
    ) -> Result<PipelineReport> {
        let emails = self.db.get_raw_emails(message_ids)?;
        let categorizer = Categorizer::new(self.db, self.gateway, self.config);

        let mut report = PipelineReport::default();
        let mut attempted_ids: Vec<String> = Vec::new();

        for email in &emails {
            report.emails_processed += 1;

            let mut txs = self.registry.parse_email(email).await;
            if txs.is_empty() {
                report.unparseable_emails += 1;
                warn!(message_id = %email.message_id, "No parser produced a transaction");
                continue;
            }

            if !options.skip_categorize {
                let judgments = categorizer.categorize_batch(&txs).await;
                for (tx, (category, _confidence)) in txs.iter_mut().zip(judgments) {
                    tx.category = Some(category);
                }
            }

            report.transactions_created += self.db.insert_transactions(&txs)?;
            attempted_ids.extend(txs.iter().map(|t| t.id.clone()));
        }

        if !attempted_ids.is_empty() {
            let dedup = DedupEngine::new(
                self.db,
                self.gateway,
                self.config.dedup.date_tolerance_days,
            );
            report.duplicates_flagged = dedup.run(Some(&attempted_ids)).await?;
        }

        info!(
            emails = report.emails_processed,
            transactions = report.transactions_created,
            unparseable = report.unparseable_emails,
            duplicates = report.duplicates_flagged,
            "Pipeline pass complete"
        );
        Ok(report)
    }

    /// Reparse emails that never produced a transaction (`--missing`),
    /// or every stored email.
    pub async fn reparse(
        &self,
        missing_only: bool,
        options: &PipelineOptions,
    ) -> Result<PipelineReport> {
        let ids = if missing_only {
            self.db
                .list_unparsed_emails()?
                .into_iter()
                .map(|e| e.message_id)
                .collect()
        } else {
            self.db.list_raw_email_ids()?
        };
        self.process_emails(&ids, options).await
    }
}
