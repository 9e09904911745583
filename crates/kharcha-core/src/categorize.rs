//! Transaction categorization with a user-correction feedback loop
//!
//! Prompts are conditioned on the user's correction history:
//! merchant-keyed corrections first, backfilled with recent ones, so
//! the model treats past adjudications as precedent.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::ai::ModelGateway;
use crate::categories;
use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::models::{CategoryCorrection, NewTransaction};
use crate::prompts;

/// Few-shot budget per prompt
const CORRECTIONS_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
struct CategoryJudgment {
    category: Option<String>,
    confidence: Option<f64>,
}

pub struct Categorizer<'a> {
    db: &'a Database,
    gateway: &'a ModelGateway,
    config: &'a Config,
}

impl<'a> Categorizer<'a> {
    pub fn new(db: &'a Database, gateway: &'a ModelGateway, config: &'a Config) -> Self {
        Self {
            db,
            gateway,
            config,
        }
    }

    /// Categorize one transaction. Failures of any kind yield
    /// `(Other, 0.0)` so the pipeline never stalls on the model.
    pub async fn categorize(&self, tx: &NewTransaction) -> (String, f64) {
        let corrections = match self.gather_corrections(&tx.merchant) {
            Ok(c) => c,
            Err(e) => {
                warn!("Correction lookup failed: {}", e);
                Vec::new()
            }
        };

        let prompt = prompts::categorize(tx, &self.config.categories, &corrections);
        let judgment: Option<CategoryJudgment> = self.gateway.run_json(&prompt).await;
        self.validate(judgment)
    }

    /// Categorize a batch with one model call; on a length mismatch
    /// (or any failure) fall through to per-transaction calls.
    pub async fn categorize_batch(&self, txs: &[NewTransaction]) -> Vec<(String, f64)> {
        if txs.is_empty() {
            return Vec::new();
        }

        let corrections = match self.gather_batch_corrections(txs) {
            Ok(c) => c,
            Err(e) => {
                warn!("Correction lookup failed: {}", e);
                Vec::new()
            }
        };

        let prompt = prompts::categorize_batch(txs, &self.config.categories, &corrections);
        let judgments: Option<Vec<CategoryJudgment>> = self.gateway.run_json(&prompt).await;

        if let Some(list) = judgments {
            if list.len() == txs.len() {
                return list.into_iter().map(|j| self.validate(Some(j))).collect();
            }
            debug!(
                expected = txs.len(),
                got = list.len(),
                "Batch response length mismatch, falling back to single calls"
            );
        }

        let mut out = Vec::with_capacity(txs.len());
        for tx in txs {
            out.push(self.categorize(tx).await);
        }
        out
    }

    /// Merchant-keyed corrections first; if fewer than the budget,
    /// backfill with recent corrections (excluding ids already chosen)
    /// in recency order.
    fn gather_corrections(&self, merchant: &str) -> Result<Vec<CategoryCorrection>> {
        let mut corrections = self
            .db
            .corrections_by_merchant(merchant, CORRECTIONS_LIMIT as i64)?;

        if corrections.len() < CORRECTIONS_LIMIT {
            let seen: Vec<i64> = corrections.iter().map(|c| c.id).collect();
            let recent = self.db.recent_corrections(CORRECTIONS_LIMIT as i64)?;
            for correction in recent {
                if corrections.len() >= CORRECTIONS_LIMIT {
                    break;
                }
                if !seen.contains(&correction.id) {
                    corrections.push(correction);
                }
            }
        }

        Ok(corrections)
    }

    /// Union of per-merchant corrections for the batch, deduped,
    /// capped at twice the single-call budget.
    fn gather_batch_corrections(&self, txs: &[NewTransaction]) -> Result<Vec<CategoryCorrection>> {
        let mut merchants: Vec<&str> = txs.iter().map(|t| t.merchant.as_str()).collect();
        merchants.dedup();

        let mut corrections: Vec<CategoryCorrection> = Vec::new();
        for merchant in merchants {
            for correction in self.gather_corrections(merchant)? {
                if corrections.len() >= CORRECTIONS_LIMIT * 2 {
                    return Ok(corrections);
                }
                if !corrections.iter().any(|c| c.id == correction.id) {
                    corrections.push(correction);
                }
            }
        }
        Ok(corrections)
    }

    /// Validate the label against the closed set and clamp confidence
    fn validate(&self, judgment: Option<CategoryJudgment>) -> (String, f64) {
        let Some(judgment) = judgment else {
            return (categories::OTHER.to_string(), 0.0);
        };
        let Some(label) = judgment
            .category
            .as_deref()
            .and_then(|c| categories::validate(c, &self.config.categories.list))
        else {
            return (categories::OTHER.to_string(), 0.0);
        };

        let confidence = judgment.confidence.unwrap_or(0.0).clamp(0.0, 1.0);
        (label.to_string(), confidence)
    }
}
