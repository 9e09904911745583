//! Cross-email duplicate detection
//!
//! SQL narrows the field to same-amount, same-direction pairs from
//! different emails within a date tolerance; the model makes the
//! pairwise call. The UNIQUE constraint on `duplicate_transaction_id`
//! makes re-runs no-ops.

use serde::Deserialize;
use tracing::{debug, info};

use crate::ai::ModelGateway;
use crate::db::Database;
use crate::error::Result;
use crate::prompts;

#[derive(Debug, Deserialize)]
struct DuplicateJudgment {
    #[serde(rename = "isDuplicate")]
    is_duplicate: bool,
    confidence: Option<f64>,
}

pub struct DedupEngine<'a> {
    db: &'a Database,
    gateway: &'a ModelGateway,
    tolerance_days: i64,
}

impl<'a> DedupEngine<'a> {
    pub fn new(db: &'a Database, gateway: &'a ModelGateway, tolerance_days: i64) -> Self {
        Self {
            db,
            gateway,
            tolerance_days,
        }
    }

    /// Confirm candidate pairs and record groups.
    ///
    /// When `new_ids` is given, only pairs touching that set are
    /// considered. Returns the number of groups newly recorded.
    pub async fn run(&self, new_ids: Option<&[String]>) -> Result<usize> {
        let candidates = self.db.duplicate_candidates(self.tolerance_days, new_ids)?;
        debug!(candidates = candidates.len(), "Dedup candidates selected");

        let mut recorded = 0;
        for (kept, candidate) in &candidates {
            // Pair ordering by id is canonical: the later id is the
            // one that gets marked
            if self.db.is_recorded_duplicate(&candidate.id)? {
                continue;
            }

            let prompt = prompts::dedup_judgment(kept, candidate);
            let judgment: Option<DuplicateJudgment> = self.gateway.run_json(&prompt).await;
            let Some(judgment) = judgment else {
                continue;
            };
            if !judgment.is_duplicate {
                continue;
            }

            let reason = format!(
                "Same {:.2} {} within {} day(s) of {}",
                candidate.amount, candidate.direction, self.tolerance_days, kept.id
            );
            if self
                .db
                .mark_as_duplicate(&candidate.id, &kept.id, &reason, judgment.confidence)?
            {
                recorded += 1;
            }
        }

        if recorded > 0 {
            info!(recorded, "Duplicate groups recorded");
        }
        Ok(recorded)
    }
}
