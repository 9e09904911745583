//! The human review queue
//!
//! Rows with `needs_review = true` (low-confidence AI parses and
//! dedup-flagged duplicates) wait here for adjudication. Resolving a
//! row clears the flag; when the adjudication changed the category, a
//! correction is recorded so the categorizer learns from it.

use tracing::info;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Transaction, TransactionSource};

pub struct ReviewQueue<'a> {
    db: &'a Database,
}

impl<'a> ReviewQueue<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Queue contents, optionally restricted by extraction source
    pub fn list(&self, source: Option<TransactionSource>) -> Result<Vec<Transaction>> {
        self.db.review_queue(source)
    }

    pub fn count(&self) -> Result<i64> {
        self.db.review_count()
    }

    /// Accept a row as-is (or with a new category) and clear its flag
    pub fn resolve(&self, tx_id: &str, new_category: Option<&str>) -> Result<()> {
        if let Some(category) = new_category {
            self.recategorize(tx_id, category)?;
        }
        self.db.update_transaction_review(tx_id, false)?;
        info!(tx_id, "Review resolved");
        Ok(())
    }

    /// Change a transaction's category and record the correction so
    /// future categorization prompts carry it.
    pub fn recategorize(&self, tx_id: &str, new_category: &str) -> Result<()> {
        let tx = self
            .db
            .get_transaction(tx_id)?
            .ok_or_else(|| Error::NotFound(format!("Transaction {}", tx_id)))?;

        let original = tx.category.as_deref().unwrap_or(crate::categories::OTHER);
        if original != new_category {
            self.db.insert_category_correction(
                &tx.merchant,
                original,
                new_category,
                tx.description.as_deref(),
            )?;
        }
        self.db.update_transaction_category(tx_id, new_category)?;
        Ok(())
    }
}
