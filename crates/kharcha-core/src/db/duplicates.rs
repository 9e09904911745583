//! Duplicate group operations and candidate-pair selection

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{DuplicateGroup, Transaction};

impl Database {
    /// Record a duplicate relationship.
    ///
    /// Ignored when the duplicate is already claimed by a group (the
    /// UNIQUE constraint on `duplicate_transaction_id` makes re-runs
    /// no-ops). The duplicate row is also flagged for review. Returns
    /// true when a new group was recorded.
    pub fn mark_as_duplicate(
        &self,
        duplicate_id: &str,
        kept_id: &str,
        reason: &str,
        confidence: Option<f64>,
    ) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let changed = tx.execute(
            r#"
            INSERT OR IGNORE INTO duplicate_groups
                (kept_transaction_id, duplicate_transaction_id, reason, confidence)
            VALUES (?, ?, ?, ?)
            "#,
            params![kept_id, duplicate_id, reason, confidence],
        )?;

        if changed > 0 {
            tx.execute(
                "UPDATE transactions SET needs_review = 1, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                params![duplicate_id],
            )?;
        }
        tx.commit()?;

        Ok(changed > 0)
    }

    /// Whether a transaction is already recorded as someone's duplicate
    pub fn is_recorded_duplicate(&self, transaction_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let exists = conn
            .query_row(
                "SELECT 1 FROM duplicate_groups WHERE duplicate_transaction_id = ?",
                params![transaction_id],
                |_| Ok(true),
            )
            .unwrap_or(false);
        Ok(exists)
    }

    /// All recorded groups, newest first
    pub fn list_duplicate_groups(&self) -> Result<Vec<DuplicateGroup>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, kept_transaction_id, duplicate_transaction_id, reason, confidence, created_at
            FROM duplicate_groups
            ORDER BY created_at DESC, id DESC
            "#,
        )?;

        let groups = stmt
            .query_map([], |row| {
                let created_at_str: String = row.get(5)?;
                Ok(DuplicateGroup {
                    id: row.get(0)?,
                    kept_transaction_id: row.get(1)?,
                    duplicate_transaction_id: row.get(2)?,
                    reason: row.get(3)?,
                    confidence: row.get(4)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    /// Count recorded groups
    pub fn count_duplicate_groups(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count =
            conn.query_row("SELECT COUNT(*) FROM duplicate_groups", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Cross-email candidate pairs for duplicate confirmation.
    ///
    /// Pairs share amount and direction, come from different emails,
    /// and lie within `tolerance_days` of each other. Each pair is
    /// emitted once with `t1.id < t2.id`. When `new_ids` is given, at
    /// least one side of the pair must be in that set.
    pub fn duplicate_candidates(
        &self,
        tolerance_days: i64,
        new_ids: Option<&[String]>,
    ) -> Result<Vec<(Transaction, Transaction)>> {
        let conn = self.conn()?;

        let mut sql = String::from(
            r#"
            SELECT t1.id, t2.id
            FROM transactions t1
            JOIN transactions t2
              ON t1.amount = t2.amount
             AND t1.direction = t2.direction
             AND t1.id < t2.id
             AND t1.email_message_id != t2.email_message_id
             AND ABS(julianday(t1.date) - julianday(t2.date)) <= ?
            "#,
        );

        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(tolerance_days)];

        if let Some(ids) = new_ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders: Vec<&str> = ids.iter().map(|_| "?").collect();
            sql.push_str(&format!(
                " WHERE t1.id IN ({list}) OR t2.id IN ({list})",
                list = placeholders.join(", ")
            ));
            // The IN lists are bound twice, once per side
            for id in ids {
                params_vec.push(Box::new(id.clone()));
            }
            for id in ids {
                params_vec.push(Box::new(id.clone()));
            }
        }

        sql.push_str(" ORDER BY t1.id, t2.id");

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let id_pairs: Vec<(String, String)> = stmt
            .query_map(params_refs.as_slice(), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);

        let mut pairs = Vec::with_capacity(id_pairs.len());
        for (id1, id2) in id_pairs {
            if let (Some(t1), Some(t2)) = (self.get_transaction(&id1)?, self.get_transaction(&id2)?)
            {
                pairs.push((t1, t2));
            }
        }
        Ok(pairs)
    }
}
