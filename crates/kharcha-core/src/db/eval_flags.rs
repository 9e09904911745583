//! Eval flag operations

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{EvalFlag, EvalVerdict};

impl Database {
    /// Record a ground-truth verdict on a transaction
    pub fn insert_eval_flag(
        &self,
        transaction_id: &str,
        verdict: EvalVerdict,
        notes: Option<&str>,
    ) -> Result<i64> {
        if self.get_transaction(transaction_id)?.is_none() {
            return Err(Error::NotFound(format!("Transaction {}", transaction_id)));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO eval_flags (transaction_id, verdict, notes) VALUES (?, ?, ?)",
            params![transaction_id, verdict.as_str(), notes],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All flags, newest first
    pub fn list_eval_flags(&self) -> Result<Vec<EvalFlag>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, transaction_id, verdict, notes, created_at
            FROM eval_flags
            ORDER BY created_at DESC, id DESC
            "#,
        )?;

        let flags = stmt
            .query_map([], |row| {
                let verdict_str: String = row.get(2)?;
                let created_at_str: String = row.get(4)?;
                Ok(EvalFlag {
                    id: row.get(0)?,
                    transaction_id: row.get(1)?,
                    verdict: verdict_str.parse().unwrap_or(EvalVerdict::Correct),
                    notes: row.get(3)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(flags)
    }
}
