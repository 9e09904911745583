//! Category correction operations
//!
//! Corrections are append-only; the categorizer replays them as
//! few-shot examples, merchant-keyed first.

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::CategoryCorrection;

impl Database {
    /// Record a user correction
    pub fn insert_category_correction(
        &self,
        merchant: &str,
        original_category: &str,
        corrected_category: &str,
        description: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO category_corrections
                (merchant, description, original_category, corrected_category)
            VALUES (?, ?, ?, ?)
            "#,
            params![merchant, description, original_category, corrected_category],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Corrections for one merchant, newest first
    pub fn corrections_by_merchant(
        &self,
        merchant: &str,
        limit: i64,
    ) -> Result<Vec<CategoryCorrection>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, merchant, description, original_category, corrected_category, created_at
            FROM category_corrections
            WHERE merchant = ? COLLATE NOCASE
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )?;

        let corrections = stmt
            .query_map(params![merchant, limit], Self::row_to_correction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(corrections)
    }

    /// Most recent corrections across all merchants
    pub fn recent_corrections(&self, limit: i64) -> Result<Vec<CategoryCorrection>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, merchant, description, original_category, corrected_category, created_at
            FROM category_corrections
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )?;

        let corrections = stmt
            .query_map(params![limit], Self::row_to_correction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(corrections)
    }

    /// Count all recorded corrections
    pub fn count_corrections(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count =
            conn.query_row("SELECT COUNT(*) FROM category_corrections", [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    fn row_to_correction(row: &rusqlite::Row) -> rusqlite::Result<CategoryCorrection> {
        let created_at_str: String = row.get(5)?;
        Ok(CategoryCorrection {
            id: row.get(0)?,
            merchant: row.get(1)?,
            description: row.get(2)?,
            original_category: row.get(3)?,
            corrected_category: row.get(4)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}
