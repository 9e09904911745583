//! Key-value sync cursor
//!
//! Three keys: `last_sync_timestamp` (wall clock when the most recent
//! ingestion started listing), `last_message_id`, and the monotonic
//! `total_synced_count`.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::error::Result;

pub(crate) const KEY_LAST_SYNC_TIMESTAMP: &str = "last_sync_timestamp";
pub(crate) const KEY_LAST_MESSAGE_ID: &str = "last_message_id";
pub(crate) const KEY_TOTAL_SYNCED_COUNT: &str = "total_synced_count";

impl Database {
    /// Raw lookup of a sync-state value
    pub fn get_sync_state(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM sync_state WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Upsert a sync-state value
    pub fn set_sync_state(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO sync_state (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// The stored last-sync moment, if any
    pub fn last_sync_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .get_sync_state(KEY_LAST_SYNC_TIMESTAMP)?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }

    /// The first message id returned by the most recent listing
    pub fn last_message_id(&self) -> Result<Option<String>> {
        self.get_sync_state(KEY_LAST_MESSAGE_ID)
    }

    /// Lifetime count of newly persisted emails; only ever increases
    pub fn total_synced_count(&self) -> Result<i64> {
        Ok(self
            .get_sync_state(KEY_TOTAL_SYNCED_COUNT)?
            .and_then(|s| s.parse().ok())
            .unwrap_or(0))
    }

    /// Advance the cursor after a successful ingestion run
    pub fn record_sync(
        &self,
        timestamp: DateTime<Utc>,
        first_message_id: Option<&str>,
        newly_stored: usize,
    ) -> Result<()> {
        self.set_sync_state(KEY_LAST_SYNC_TIMESTAMP, &timestamp.to_rfc3339())?;
        if let Some(id) = first_message_id {
            self.set_sync_state(KEY_LAST_MESSAGE_ID, id)?;
        }
        let total = self.total_synced_count()? + newly_stored as i64;
        self.set_sync_state(KEY_TOTAL_SYNCED_COUNT, &total.to_string())?;
        Ok(())
    }
}
