//! Store access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `raw_emails` - Raw notification email persistence
//! - `transactions` - Ledger transaction CRUD
//! - `corrections` - Append-only category corrections
//! - `duplicates` - Duplicate groups and candidate-pair selection
//! - `sync_state` - Key-value sync cursor
//! - `eval_flags` - Ground-truth eval labels

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info};

use crate::error::Result;

mod corrections;
mod duplicates;
mod eval_flags;
mod raw_emails;
mod sync_state;
mod transaction_filter;
mod transactions;

pub use transaction_filter::TransactionFilter;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Numbered migrations, embedded at compile time and applied in id order.
const MIGRATIONS: &[(i64, &str, &str)] = &[
    (1, "initial", include_str!("../../migrations/0001_initial.sql")),
    (
        2,
        "eval_flags",
        include_str!("../../migrations/0002_eval_flags.sql"),
    ),
];

/// Parse a stored datetime string into a DateTime<Utc>.
///
/// Accepts RFC 3339 (how email send times are written) and the
/// "YYYY-MM-DD HH:MM:SS" form SQLite's CURRENT_TIMESTAMP produces.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}

/// Parse a stored YYYY-MM-DD date string
pub(crate) fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}

/// Store wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Open (or create) the store at `path` and apply pending migrations
    pub fn new(path: &str) -> Result<Self> {
        // WAL for reader isolation, foreign keys on every connection
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                r#"
                PRAGMA foreign_keys = ON;
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                "#,
            )
        });

        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing).
    ///
    /// Uses a temporary file rather than `:memory:` so every pooled
    /// connection sees the same database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "kharcha_test_{}_{}.db",
            std::process::id(),
            id
        ));

        let _ = std::fs::remove_file(&path);

        Self::new(path.to_string_lossy().as_ref())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Apply pending migrations in id order.
    ///
    /// Each migration runs inside its own transaction and rolls back
    /// atomically on error. Re-running is a no-op for applied ids.
    fn run_migrations(&self) -> Result<()> {
        let mut conn = self.conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS migrations (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        for (id, name, sql) in MIGRATIONS {
            let applied: bool = conn
                .query_row(
                    "SELECT 1 FROM migrations WHERE id = ?",
                    [id],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if applied {
                debug!(id, name, "Migration already applied");
                continue;
            }

            let tx = conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.execute(
                "INSERT INTO migrations (id, name) VALUES (?, ?)",
                rusqlite::params![id, name],
            )?;
            tx.commit()?;

            info!(id, name, "Applied migration");
        }

        Ok(())
    }

    /// Run an arbitrary read-only SELECT and return string rows.
    ///
    /// Used by the natural-language query engine after its statement
    /// has passed the read-only guard; the guard lives with that
    /// engine, not here.
    pub fn query_rows(&self, sql: &str) -> Result<QueryRows> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = columns.len();

        let mut rows_out = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut out = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value = match row.get_ref(i)? {
                    rusqlite::types::ValueRef::Null => String::new(),
                    rusqlite::types::ValueRef::Integer(v) => v.to_string(),
                    rusqlite::types::ValueRef::Real(v) => format!("{:.2}", v),
                    rusqlite::types::ValueRef::Text(t) => String::from_utf8_lossy(t).to_string(),
                    rusqlite::types::ValueRef::Blob(_) => "<blob>".to_string(),
                };
                out.push(value);
            }
            rows_out.push(out);
        }

        Ok(QueryRows {
            columns,
            rows: rows_out,
        })
    }
}

/// Column names plus stringified rows from an ad-hoc query
#[derive(Debug, Clone)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[cfg(test)]
mod tests;
