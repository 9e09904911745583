//! Transaction operations

use rusqlite::{params, OptionalExtension};

use super::transaction_filter::TransactionFilter;
use super::{parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction, TransactionSource};

const TX_COLUMNS: &str = "id, email_message_id, date, amount, currency, direction, type, \
     merchant, account, bank, reference, description, category, source, confidence, \
     needs_review, created_at, updated_at";

impl Database {
    /// Insert a transaction, ignoring composite-key conflicts.
    ///
    /// The UNIQUE(email_message_id, amount, merchant, date) constraint
    /// is the intra-email dedup mechanism: the same four fields
    /// repeated in one email collapse to a single row. Returns true
    /// when a row was actually inserted.
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<bool> {
        if tx.amount <= 0.0 {
            return Err(Error::InvalidData(format!(
                "Transaction amount must be positive, got {}",
                tx.amount
            )));
        }

        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            INSERT OR IGNORE INTO transactions
                (id, email_message_id, date, amount, currency, direction, type,
                 merchant, account, bank, reference, description, category,
                 source, confidence, needs_review)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.id,
                tx.email_message_id,
                tx.date.to_string(),
                tx.amount,
                tx.currency,
                tx.direction.as_str(),
                tx.tx_type.as_str(),
                tx.merchant,
                tx.account,
                tx.bank,
                tx.reference,
                tx.description,
                tx.category,
                tx.source.as_str(),
                tx.confidence,
                tx.needs_review as i64,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Insert a batch of transactions in one transaction.
    ///
    /// Composite-key conflicts are silently skipped; returns the count
    /// actually inserted.
    pub fn insert_transactions(&self, txs: &[NewTransaction]) -> Result<usize> {
        let mut conn = self.conn()?;
        let dbtx = conn.transaction()?;

        let mut inserted = 0;
        {
            let mut stmt = dbtx.prepare(
                r#"
                INSERT OR IGNORE INTO transactions
                    (id, email_message_id, date, amount, currency, direction, type,
                     merchant, account, bank, reference, description, category,
                     source, confidence, needs_review)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;

            for tx in txs {
                if tx.amount <= 0.0 {
                    return Err(Error::InvalidData(format!(
                        "Transaction amount must be positive, got {}",
                        tx.amount
                    )));
                }
                let changed = stmt.execute(params![
                    tx.id,
                    tx.email_message_id,
                    tx.date.to_string(),
                    tx.amount,
                    tx.currency,
                    tx.direction.as_str(),
                    tx.tx_type.as_str(),
                    tx.merchant,
                    tx.account,
                    tx.bank,
                    tx.reference,
                    tx.description,
                    tx.category,
                    tx.source.as_str(),
                    tx.confidence,
                    tx.needs_review as i64,
                ])?;
                inserted += changed;
            }
        }
        dbtx.commit()?;

        Ok(inserted)
    }

    /// Get a single transaction by id
    pub fn get_transaction(&self, id: &str) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM transactions WHERE id = ?", TX_COLUMNS);
        let tx = conn
            .query_row(&sql, params![id], Self::row_to_transaction)
            .optional()?;
        Ok(tx)
    }

    /// List transactions matching the filter, newest first
    pub fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let (where_clause, filter_params) = filter.where_clause();
        let sql = format!(
            "SELECT {} FROM transactions {} ORDER BY date DESC, created_at DESC {}",
            TX_COLUMNS,
            where_clause,
            filter.page_clause()
        );

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            filter_params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let txs = stmt
            .query_map(params_refs.as_slice(), Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(txs)
    }

    /// Count transactions matching the filter
    pub fn count_transactions(&self, filter: &TransactionFilter) -> Result<i64> {
        let conn = self.conn()?;
        let (where_clause, filter_params) = filter.where_clause();
        let sql = format!("SELECT COUNT(*) FROM transactions {}", where_clause);

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            filter_params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let count = stmt.query_row(params_refs.as_slice(), |row| row.get(0))?;
        Ok(count)
    }

    /// Transactions flagged for review, optionally restricted by source
    pub fn review_queue(&self, source: Option<TransactionSource>) -> Result<Vec<Transaction>> {
        self.list_transactions(
            &TransactionFilter::new()
                .needs_review(Some(true))
                .source(source),
        )
    }

    /// Count of the review queue
    pub fn review_count(&self) -> Result<i64> {
        self.count_transactions(&TransactionFilter::new().needs_review(Some(true)))
    }

    /// Update a transaction's category, refreshing `updated_at`
    pub fn update_transaction_category(&self, id: &str, category: &str) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE transactions SET category = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![category, id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Transaction {}", id)));
        }
        Ok(())
    }

    /// Update a transaction's merchant, refreshing `updated_at`
    pub fn update_transaction_merchant(&self, id: &str, merchant: &str) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE transactions SET merchant = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![merchant, id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Transaction {}", id)));
        }
        Ok(())
    }

    /// Set or clear the review flag, refreshing `updated_at`
    pub fn update_transaction_review(&self, id: &str, needs_review: bool) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE transactions SET needs_review = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![needs_review as i64, id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Transaction {}", id)));
        }
        Ok(())
    }

    pub(crate) fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let date_str: String = row.get(2)?;
        let direction_str: String = row.get(5)?;
        let type_str: String = row.get(6)?;
        let source_str: String = row.get(13)?;
        let needs_review_int: i64 = row.get(15)?;
        let created_at_str: String = row.get(16)?;
        let updated_at_str: String = row.get(17)?;

        Ok(Transaction {
            id: row.get(0)?,
            email_message_id: row.get(1)?,
            date: parse_date(&date_str),
            amount: row.get(3)?,
            currency: row.get(4)?,
            direction: direction_str
                .parse()
                .unwrap_or(crate::models::Direction::Debit),
            tx_type: type_str
                .parse()
                .unwrap_or(crate::models::TransactionType::BankTransfer),
            merchant: row.get(7)?,
            account: row.get(8)?,
            bank: row.get(9)?,
            reference: row.get(10)?,
            description: row.get(11)?,
            category: row.get(12)?,
            source: source_str.parse().unwrap_or_default(),
            confidence: row.get(14)?,
            needs_review: needs_review_int != 0,
            created_at: parse_datetime(&created_at_str),
            updated_at: parse_datetime(&updated_at_str),
        })
    }
}
