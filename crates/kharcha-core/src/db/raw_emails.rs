//! Raw email persistence

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::RawEmail;

impl Database {
    /// Insert a raw email, ignoring primary-key conflicts.
    ///
    /// Returns true when a row was actually inserted. Re-ingesting the
    /// same `message_id` is the normal path during an overlapping sync
    /// window and is not an error.
    pub fn insert_raw_email(&self, email: &RawEmail) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            INSERT OR IGNORE INTO raw_emails
                (message_id, from_addr, subject, date, body_text, body_html, fetched_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                email.message_id,
                email.from,
                email.subject,
                email.date.to_rfc3339(),
                email.body_text,
                email.body_html,
                email.fetched_at.to_rfc3339(),
            ],
        )?;
        Ok(changed > 0)
    }

    /// Insert a batch of raw emails in one transaction.
    ///
    /// Returns the message ids that were actually inserted, in input
    /// order; conflicting ids are silently skipped.
    pub fn insert_raw_emails(&self, emails: &[RawEmail]) -> Result<Vec<String>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut inserted = Vec::new();
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO raw_emails
                    (message_id, from_addr, subject, date, body_text, body_html, fetched_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;

            for email in emails {
                let changed = stmt.execute(params![
                    email.message_id,
                    email.from,
                    email.subject,
                    email.date.to_rfc3339(),
                    email.body_text,
                    email.body_html,
                    email.fetched_at.to_rfc3339(),
                ])?;
                if changed > 0 {
                    inserted.push(email.message_id.clone());
                }
            }
        }
        tx.commit()?;

        Ok(inserted)
    }

    /// Fetch a raw email by provider message id
    pub fn get_raw_email(&self, message_id: &str) -> Result<Option<RawEmail>> {
        let conn = self.conn()?;
        let email = conn
            .query_row(
                r#"
                SELECT message_id, from_addr, subject, date, body_text, body_html, fetched_at
                FROM raw_emails
                WHERE message_id = ?
                "#,
                params![message_id],
                Self::row_to_raw_email,
            )
            .optional()?;
        Ok(email)
    }

    /// Fetch several raw emails by id, skipping unknown ids
    pub fn get_raw_emails(&self, message_ids: &[String]) -> Result<Vec<RawEmail>> {
        let mut out = Vec::with_capacity(message_ids.len());
        for id in message_ids {
            if let Some(email) = self.get_raw_email(id)? {
                out.push(email);
            }
        }
        Ok(out)
    }

    /// Raw emails that produced no transactions (reparse targets)
    pub fn list_unparsed_emails(&self) -> Result<Vec<RawEmail>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT e.message_id, e.from_addr, e.subject, e.date, e.body_text, e.body_html, e.fetched_at
            FROM raw_emails e
            WHERE NOT EXISTS (
                SELECT 1 FROM transactions t WHERE t.email_message_id = e.message_id
            )
            ORDER BY e.date DESC
            "#,
        )?;

        let emails = stmt
            .query_map([], Self::row_to_raw_email)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(emails)
    }

    /// All raw email ids, newest first (full reparse)
    pub fn list_raw_email_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT message_id FROM raw_emails ORDER BY date DESC")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Count stored raw emails
    pub fn count_raw_emails(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM raw_emails", [], |row| row.get(0))?;
        Ok(count)
    }

    fn row_to_raw_email(row: &rusqlite::Row) -> rusqlite::Result<RawEmail> {
        let date_str: String = row.get(3)?;
        let fetched_str: String = row.get(6)?;
        Ok(RawEmail {
            message_id: row.get(0)?,
            from: row.get(1)?,
            subject: row.get(2)?,
            date: parse_datetime(&date_str),
            body_text: row.get(4)?,
            body_html: row.get(5)?,
            fetched_at: parse_datetime(&fetched_str),
        })
    }
}
