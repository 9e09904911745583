//! Filter builder for transaction list/count queries

use chrono::NaiveDate;

use crate::models::{Direction, TransactionSource, TransactionType};

/// Builder assembling the WHERE clause and parameters shared by the
/// list and count queries. Ordering is always descending by date.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    tx_type: Option<TransactionType>,
    category: Option<String>,
    direction: Option<Direction>,
    bank: Option<String>,
    needs_review: Option<bool>,
    source: Option<TransactionSource>,
    limit: Option<i64>,
    offset: i64,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_date(mut self, date: Option<NaiveDate>) -> Self {
        self.start_date = date;
        self
    }

    pub fn end_date(mut self, date: Option<NaiveDate>) -> Self {
        self.end_date = date;
        self
    }

    pub fn tx_type(mut self, tx_type: Option<TransactionType>) -> Self {
        self.tx_type = tx_type;
        self
    }

    pub fn category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    pub fn direction(mut self, direction: Option<Direction>) -> Self {
        self.direction = direction;
        self
    }

    pub fn bank(mut self, bank: Option<String>) -> Self {
        self.bank = bank;
        self
    }

    pub fn needs_review(mut self, needs_review: Option<bool>) -> Self {
        self.needs_review = needs_review;
        self
    }

    pub fn source(mut self, source: Option<TransactionSource>) -> Self {
        self.source = source;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    /// WHERE clause (possibly empty) plus its positional parameters
    pub(crate) fn where_clause(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(start) = self.start_date {
            conditions.push("date >= ?".to_string());
            params.push(Box::new(start.to_string()));
        }
        if let Some(end) = self.end_date {
            conditions.push("date <= ?".to_string());
            params.push(Box::new(end.to_string()));
        }
        if let Some(t) = self.tx_type {
            conditions.push("type = ?".to_string());
            params.push(Box::new(t.as_str().to_string()));
        }
        if let Some(ref c) = self.category {
            conditions.push("category = ? COLLATE NOCASE".to_string());
            params.push(Box::new(c.clone()));
        }
        if let Some(d) = self.direction {
            conditions.push("direction = ?".to_string());
            params.push(Box::new(d.as_str().to_string()));
        }
        if let Some(ref b) = self.bank {
            conditions.push("bank = ? COLLATE NOCASE".to_string());
            params.push(Box::new(b.clone()));
        }
        if let Some(review) = self.needs_review {
            conditions.push("needs_review = ?".to_string());
            params.push(Box::new(review as i64));
        }
        if let Some(s) = self.source {
            conditions.push("source = ?".to_string());
            params.push(Box::new(s.as_str().to_string()));
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        (clause, params)
    }

    /// LIMIT/OFFSET suffix for the list query
    pub(crate) fn page_clause(&self) -> String {
        match self.limit {
            Some(limit) => format!("LIMIT {} OFFSET {}", limit, self.offset),
            None => String::new(),
        }
    }
}
