//! Natural-language queries over the ledger
//!
//! Two model calls bracket one guarded SQL execution: the question is
//! turned into a single SELECT/WITH statement, the statement passes a
//! syntactic read-only guard or is rejected without executing, and the
//! result table goes back to the model for a plain-language answer.
//! The guard is a hard safety boundary: model-generated SQL never
//! touches the store unless it survives it.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::ai::{parsing, ModelGateway, OutputFormat};
use crate::db::{Database, QueryRows};
use crate::prompts;

/// Sentinel the generator emits for unanswerable questions
const CANNOT_ANSWER: &str = "CANNOT_ANSWER";

/// Rows fed to the interpreter and returned to the caller
const MAX_ROWS: usize = 100;

static WRITE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(INSERT|UPDATE|DELETE|DROP|ALTER|CREATE|REPLACE|ATTACH|DETACH|PRAGMA|REINDEX|VACUUM)\b",
    )
    .unwrap()
});

static LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"--[^\n]*").unwrap());
static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

/// Strip SQL line and block comments
fn strip_sql_comments(sql: &str) -> String {
    let without_blocks = BLOCK_COMMENT.replace_all(sql, " ");
    LINE_COMMENT.replace_all(&without_blocks, " ").to_string()
}

/// The read-only guard: SELECT/WITH prefix after comment removal, and
/// no word-boundaried write keyword anywhere, in any casing.
pub fn is_read_only(sql: &str) -> bool {
    let cleaned = strip_sql_comments(sql);
    let trimmed = cleaned.trim_start();
    let upper = trimmed.to_uppercase();
    if !(upper.starts_with("SELECT") || upper.starts_with("WITH")) {
        return false;
    }
    !WRITE_KEYWORD.is_match(&cleaned)
}

/// What the caller gets back from one chat turn
#[derive(Debug, Clone)]
pub struct ChatAnswer {
    pub answer: String,
    pub sql: Option<String>,
    pub rows: Option<QueryRows>,
    pub error: Option<String>,
}

impl ChatAnswer {
    fn failed(answer: &str, error: String) -> Self {
        Self {
            answer: answer.to_string(),
            sql: None,
            rows: None,
            error: Some(error),
        }
    }
}

pub struct NlQueryEngine<'a> {
    db: &'a Database,
    gateway: &'a ModelGateway,
}

impl<'a> NlQueryEngine<'a> {
    pub fn new(db: &'a Database, gateway: &'a ModelGateway) -> Self {
        Self { db, gateway }
    }

    /// Answer one question. Always yields some response.
    pub async fn ask(&self, question: &str) -> ChatAnswer {
        // Step 1: question -> SQL
        let generated = self
            .gateway
            .run(&prompts::generate_sql(question), OutputFormat::Text)
            .await;
        if !generated.ok {
            return ChatAnswer::failed(
                "I could not generate a query for that question.",
                generated
                    .error
                    .unwrap_or_else(|| "model unavailable".to_string()),
            );
        }

        let sql = parsing::strip_code_fences(&generated.output);
        let sql = sql.trim().trim_end_matches(';').trim().to_string();
        debug!(%sql, "Generated SQL");

        if sql.contains(CANNOT_ANSWER) {
            return ChatAnswer {
                answer: "I can't answer that from the expense ledger.".to_string(),
                sql: Some(sql),
                rows: None,
                error: None,
            };
        }

        // Step 2: the read-only guard
        if !is_read_only(&sql) {
            warn!(%sql, "Write guard rejected generated SQL");
            return ChatAnswer {
                answer: "That query was rejected: only read-only questions are allowed."
                    .to_string(),
                sql: Some(sql),
                rows: None,
                error: Some("rejected by read-only guard".to_string()),
            };
        }

        // Step 3: execute
        let mut rows = match self.db.query_rows(&sql) {
            Ok(rows) => rows,
            Err(e) => {
                return ChatAnswer {
                    answer: "The generated query failed to run.".to_string(),
                    sql: Some(sql),
                    rows: None,
                    error: Some(e.to_string()),
                }
            }
        };
        rows.rows.truncate(MAX_ROWS);

        // Step 4: interpret, falling back to the raw table
        let table = format_table(&rows);
        let interpreted = self
            .gateway
            .run(
                &prompts::interpret_results(question, &table),
                OutputFormat::Text,
            )
            .await;

        let answer = if interpreted.ok && !interpreted.output.trim().is_empty() {
            interpreted.output.trim().to_string()
        } else {
            table
        };

        ChatAnswer {
            answer,
            sql: Some(sql),
            rows: Some(rows),
            error: None,
        }
    }
}

/// Pipe-delimited table of the first rows
fn format_table(rows: &QueryRows) -> String {
    let mut out = rows.columns.join(" | ");
    for row in &rows.rows {
        out.push('\n');
        out.push_str(&row.join(" | "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::StubRunner;
    use crate::db::TransactionFilter;
    use crate::models::{
        new_transaction_id, Direction, NewTransaction, RawEmail, TransactionSource,
        TransactionType,
    };
    use chrono::{NaiveDate, Utc};
    use std::sync::Arc;

    #[test]
    fn test_guard_accepts_reads() {
        assert!(is_read_only("SELECT * FROM transactions"));
        assert!(is_read_only("  select sum(amount) from transactions"));
        assert!(is_read_only(
            "WITH t AS (SELECT * FROM transactions) SELECT * FROM t"
        ));
        assert!(is_read_only(
            "-- total spend\nSELECT SUM(amount) FROM transactions"
        ));
        assert!(is_read_only(
            "/* block */ SELECT merchant FROM transactions"
        ));
    }

    #[test]
    fn test_guard_rejects_writes_in_every_casing() {
        for sql in [
            "DELETE FROM transactions",
            "delete from transactions",
            "DeLeTe FROM transactions",
            "INSERT INTO transactions VALUES (1)",
            "UPDATE transactions SET amount = 0",
            "DROP TABLE transactions",
            "ALTER TABLE transactions ADD COLUMN x",
            "CREATE TABLE evil (id)",
            "REPLACE INTO transactions VALUES (1)",
            "ATTACH DATABASE 'x' AS y",
            "DETACH DATABASE y",
            "PRAGMA journal_mode = DELETE",
            "REINDEX transactions",
            "VACUUM",
        ] {
            assert!(!is_read_only(sql), "should reject: {}", sql);
        }
    }

    #[test]
    fn test_guard_rejects_writes_hidden_behind_select() {
        assert!(!is_read_only(
            "SELECT 1; DELETE FROM transactions WHERE 1=1"
        ));
        assert!(!is_read_only(
            "WITH t AS (SELECT 1) UPDATE transactions SET amount = 0"
        ));
        // Comments do not hide the prefix check
        assert!(!is_read_only("-- SELECT\nDELETE FROM transactions"));
    }

    #[test]
    fn test_guard_requires_select_or_with_prefix() {
        assert!(!is_read_only("EXPLAIN SELECT 1"));
        assert!(!is_read_only(""));
        assert!(!is_read_only("show me the money"));
    }

    #[test]
    fn test_word_boundaries_do_not_overmatch() {
        // Column/merchant names containing keyword substrings are fine
        assert!(is_read_only(
            "SELECT merchant FROM transactions WHERE merchant = 'updates galore'"
        ));
        assert!(is_read_only(
            "SELECT created_at FROM transactions"
        ));
    }

    fn seed(db: &Database) {
        db.insert_raw_email(&RawEmail {
            message_id: "e1".to_string(),
            from: "a@b.c".to_string(),
            subject: "s".to_string(),
            date: Utc::now(),
            body_text: "b".to_string(),
            body_html: None,
            fetched_at: Utc::now(),
        })
        .unwrap();
        db.insert_transaction(&NewTransaction {
            id: new_transaction_id(),
            email_message_id: "e1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            amount: 500.0,
            currency: "INR".to_string(),
            direction: Direction::Debit,
            tx_type: TransactionType::Upi,
            merchant: "Zomato".to_string(),
            account: "**1".to_string(),
            bank: "HDFC Bank".to_string(),
            reference: None,
            description: None,
            category: Some("Food".to_string()),
            source: TransactionSource::Regex,
            confidence: None,
            needs_review: false,
        })
        .unwrap();
    }

    #[tokio::test]
    async fn test_full_flow_with_interpretation() {
        let db = Database::in_memory().unwrap();
        seed(&db);

        let stub = Arc::new(StubRunner::new());
        stub.push_ok("```sql\nSELECT SUM(amount) AS total FROM transactions WHERE direction = 'debit';\n```");
        stub.push_ok("You spent a total of INR 500 on food.");
        let gateway = ModelGateway::with_runner(stub.clone());

        let answer = NlQueryEngine::new(&db, &gateway)
            .ask("how much did I spend?")
            .await;

        assert_eq!(answer.answer, "You spent a total of INR 500 on food.");
        assert!(answer.error.is_none());
        assert_eq!(answer.rows.as_ref().unwrap().rows[0][0], "500.00");
        // The interpretation call saw the pipe table
        assert!(stub.prompts()[1].contains("total"));
        assert!(stub.prompts()[1].contains("500.00"));
    }

    #[tokio::test]
    async fn test_write_statement_is_rejected_without_executing() {
        let db = Database::in_memory().unwrap();
        seed(&db);

        let stub = Arc::new(StubRunner::new());
        stub.push_ok("DELETE FROM transactions WHERE category='Food';");
        let gateway = ModelGateway::with_runner(stub);

        let answer = NlQueryEngine::new(&db, &gateway)
            .ask("delete all food transactions")
            .await;

        assert!(answer.error.as_deref().unwrap().contains("read-only"));
        assert!(answer.rows.is_none());
        // Nothing was deleted
        assert_eq!(
            db.count_transactions(&TransactionFilter::new()).unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_cannot_answer_sentinel() {
        let db = Database::in_memory().unwrap();
        let stub = Arc::new(StubRunner::new());
        stub.push_ok("SELECT 'CANNOT_ANSWER' as error;");
        let gateway = ModelGateway::with_runner(stub);

        let answer = NlQueryEngine::new(&db, &gateway)
            .ask("what is the meaning of life?")
            .await;
        assert!(answer.answer.contains("can't answer"));
        assert!(answer.error.is_none());
    }

    #[tokio::test]
    async fn test_runtime_error_is_returned_verbatim() {
        let db = Database::in_memory().unwrap();
        let stub = Arc::new(StubRunner::new());
        stub.push_ok("SELECT nonexistent_column FROM transactions");
        let gateway = ModelGateway::with_runner(stub);

        let answer = NlQueryEngine::new(&db, &gateway).ask("q").await;
        assert!(answer.error.is_some());
        assert!(answer.answer.contains("failed to run"));
    }

    #[tokio::test]
    async fn test_interpretation_failure_falls_back_to_raw_table() {
        let db = Database::in_memory().unwrap();
        seed(&db);

        let stub = Arc::new(StubRunner::new());
        stub.push_ok("SELECT merchant FROM transactions");
        stub.push_failure(1, "model went away");
        let gateway = ModelGateway::with_runner(stub);

        let answer = NlQueryEngine::new(&db, &gateway).ask("who did I pay?").await;
        assert!(answer.answer.contains("merchant"));
        assert!(answer.answer.contains("Zomato"));
        assert!(answer.error.is_none());
    }

    #[tokio::test]
    async fn test_generation_failure() {
        let db = Database::in_memory().unwrap();
        let stub = Arc::new(StubRunner::new());
        stub.push_failure(1, "offline");
        let gateway = ModelGateway::with_runner(stub);

        let answer = NlQueryEngine::new(&db, &gateway).ask("q").await;
        assert!(answer.answer.contains("could not generate"));
        assert_eq!(answer.error.as_deref(), Some("offline"));
    }
}
