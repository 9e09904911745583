//! Prompt builders for the model-backed components
//!
//! Each builder produces the full prompt for one model call. They are
//! plain functions rather than templates because every prompt embeds
//! per-call context (email bodies, correction history, schema).

use crate::config::CategoriesConfig;
use crate::models::{CategoryCorrection, NewTransaction, RawEmail, Transaction};

/// Fallback extraction prompt: subject, from, send date, and the
/// (truncated) body.
pub fn fallback_parse(email: &RawEmail, body_truncation_limit: usize) -> String {
    let body: String = email.body_text.chars().take(body_truncation_limit).collect();

    format!(
        "You extract financial transactions from Indian bank/card/UPI/mutual-fund \
         notification emails.\n\n\
         Email:\n\
         From: {}\n\
         Subject: {}\n\
         Date: {}\n\
         Body:\n{}\n\n\
         Extract every real money movement in this email. Respond with JSON only:\n\
         {{\"transactions\": [{{\"amount\": number, \"direction\": \"debit\"|\"credit\", \
         \"type\": \"upi\"|\"credit_card\"|\"bank_transfer\"|\"sip\"|\"loan\", \
         \"merchant\": string, \"account\": string?, \"bank\": string?, \
         \"reference\": string?, \"description\": string?, \
         \"date\": \"YYYY-MM-DD\"?, \"confidence\": number}}]}}\n\
         Use an empty transactions array if the email contains no transaction. \
         Amounts are positive; direction carries the sign. confidence is your \
         certainty in [0,1].",
        email.from,
        email.subject,
        email.date.format("%Y-%m-%d"),
        body
    )
}

/// Render corrections as few-shot lines, newest first
fn render_corrections(corrections: &[CategoryCorrection]) -> String {
    corrections
        .iter()
        .map(|c| {
            let detail = c
                .description
                .as_deref()
                .map(|d| format!(" ({})", d))
                .unwrap_or_default();
            format!(
                "- {}{}: was {} -> corrected to {}",
                c.merchant, detail, c.original_category, c.corrected_category
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_category_set(categories: &CategoriesConfig) -> String {
    categories
        .list
        .iter()
        .map(|name| {
            let description = categories
                .descriptions
                .get(name)
                .map(|d| d.as_str())
                .unwrap_or("");
            format!("- {}: {}", name, description)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_transaction_fields(tx: &NewTransaction) -> String {
    format!(
        "merchant: {}\namount: {:.2} {}\ndirection: {}\ntype: {}\ndate: {}\ndescription: {}",
        tx.merchant,
        tx.amount,
        tx.currency,
        tx.direction,
        tx.tx_type,
        tx.date,
        tx.description.as_deref().unwrap_or("-"),
    )
}

/// Single-transaction categorization prompt
pub fn categorize(
    tx: &NewTransaction,
    categories: &CategoriesConfig,
    corrections: &[CategoryCorrection],
) -> String {
    let corrections_block = if corrections.is_empty() {
        String::new()
    } else {
        format!(
            "The user has corrected earlier categorizations. Treat these as \
             authoritative precedents:\n{}\n\n",
            render_corrections(corrections)
        )
    };

    format!(
        "Categorize this transaction into exactly one of these categories:\n{}\n\n\
         {}Transaction:\n{}\n\n\
         Respond with JSON only: {{\"category\": string, \"confidence\": number}}",
        render_category_set(categories),
        corrections_block,
        render_transaction_fields(tx)
    )
}

/// Batch categorization prompt; the response must be an array of the
/// same length as the input list.
pub fn categorize_batch(
    txs: &[NewTransaction],
    categories: &CategoriesConfig,
    corrections: &[CategoryCorrection],
) -> String {
    let corrections_block = if corrections.is_empty() {
        String::new()
    } else {
        format!(
            "The user has corrected earlier categorizations. Treat these as \
             authoritative precedents:\n{}\n\n",
            render_corrections(corrections)
        )
    };

    let listed = txs
        .iter()
        .enumerate()
        .map(|(i, tx)| {
            format!(
                "{}. {} | {:.2} {} | {} | {}",
                i + 1,
                tx.merchant,
                tx.amount,
                tx.currency,
                tx.direction,
                tx.description.as_deref().unwrap_or("-")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Categorize each transaction into exactly one of these categories:\n{}\n\n\
         {}Transactions:\n{}\n\n\
         Respond with JSON only: an array with one entry per transaction, in \
         order: [{{\"category\": string, \"confidence\": number}}, ...]",
        render_category_set(categories),
        corrections_block,
        listed
    )
}

fn render_full_transaction(label: &str, tx: &Transaction) -> String {
    format!(
        "{}:\n  merchant: {}\n  amount: {:.2} {}\n  direction: {}\n  type: {}\n  date: {}\n  \
         bank: {}\n  account: {}\n  reference: {}\n  description: {}",
        label,
        tx.merchant,
        tx.amount,
        tx.currency,
        tx.direction,
        tx.tx_type,
        tx.date,
        tx.bank,
        tx.account,
        tx.reference.as_deref().unwrap_or("-"),
        tx.description.as_deref().unwrap_or("-"),
    )
}

/// Pairwise duplicate judgment prompt
pub fn dedup_judgment(t1: &Transaction, t2: &Transaction) -> String {
    format!(
        "Two transactions were extracted from two different emails. Decide whether \
         they describe the SAME underlying payment (e.g., the bank and the card \
         network both notified about one purchase) or two genuinely separate \
         payments that happen to share an amount.\n\n{}\n\n{}\n\n\
         Respond with JSON only: {{\"isDuplicate\": boolean, \"confidence\": number}}",
        render_full_transaction("Transaction A", t1),
        render_full_transaction("Transaction B", t2)
    )
}

/// Schema context handed to the SQL generator
pub const SCHEMA_CONTEXT: &str = r#"Table transactions:
  id TEXT PRIMARY KEY
  email_message_id TEXT          -- source email
  date TEXT                      -- transaction date, 'YYYY-MM-DD'
  amount REAL                    -- always positive
  currency TEXT                  -- ISO 4217, usually 'INR'
  direction TEXT                 -- 'debit' (money out) or 'credit' (money in)
  type TEXT                      -- 'upi','credit_card','bank_transfer','sip','loan'
  merchant TEXT
  account TEXT                   -- masked account, e.g. '**1234'
  bank TEXT
  reference TEXT
  description TEXT
  category TEXT                  -- 'Food','Transport','Shopping','Bills','Entertainment','Health','Education','Investment','Transfer','Other'
  source TEXT                    -- 'regex' or 'ai'
  confidence REAL
  needs_review INTEGER           -- 0/1
  created_at TEXT
  updated_at TEXT

Table raw_emails:
  message_id TEXT PRIMARY KEY
  from_addr TEXT
  subject TEXT
  date TEXT
  body_text TEXT

Table category_corrections(id, merchant, description, original_category, corrected_category, created_at)
Table duplicate_groups(id, kept_transaction_id, duplicate_transaction_id, reason, confidence, created_at)"#;

/// Question -> SQL generation prompt
pub fn generate_sql(question: &str) -> String {
    format!(
        "You translate questions about a personal expense ledger into SQLite SQL.\n\n\
         Schema:\n{}\n\n\
         Rules:\n\
         - Output exactly one SELECT or WITH statement, nothing else.\n\
         - Dates are TEXT in 'YYYY-MM-DD'; use date() and strftime() for ranges.\n\
         - Spending means direction = 'debit'.\n\
         - If the question cannot be answered from this schema, output exactly:\n\
           SELECT 'CANNOT_ANSWER' as error;\n\n\
         Question: {}",
        SCHEMA_CONTEXT, question
    )
}

/// Result interpretation prompt
pub fn interpret_results(question: &str, table: &str) -> String {
    format!(
        "A user asked about their personal expenses:\n  {}\n\n\
         Running a query over their ledger produced this result table:\n{}\n\n\
         Answer the question in one or two plain sentences using these numbers. \
         Amounts are in INR.",
        question, table
    )
}
