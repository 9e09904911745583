//! Store tests against a throwaway database

use chrono::{NaiveDate, TimeZone, Utc};

use super::*;
use crate::models::{
    new_transaction_id, Direction, EvalVerdict, NewTransaction, RawEmail, TransactionSource,
    TransactionType,
};

fn email(message_id: &str) -> RawEmail {
    RawEmail {
        message_id: message_id.to_string(),
        from: "alerts@hdfcbank.net".to_string(),
        subject: "Transaction alert".to_string(),
        date: Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap(),
        body_text: "Rs. 500.00 debited from a/c **1234".to_string(),
        body_html: None,
        fetched_at: Utc::now(),
    }
}

fn tx(email_id: &str, amount: f64, merchant: &str, date: (i32, u32, u32)) -> NewTransaction {
    NewTransaction {
        id: new_transaction_id(),
        email_message_id: email_id.to_string(),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        amount,
        currency: "INR".to_string(),
        direction: Direction::Debit,
        tx_type: TransactionType::Upi,
        merchant: merchant.to_string(),
        account: "**1234".to_string(),
        bank: "HDFC".to_string(),
        reference: None,
        description: None,
        category: None,
        source: TransactionSource::Regex,
        confidence: None,
        needs_review: false,
    }
}

#[test]
fn test_migrations_are_idempotent() {
    let db = Database::in_memory().unwrap();
    // Re-running against the same file applies nothing new
    let db2 = Database::new(db.path()).unwrap();
    let applied: i64 = db2
        .conn()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
        .unwrap();
    assert_eq!(applied as usize, super::MIGRATIONS.len());
}

#[test]
fn test_raw_email_insert_ignores_conflicts() {
    let db = Database::in_memory().unwrap();

    assert!(db.insert_raw_email(&email("m1")).unwrap());
    assert!(!db.insert_raw_email(&email("m1")).unwrap());
    assert_eq!(db.count_raw_emails().unwrap(), 1);
}

#[test]
fn test_raw_email_batch_returns_inserted_ids() {
    let db = Database::in_memory().unwrap();
    db.insert_raw_email(&email("m1")).unwrap();

    let inserted = db
        .insert_raw_emails(&[email("m1"), email("m2"), email("m3")])
        .unwrap();
    assert_eq!(inserted, vec!["m2".to_string(), "m3".to_string()]);
    assert_eq!(db.count_raw_emails().unwrap(), 3);
}

#[test]
fn test_composite_key_dedup() {
    // S3: same (email, amount, merchant, date) collapses to one row
    let db = Database::in_memory().unwrap();
    db.insert_raw_email(&email("e1")).unwrap();

    assert!(db
        .insert_transaction(&tx("e1", 500.0, "Amazon", (2025, 1, 15)))
        .unwrap());

    let mut second = tx("e1", 500.0, "Amazon", (2025, 1, 15));
    second.bank = "ICICI".to_string();
    second.reference = Some("REF123".to_string());
    assert!(!db.insert_transaction(&second).unwrap());

    assert_eq!(
        db.count_transactions(&TransactionFilter::new()).unwrap(),
        1
    );
}

#[test]
fn test_multi_transaction_email() {
    // S4: one email, three merchants, three rows
    let db = Database::in_memory().unwrap();
    db.insert_raw_email(&email("e1")).unwrap();

    let inserted = db
        .insert_transactions(&[
            tx("e1", 100.0, "Zomato", (2025, 1, 15)),
            tx("e1", 200.0, "Swiggy", (2025, 1, 15)),
            tx("e1", 300.0, "Uber", (2025, 1, 15)),
        ])
        .unwrap();
    assert_eq!(inserted, 3);

    let all = db.list_transactions(&TransactionFilter::new()).unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|t| t.email_message_id == "e1"));
}

#[test]
fn test_zero_amount_is_rejected() {
    let db = Database::in_memory().unwrap();
    db.insert_raw_email(&email("e1")).unwrap();

    let mut bad = tx("e1", 0.0, "Amazon", (2025, 1, 15));
    assert!(db.insert_transaction(&bad).is_err());
    bad.amount = -5.0;
    assert!(db.insert_transaction(&bad).is_err());
}

#[test]
fn test_foreign_key_enforced() {
    let db = Database::in_memory().unwrap();
    // No raw email persisted: the insert must fail, not silently pass
    let orphan = tx("missing", 100.0, "Amazon", (2025, 1, 15));
    assert!(db.insert_transaction(&orphan).is_err());
}

#[test]
fn test_list_filters_and_ordering() {
    let db = Database::in_memory().unwrap();
    db.insert_raw_email(&email("e1")).unwrap();
    db.insert_raw_email(&email("e2")).unwrap();

    let mut credit = tx("e1", 900.0, "Employer", (2025, 1, 10));
    credit.direction = Direction::Credit;
    credit.tx_type = TransactionType::BankTransfer;
    db.insert_transaction(&credit).unwrap();

    let mut food = tx("e2", 450.0, "Zomato", (2025, 1, 20));
    food.category = Some("Food".to_string());
    db.insert_transaction(&food).unwrap();

    let all = db.list_transactions(&TransactionFilter::new()).unwrap();
    // Descending by date
    assert_eq!(all[0].merchant, "Zomato");
    assert_eq!(all[1].merchant, "Employer");

    let debits = db
        .list_transactions(&TransactionFilter::new().direction(Some(Direction::Debit)))
        .unwrap();
    assert_eq!(debits.len(), 1);

    let food_rows = db
        .list_transactions(&TransactionFilter::new().category(Some("food".to_string())))
        .unwrap();
    assert_eq!(food_rows.len(), 1);

    let windowed = db
        .count_transactions(
            &TransactionFilter::new()
                .start_date(NaiveDate::from_ymd_opt(2025, 1, 15))
                .end_date(NaiveDate::from_ymd_opt(2025, 1, 31)),
        )
        .unwrap();
    assert_eq!(windowed, 1);

    let paged = db
        .list_transactions(&TransactionFilter::new().limit(1).offset(1))
        .unwrap();
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0].merchant, "Employer");
}

#[test]
fn test_review_queue_and_updates() {
    let db = Database::in_memory().unwrap();
    db.insert_raw_email(&email("e1")).unwrap();

    let mut low = tx("e1", 120.0, "UnknownShop", (2025, 1, 12));
    low.source = TransactionSource::Ai;
    low.confidence = Some(0.5);
    low.needs_review = true;
    let id = low.id.clone();
    db.insert_transaction(&low).unwrap();

    assert_eq!(db.review_count().unwrap(), 1);
    assert_eq!(
        db.review_queue(Some(TransactionSource::Ai)).unwrap().len(),
        1
    );
    assert!(db.review_queue(Some(TransactionSource::Regex)).unwrap().is_empty());

    db.update_transaction_review(&id, false).unwrap();
    assert_eq!(db.review_count().unwrap(), 0);

    db.update_transaction_category(&id, "Shopping").unwrap();
    db.update_transaction_merchant(&id, "Amazon").unwrap();
    let updated = db.get_transaction(&id).unwrap().unwrap();
    assert_eq!(updated.category.as_deref(), Some("Shopping"));
    assert_eq!(updated.merchant, "Amazon");

    assert!(db.update_transaction_category("nope", "Food").is_err());
}

#[test]
fn test_corrections_queries() {
    let db = Database::in_memory().unwrap();

    db.insert_category_correction("Zomato", "Shopping", "Food", None)
        .unwrap();
    db.insert_category_correction("Zomato", "Other", "Food", Some("dinner"))
        .unwrap();
    db.insert_category_correction("Uber", "Other", "Transport", None)
        .unwrap();

    let zomato = db.corrections_by_merchant("zomato", 10).unwrap();
    assert_eq!(zomato.len(), 2);
    // Newest first
    assert_eq!(zomato[0].original_category, "Other");

    let recent = db.recent_corrections(2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].merchant, "Uber");

    assert_eq!(db.count_corrections().unwrap(), 3);
}

#[test]
fn test_duplicate_groups_unique_per_duplicate() {
    let db = Database::in_memory().unwrap();
    db.insert_raw_email(&email("e1")).unwrap();
    db.insert_raw_email(&email("e2")).unwrap();

    let a = tx("e1", 500.0, "Amazon", (2025, 1, 15));
    let b = tx("e2", 500.0, "Amazon", (2025, 1, 15));
    let (id_a, id_b) = (a.id.clone(), b.id.clone());
    db.insert_transaction(&a).unwrap();
    db.insert_transaction(&b).unwrap();

    assert!(db
        .mark_as_duplicate(&id_b, &id_a, "same amount, same day", Some(0.9))
        .unwrap());
    // Idempotent: second recording is ignored
    assert!(!db
        .mark_as_duplicate(&id_b, &id_a, "same amount, same day", Some(0.9))
        .unwrap());
    assert_eq!(db.count_duplicate_groups().unwrap(), 1);

    // The duplicate is flagged for review
    let dup = db.get_transaction(&id_b).unwrap().unwrap();
    assert!(dup.needs_review);
    assert!(db.is_recorded_duplicate(&id_b).unwrap());
    assert!(!db.is_recorded_duplicate(&id_a).unwrap());
}

#[test]
fn test_duplicate_candidates_window() {
    let db = Database::in_memory().unwrap();
    db.insert_raw_email(&email("e1")).unwrap();
    db.insert_raw_email(&email("e2")).unwrap();
    db.insert_raw_email(&email("e3")).unwrap();

    db.insert_transaction(&tx("e1", 500.0, "Amazon", (2025, 1, 15)))
        .unwrap();
    db.insert_transaction(&tx("e2", 500.0, "Amazon IN", (2025, 1, 16)))
        .unwrap();
    // Outside the 1-day tolerance
    db.insert_transaction(&tx("e3", 500.0, "Amazon", (2025, 1, 20)))
        .unwrap();

    let pairs = db.duplicate_candidates(1, None).unwrap();
    assert_eq!(pairs.len(), 1);
    let (t1, t2) = &pairs[0];
    assert!(t1.id < t2.id);
    assert_ne!(t1.email_message_id, t2.email_message_id);

    // Widening the window picks up the far pair too
    let wide = db.duplicate_candidates(7, None).unwrap();
    assert_eq!(wide.len(), 3);

    // Restricting to a new-id set keeps only pairs touching it
    let none = db.duplicate_candidates(1, Some(&[])).unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_same_email_pairs_are_not_candidates() {
    let db = Database::in_memory().unwrap();
    db.insert_raw_email(&email("e1")).unwrap();

    db.insert_transaction(&tx("e1", 250.0, "Swiggy", (2025, 1, 15)))
        .unwrap();
    db.insert_transaction(&tx("e1", 250.0, "Swiggy Instamart", (2025, 1, 15)))
        .unwrap();

    assert!(db.duplicate_candidates(1, None).unwrap().is_empty());
}

#[test]
fn test_sync_state_round_trip_and_monotonic_count() {
    let db = Database::in_memory().unwrap();

    assert!(db.last_sync_timestamp().unwrap().is_none());
    assert_eq!(db.total_synced_count().unwrap(), 0);

    let t1 = Utc.with_ymd_and_hms(2025, 2, 1, 6, 0, 0).unwrap();
    db.record_sync(t1, Some("m9"), 12).unwrap();
    assert_eq!(db.last_sync_timestamp().unwrap(), Some(t1));
    assert_eq!(db.last_message_id().unwrap().as_deref(), Some("m9"));
    assert_eq!(db.total_synced_count().unwrap(), 12);

    let t2 = Utc.with_ymd_and_hms(2025, 2, 2, 6, 0, 0).unwrap();
    db.record_sync(t2, None, 3).unwrap();
    assert_eq!(db.total_synced_count().unwrap(), 15);
    // last_message_id untouched when the listing was empty
    assert_eq!(db.last_message_id().unwrap().as_deref(), Some("m9"));
}

#[test]
fn test_eval_flags() {
    let db = Database::in_memory().unwrap();
    db.insert_raw_email(&email("e1")).unwrap();
    let t = tx("e1", 99.0, "Netflix", (2025, 1, 2));
    let id = t.id.clone();
    db.insert_transaction(&t).unwrap();

    db.insert_eval_flag(&id, EvalVerdict::Correct, None).unwrap();
    db.insert_eval_flag(&id, EvalVerdict::Wrong, Some("wrong merchant"))
        .unwrap();

    let flags = db.list_eval_flags().unwrap();
    assert_eq!(flags.len(), 2);
    assert_eq!(flags[0].verdict, EvalVerdict::Wrong);

    assert!(db
        .insert_eval_flag("missing", EvalVerdict::Correct, None)
        .is_err());
}

#[test]
fn test_unparsed_email_listing() {
    let db = Database::in_memory().unwrap();
    db.insert_raw_email(&email("parsed")).unwrap();
    db.insert_raw_email(&email("skipped")).unwrap();

    db.insert_transaction(&tx("parsed", 10.0, "Chai", (2025, 1, 15)))
        .unwrap();

    let unparsed = db.list_unparsed_emails().unwrap();
    assert_eq!(unparsed.len(), 1);
    assert_eq!(unparsed[0].message_id, "skipped");
}

#[test]
fn test_query_rows_stringifies() {
    let db = Database::in_memory().unwrap();
    db.insert_raw_email(&email("e1")).unwrap();
    db.insert_transaction(&tx("e1", 500.0, "Amazon", (2025, 1, 15)))
        .unwrap();

    let result = db
        .query_rows("SELECT merchant, amount FROM transactions")
        .unwrap();
    assert_eq!(result.columns, vec!["merchant", "amount"]);
    assert_eq!(result.rows, vec![vec!["Amazon".to_string(), "500.00".to_string()]]);
}
