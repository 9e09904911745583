//! The sync protocol: list, fetch in bounded batches, persist, advance
//! the cursor

use chrono::{Months, NaiveDate, Utc};
use tracing::{debug, info, warn};

use super::client::MailClient;
use super::build_query;
use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::models::{RawEmail, SyncOutcome};
use crate::retry::{with_retry, RetryPolicy};

/// Caller overrides for one sync run
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Explicit lower bound; wins over the stored cursor
    pub since: Option<NaiveDate>,
}

/// Incremental mail ingestor.
///
/// Within one run the ordering is: listed, fetched, raw persisted,
/// cursor advanced. Fetches run in parallel inside a bounded batch;
/// each batch completes before the next starts.
pub struct MailIngestor<'a, C: MailClient> {
    db: &'a Database,
    client: &'a C,
    config: &'a Config,
    policy: RetryPolicy,
}

impl<'a, C: MailClient> MailIngestor<'a, C> {
    pub fn new(db: &'a Database, client: &'a C, config: &'a Config) -> Self {
        Self {
            db,
            client,
            config,
            policy: RetryPolicy::from_config(&config.rate_limit),
        }
    }

    /// Run one incremental sync
    pub async fn sync(&self, options: &SyncOptions) -> Result<SyncOutcome> {
        let started_at = Utc::now();
        let since = self.resolve_since(options)?;
        let query = build_query(&self.config.gmail, Some(since));
        info!(%query, "Starting mail sync");

        // Enumerate all matching ids, one provider page at a time
        let mut ids: Vec<String> = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let token = page_token.clone();
            let page = with_retry(&self.policy, || {
                self.client.list_messages(&query, token.as_deref())
            })
            .await?;

            ids.extend(page.messages.iter().map(|m| m.id.clone()));
            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        let messages_found = ids.len();
        debug!(messages_found, "Listing complete");

        // Fetch bodies in bounded batches; a batch is a barrier
        let mut new_message_ids: Vec<String> = Vec::new();
        let batch_size = self.config.gmail.fetch_batch_size.max(1);
        for chunk in ids.chunks(batch_size) {
            let fetches = chunk.iter().map(|id| {
                let id = id.clone();
                async move {
                    with_retry(&self.policy, || self.client.get_message(&id)).await
                }
            });
            let results = futures::future::join_all(fetches).await;

            let mut emails: Vec<RawEmail> = Vec::with_capacity(chunk.len());
            for result in results {
                let message = result?;
                match message.to_raw_email(Utc::now()) {
                    Ok(raw) => emails.push(raw),
                    // A body-less message is skippable, not fatal
                    Err(e) => warn!("Skipping undecodable message: {}", e),
                }
            }

            let inserted = self.db.insert_raw_emails(&emails)?;
            new_message_ids.extend(inserted);
        }

        let new_emails_stored = new_message_ids.len();
        self.db
            .record_sync(started_at, ids.first().map(|s| s.as_str()), new_emails_stored)?;

        info!(messages_found, new_emails_stored, "Mail sync complete");
        Ok(SyncOutcome {
            messages_found,
            new_emails_stored,
            new_message_ids,
            sync_timestamp: Some(started_at),
        })
    }

    /// since precedence: caller override > stored cursor > default lookback
    fn resolve_since(&self, options: &SyncOptions) -> Result<NaiveDate> {
        if let Some(since) = options.since {
            return Ok(since);
        }
        if let Some(last) = self.db.last_sync_timestamp()? {
            return Ok(last.date_naive());
        }
        let lookback = Months::new(self.config.sync.default_lookback_months);
        Ok(Utc::now()
            .date_naive()
            .checked_sub_months(lookback)
            .unwrap_or_else(|| Utc::now().date_naive()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::message::{
        GmailMessage, MessageHeader, MessageList, MessagePart, MessageRef, PartBody,
    };
    use base64::Engine;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted provider: two listing pages, bodies keyed by id,
    /// optionally rate-limiting the first N calls.
    struct ScriptedClient {
        ids: Vec<String>,
        rate_limit_first: AtomicUsize,
        list_calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(ids: &[&str]) -> Self {
            Self {
                ids: ids.iter().map(|s| s.to_string()).collect(),
                rate_limit_first: AtomicUsize::new(0),
                list_calls: AtomicUsize::new(0),
            }
        }

        fn rate_limit_first(self, n: usize) -> Self {
            self.rate_limit_first.store(n, Ordering::SeqCst);
            self
        }
    }

    #[async_trait::async_trait]
    impl MailClient for ScriptedClient {
        async fn list_messages(
            &self,
            _query: &str,
            page_token: Option<&str>,
        ) -> Result<MessageList> {
            if self
                .rate_limit_first
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(crate::error::Error::RateLimited("scripted 429".to_string()));
            }
            self.list_calls.fetch_add(1, Ordering::SeqCst);

            // Two pages: first half, then the rest
            let half = self.ids.len().div_ceil(2);
            let (slice, next) = match page_token {
                None => (&self.ids[..half], Some("page2".to_string())),
                Some(_) => (&self.ids[half..], None),
            };
            Ok(MessageList {
                messages: slice
                    .iter()
                    .map(|id| MessageRef {
                        id: id.clone(),
                        thread_id: id.clone(),
                    })
                    .collect(),
                next_page_token: next,
                result_size_estimate: self.ids.len() as u64,
            })
        }

        async fn get_message(&self, id: &str) -> Result<GmailMessage> {
            let body = base64::engine::general_purpose::URL_SAFE_NO_PAD
                .encode(format!("Rs. 500 debited ({})", id));
            Ok(GmailMessage {
                id: id.to_string(),
                payload: Some(MessagePart {
                    mime_type: Some("text/plain".to_string()),
                    headers: vec![
                        MessageHeader {
                            name: "From".to_string(),
                            value: "alerts@hdfcbank.net".to_string(),
                        },
                        MessageHeader {
                            name: "Subject".to_string(),
                            value: "Txn alert".to_string(),
                        },
                        MessageHeader {
                            name: "Date".to_string(),
                            value: "Wed, 15 Jan 2025 09:30:00 +0530".to_string(),
                        },
                    ],
                    body: Some(PartBody {
                        data: Some(body),
                        size: 10,
                    }),
                    parts: vec![],
                }),
                internal_date: None,
            })
        }
    }

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.rate_limit.initial_delay_ms = 1;
        config.rate_limit.max_delay_ms = 2;
        config.gmail.fetch_batch_size = 2;
        config
    }

    #[tokio::test]
    async fn test_sync_stores_and_advances_cursor() {
        let db = Database::in_memory().unwrap();
        let client = ScriptedClient::new(&["m1", "m2", "m3"]);
        let config = fast_config();

        let outcome = MailIngestor::new(&db, &client, &config)
            .sync(&SyncOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.messages_found, 3);
        assert_eq!(outcome.new_emails_stored, 3);
        assert_eq!(outcome.new_message_ids, vec!["m1", "m2", "m3"]);
        assert!(outcome.sync_timestamp.is_some());

        assert_eq!(db.count_raw_emails().unwrap(), 3);
        assert_eq!(db.last_message_id().unwrap().as_deref(), Some("m1"));
        assert_eq!(db.total_synced_count().unwrap(), 3);
        assert!(db.last_sync_timestamp().unwrap().is_some());
        // Pagination was exercised
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_sync_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let client = ScriptedClient::new(&["m1", "m2"]);
        let config = fast_config();
        let ingestor = MailIngestor::new(&db, &client, &config);

        let first = ingestor.sync(&SyncOptions::default()).await.unwrap();
        assert_eq!(first.new_emails_stored, 2);

        let second = ingestor.sync(&SyncOptions::default()).await.unwrap();
        assert_eq!(second.messages_found, 2);
        assert_eq!(second.new_emails_stored, 0);
        assert!(second.new_message_ids.is_empty());

        // Totals only count genuinely new rows
        assert_eq!(db.total_synced_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rate_limited_listing_is_retried() {
        let db = Database::in_memory().unwrap();
        let client = ScriptedClient::new(&["m1"]).rate_limit_first(2);
        let config = fast_config();

        let outcome = MailIngestor::new(&db, &client, &config)
            .sync(&SyncOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.new_emails_stored, 1);
    }

    #[tokio::test]
    async fn test_since_precedence() {
        let db = Database::in_memory().unwrap();
        let client = ScriptedClient::new(&[]);
        let config = fast_config();
        let ingestor = MailIngestor::new(&db, &client, &config);

        // No cursor: default lookback applies
        let fallback = ingestor.resolve_since(&SyncOptions::default()).unwrap();
        let expected = Utc::now()
            .date_naive()
            .checked_sub_months(Months::new(3))
            .unwrap();
        assert_eq!(fallback, expected);

        // Stored cursor beats the lookback
        let t = chrono::TimeZone::with_ymd_and_hms(&Utc, 2025, 3, 1, 8, 0, 0).unwrap();
        db.record_sync(t, None, 0).unwrap();
        let from_cursor = ingestor.resolve_since(&SyncOptions::default()).unwrap();
        assert_eq!(from_cursor, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());

        // Explicit option beats the cursor
        let explicit = ingestor
            .resolve_since(&SyncOptions {
                since: NaiveDate::from_ymd_opt(2024, 12, 25),
            })
            .unwrap();
        assert_eq!(explicit, NaiveDate::from_ymd_opt(2024, 12, 25).unwrap());
    }
}
