//! Gmail REST client behind a mail-client capability

use async_trait::async_trait;
use tracing::debug;

use super::message::{GmailMessage, MessageList};
use crate::error::{Error, Result};

const API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Read-only mail provider capability.
///
/// Production uses the Gmail REST API; tests substitute a scripted
/// client. Implementations map provider throttling to
/// `Error::RateLimited` so the retry controller can act on it.
#[async_trait]
pub trait MailClient: Send + Sync {
    /// One page of message ids matching the query
    async fn list_messages(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<MessageList>;

    /// Full message body and headers
    async fn get_message(&self, id: &str) -> Result<GmailMessage>;
}

/// Gmail REST implementation
pub struct GmailClient {
    http: reqwest::Client,
    access_token: String,
}

impl GmailClient {
    pub fn new(access_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::RateLimited(format!("Gmail 429: {}", body)));
        }
        if status == reqwest::StatusCode::FORBIDDEN {
            // Gmail signals per-user quota exhaustion as 403 with a
            // rateLimitExceeded reason in the error body
            let body = response.text().await.unwrap_or_default();
            if body.contains("rateLimitExceeded") || body.contains("userRateLimitExceeded") {
                return Err(Error::RateLimited(format!("Gmail 403: {}", body)));
            }
            return Err(Error::Auth(format!("Gmail 403: {}", body)));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Auth("Gmail access token rejected".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::InvalidData(format!("Gmail {}: {}", status, body)));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl MailClient for GmailClient {
    async fn list_messages(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<MessageList> {
        let url = format!("{}/messages", API_BASE);
        let mut params = vec![("q", query), ("maxResults", "100")];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        debug!(query, page = page_token.is_some(), "Listing messages");
        self.get_json(&url, &params).await
    }

    async fn get_message(&self, id: &str) -> Result<GmailMessage> {
        let url = format!("{}/messages/{}", API_BASE, id);
        self.get_json(&url, &[("format", "full")]).await
    }
}
