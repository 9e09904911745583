//! Gmail API message shapes and MIME payload decoding

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::RawEmail;

/// One page of a message listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub result_size_estimate: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
}

/// A full message (`format=full`)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    pub payload: Option<MessagePart>,
    /// Epoch milliseconds, as a string
    pub internal_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    pub mime_type: Option<String>,
    #[serde(default)]
    pub headers: Vec<MessageHeader>,
    pub body: Option<PartBody>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartBody {
    pub data: Option<String>,
    #[serde(default)]
    pub size: u64,
}

impl GmailMessage {
    /// Decode headers and body parts into a RawEmail.
    ///
    /// Body preference: first `text/plain` part, then first
    /// `text/html`, walking the nested multipart tree depth-first.
    pub fn to_raw_email(&self, fetched_at: DateTime<Utc>) -> Result<RawEmail> {
        let payload = self
            .payload
            .as_ref()
            .ok_or_else(|| Error::InvalidData(format!("Message {} has no payload", self.id)))?;

        let from = header_value(payload, "From").unwrap_or_default();
        let subject = header_value(payload, "Subject").unwrap_or_default();
        let date = header_value(payload, "Date")
            .and_then(|d| DateTime::parse_from_rfc2822(&d).ok())
            .map(|d| d.with_timezone(&Utc))
            .or_else(|| {
                self.internal_date
                    .as_deref()
                    .and_then(|ms| ms.parse::<i64>().ok())
                    .and_then(DateTime::from_timestamp_millis)
            })
            .unwrap_or(fetched_at);

        let plain = find_part_data(payload, "text/plain");
        let html = find_part_data(payload, "text/html");

        let body_text = match (&plain, &html) {
            (Some(p), _) => p.clone(),
            (None, Some(h)) => h.clone(),
            (None, None) => {
                return Err(Error::InvalidData(format!(
                    "Message {} has no decodable body",
                    self.id
                )))
            }
        };

        Ok(RawEmail {
            message_id: self.id.clone(),
            from,
            subject,
            date,
            body_text,
            body_html: html,
            fetched_at,
        })
    }
}

fn header_value(part: &MessagePart, name: &str) -> Option<String> {
    part.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.clone())
}

/// Depth-first search for the first part of the given MIME type with
/// decodable body data.
fn find_part_data(part: &MessagePart, mime_type: &str) -> Option<String> {
    if part.mime_type.as_deref() == Some(mime_type) {
        if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
            if let Some(text) = decode_body_data(data) {
                return Some(text);
            }
        }
    }
    part.parts
        .iter()
        .find_map(|child| find_part_data(child, mime_type))
}

/// Gmail body data is URL-safe base64, padded or not
fn decode_body_data(data: &str) -> Option<String> {
    let bytes = base64::engine::general_purpose::URL_SAFE
        .decode(data)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(data))
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(text: &str) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(text)
    }

    fn leaf(mime: &str, text: &str) -> MessagePart {
        MessagePart {
            mime_type: Some(mime.to_string()),
            headers: vec![],
            body: Some(PartBody {
                data: Some(b64(text)),
                size: text.len() as u64,
            }),
            parts: vec![],
        }
    }

    fn message(payload: MessagePart) -> GmailMessage {
        GmailMessage {
            id: "m1".to_string(),
            payload: Some(payload),
            internal_date: Some("1736899200000".to_string()),
        }
    }

    #[test]
    fn test_prefers_text_plain_over_html() {
        let payload = MessagePart {
            mime_type: Some("multipart/alternative".to_string()),
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
            body: None,
            parts: vec![
                leaf("text/html", "<b>Rs. 500 debited</b>"),
                leaf("text/plain", "Rs. 500 debited"),
            ],
        };

        let raw = message(payload).to_raw_email(Utc::now()).unwrap();
        assert_eq!(raw.body_text, "Rs. 500 debited");
        assert_eq!(raw.body_html.as_deref(), Some("<b>Rs. 500 debited</b>"));
        assert_eq!(raw.from, "alerts@hdfcbank.net");
        assert_eq!(raw.subject, "Txn alert");
        assert_eq!(raw.date.to_rfc3339(), "2025-01-15T04:00:00+00:00");
    }

    #[test]
    fn test_html_only_fills_body_text() {
        let payload = MessagePart {
            mime_type: Some("text/html".to_string()),
            headers: vec![],
            body: Some(PartBody {
                data: Some(b64("<p>hi</p>")),
                size: 9,
            }),
            parts: vec![],
        };

        let raw = message(payload).to_raw_email(Utc::now()).unwrap();
        assert_eq!(raw.body_text, "<p>hi</p>");
    }

    #[test]
    fn test_nested_multipart_walk() {
        let payload = MessagePart {
            mime_type: Some("multipart/mixed".to_string()),
            headers: vec![],
            body: None,
            parts: vec![MessagePart {
                mime_type: Some("multipart/alternative".to_string()),
                headers: vec![],
                body: None,
                parts: vec![leaf("text/plain", "inner body")],
            }],
        };

        let raw = message(payload).to_raw_email(Utc::now()).unwrap();
        assert_eq!(raw.body_text, "inner body");
    }

    #[test]
    fn test_missing_body_is_invalid_data() {
        let payload = MessagePart {
            mime_type: Some("multipart/mixed".to_string()),
            headers: vec![],
            body: None,
            parts: vec![],
        };
        assert!(message(payload).to_raw_email(Utc::now()).is_err());
    }

    #[test]
    fn test_internal_date_fallback() {
        let payload = leaf("text/plain", "body");
        let raw = message(payload).to_raw_email(Utc::now()).unwrap();
        // 1736899200000 ms = 2025-01-15T00:00:00Z
        assert_eq!(raw.date.to_rfc3339(), "2025-01-15T00:00:00+00:00");
    }
}
