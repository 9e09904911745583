//! Configuration loading and merging
//!
//! Defaults live in code. An optional `~/.expense-tracker/config.json`
//! is deep-merged on top of them: objects merge key by key, everything
//! else (including arrays) is replaced wholesale, so a user file can
//! shrink the sender allow-lists rather than only grow them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable overriding the store path
pub const DB_PATH_ENV: &str = "EXPENSE_TRACKER_DB";

/// Environment variable overriding the model binary
pub const MODEL_BIN_ENV: &str = "KHARCHA_MODEL_BIN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GmailConfig {
    /// Allow-listed from-addresses (OR within the list)
    pub senders: Vec<String>,
    /// Allow-listed subject words (OR within the list)
    pub subject_keywords: Vec<String>,
    /// Loopback OAuth server port
    pub redirect_port: u16,
    /// Max wait for the OAuth callback
    pub auth_timeout_ms: u64,
    /// Parallelism cap per message-fetch batch
    pub fetch_batch_size: usize,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            senders: vec![
                "alerts@hdfcbank.net".to_string(),
                "alerts@icicibank.com".to_string(),
                "alerts@axisbank.com".to_string(),
                "alerts@sbi.co.in".to_string(),
                "alerts@kotak.com".to_string(),
                "noreply@phonepe.com".to_string(),
                "no-reply@paytm.com".to_string(),
                "donotreply@camsonline.com".to_string(),
            ],
            subject_keywords: vec![
                "transaction".to_string(),
                "debited".to_string(),
                "credited".to_string(),
                "payment".to_string(),
                "UPI".to_string(),
                "statement".to_string(),
            ],
            redirect_port: 8085,
            auth_timeout_ms: 120_000,
            fetch_batch_size: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CurrencyConfig {
    pub code: String,
    pub locale: String,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            code: "INR".to_string(),
            locale: "en-IN".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertsConfig {
    /// Current week must exceed avg × threshold to fire a spike
    pub spike_threshold: f64,
    /// Debits at or above this amount fire a large-transaction alert
    pub large_transaction_amount: f64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            spike_threshold: 1.4,
            large_transaction_amount: 10_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// How far back the first sync reaches when no cursor exists
    pub default_lookback_months: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_lookback_months: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParserConfig {
    /// AI parses below this confidence are queued for review
    pub confidence_threshold: f64,
    /// Body text sent to the fallback parser is cut at this length
    pub body_truncation_limit: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            body_truncation_limit: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateLimitConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 32_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DedupConfig {
    /// Candidate pairs must be within this many days of each other
    pub date_tolerance_days: i64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            date_tolerance_days: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoriesConfig {
    pub list: Vec<String>,
    pub descriptions: std::collections::BTreeMap<String, String>,
}

impl Default for CategoriesConfig {
    fn default() -> Self {
        let defaults = crate::categories::default_categories();
        Self {
            list: defaults.iter().map(|c| c.name.to_string()).collect(),
            descriptions: defaults
                .iter()
                .map(|c| (c.name.to_string(), c.description.to_string()))
                .collect(),
        }
    }
}

/// Top-level configuration (closed set of recognized options)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub gmail: GmailConfig,
    pub currency: CurrencyConfig,
    pub alerts: AlertsConfig,
    pub sync: SyncConfig,
    pub parser: ParserConfig,
    pub rate_limit: RateLimitConfig,
    pub dedup: DedupConfig,
    pub categories: CategoriesConfig,
}

impl Config {
    /// Load defaults merged with `config.json` from the data dir, if present
    pub fn load() -> Result<Self> {
        Self::load_from(&data_dir())
    }

    /// Load defaults merged with `<dir>/config.json`, if present
    pub fn load_from(dir: &Path) -> Result<Self> {
        let path = dir.join("config.json");
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)?;
        let user: Value = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        let mut base = serde_json::to_value(Self::default())?;
        deep_merge(&mut base, user);

        debug!(path = %path.display(), "Loaded user config overrides");
        serde_json::from_value(base).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Path of the store, honoring the `EXPENSE_TRACKER_DB` override
    pub fn db_path(&self) -> PathBuf {
        match std::env::var(DB_PATH_ENV) {
            Ok(p) if !p.is_empty() => PathBuf::from(p),
            _ => data_dir().join("data.db"),
        }
    }

    /// Model binary to invoke, honoring the `KHARCHA_MODEL_BIN` override
    pub fn model_bin(&self) -> String {
        std::env::var(MODEL_BIN_ENV).unwrap_or_else(|_| "claude".to_string())
    }
}

/// Persistent layout root: `~/.expense-tracker/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".expense-tracker")
}

/// Recursively merge `user` into `base`.
///
/// Objects merge key by key; arrays and scalars replace the base
/// value wholesale.
fn deep_merge(base: &mut Value, user: Value) {
    match (base, user) {
        (Value::Object(base_map), Value::Object(user_map)) => {
            for (key, user_val) in user_map {
                match base_map.get_mut(&key) {
                    Some(base_val) => deep_merge(base_val, user_val),
                    None => {
                        base_map.insert(key, user_val);
                    }
                }
            }
        }
        (base_slot, user_val) => *base_slot = user_val,
    }
}
