//! Ambient configuration for the shared client.
//!
//! The shared [`ApiClient`](crate::ApiClient) is built from environment
//! variables the first time it is needed:
//!
//! | Variable | Default |
//! |---|---|
//! | `POSTMARK_API_TOKEN` | required |
//! | `POSTMARK_API_URL` | `https://api.postmarkapp.com` |
//! | `POSTMARK_MAX_ATTEMPTS` | `3` |
//! | `POSTMARK_RETRY_BASE_DELAY_MS` | `200` |
//! | `POSTMARK_RETRY_MAX_DELAY_MS` | `5000` |
//! | `POSTMARK_TIMEOUT_SECS` | `60` |

use crate::retry::RetryPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.postmarkapp.com";

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 200;
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5_000;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Settings needed to build an [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_token: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_retry_base_delay_ms() -> u64 {
    DEFAULT_RETRY_BASE_DELAY_MS
}

fn default_retry_max_delay_ms() -> u64 {
    DEFAULT_RETRY_MAX_DELAY_MS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ClientConfig {
    /// Config with the given token and every other setting at its default.
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            api_url: default_api_url(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            retry_max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_token = get("POSTMARK_API_TOKEN")
            .ok_or_else(|| Error::Configuration("POSTMARK_API_TOKEN is not set".to_string()))?;

        let mut config = Self::new(api_token.trim());
        if let Some(url) = get("POSTMARK_API_URL") {
            config.api_url = url.trim().to_string();
        }
        if let Some(value) = get("POSTMARK_MAX_ATTEMPTS") {
            config.max_attempts = parse_number("POSTMARK_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = get("POSTMARK_RETRY_BASE_DELAY_MS") {
            config.retry_base_delay_ms = parse_number("POSTMARK_RETRY_BASE_DELAY_MS", &value)?;
        }
        if let Some(value) = get("POSTMARK_RETRY_MAX_DELAY_MS") {
            config.retry_max_delay_ms = parse_number("POSTMARK_RETRY_MAX_DELAY_MS", &value)?;
        }
        if let Some(value) = get("POSTMARK_TIMEOUT_SECS") {
            config.timeout_secs = parse_number("POSTMARK_TIMEOUT_SECS", &value)?;
        }

        if config.max_attempts == 0 {
            return Err(Error::Configuration(
                "POSTMARK_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }

    /// Exponential policy from the attempt and delay settings.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.max_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
        )
    }

    /// Per-request timeout for the default transport.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Configuration(format!("{key} must be a non-negative integer, got {value:?}")))
}
