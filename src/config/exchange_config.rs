//! Exchange connection and fetch retry settings.

use anyhow::{Context, Result};
use std::time::Duration;

/// Binance REST configuration. Klines are public, so the API key is optional.
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout_ms: u64,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.com".to_string(),
            api_key: String::new(),
            request_timeout_ms: 30_000,
        }
    }
}

impl BinanceConfig {
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            base_url: lookup("BINANCE_BASE_URL").unwrap_or(defaults.base_url),
            api_key: lookup("BINANCE_API_KEY").unwrap_or_default(),
            request_timeout_ms: match lookup("BINANCE_TIMEOUT_MS") {
                Some(v) => v.trim().parse().context("Failed to parse BINANCE_TIMEOUT_MS")?,
                None => defaults.request_timeout_ms,
            },
        })
    }
}

/// Retry policy for transient fetch failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, the first call included.
    pub max_attempts: u32,
    /// Wait after failed attempt `n` is `base_delay * n`.
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let max_attempts = match lookup("FETCH_MAX_ATTEMPTS") {
            Some(v) => v.trim().parse().context("Failed to parse FETCH_MAX_ATTEMPTS")?,
            None => defaults.max_attempts,
        };
        let base_delay = match lookup("FETCH_RETRY_BASE_MS") {
            Some(v) => Duration::from_millis(
                v.trim().parse().context("Failed to parse FETCH_RETRY_BASE_MS")?,
            ),
            None => defaults.base_delay,
        };
        Ok(Self {
            max_attempts,
            base_delay,
        })
    }

    /// Delay before the attempt that follows failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}
