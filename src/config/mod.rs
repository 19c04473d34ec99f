//! Configuration module for candlescan.
//!
//! Settings come from environment variables (a `.env` file is honoured by the
//! binaries through `dotenvy`); command-line flags may override them before
//! `validate` runs.

mod exchange_config;

pub use exchange_config::{BinanceConfig, RetryConfig};

use crate::application::signals::MIN_HISTORY_ROWS;
use crate::domain::market::Timeframe;
use crate::domain::market::symbol::normalize_symbol;
use crate::domain::signals::ScoringModel;
use anyhow::{Context, Result, bail};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_SYMBOLS: &str = "BTC/USDT,ETH/USDT,SOL/USDT,BNB/USDT,XRP/USDT";
const DEFAULT_TIMEFRAMES: &str = "1m,5m,15m,1h,4h,1d";

/// Exchange backends the scanner can be pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    Binance,
    /// Deterministic synthetic market, no network.
    Mock,
}

impl ExchangeKind {
    pub fn id(&self) -> &'static str {
        match self {
            ExchangeKind::Binance => "binance",
            ExchangeKind::Mock => "mock",
        }
    }
}

impl FromStr for ExchangeKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "binance" => Ok(ExchangeKind::Binance),
            "mock" => Ok(ExchangeKind::Mock),
            _ => bail!("Invalid EXCHANGE: {}. Must be 'binance' or 'mock'", s),
        }
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Parses a comma-separated symbol list into normalized "BASE/QUOTE" pairs.
pub fn parse_symbols(raw: &str) -> Result<Vec<String>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(normalize_symbol)
        .collect()
}

pub fn parse_timeframes(raw: &str) -> Result<Vec<Timeframe>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Timeframe::from_str)
        .collect()
}

fn parse_or<T>(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(v) => v
            .trim()
            .parse::<T>()
            .with_context(|| format!("Failed to parse {}", key)),
        None => Ok(default),
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub exchange: ExchangeKind,
    pub symbols: Vec<String>,
    pub timeframes: Vec<Timeframe>,
    pub concurrency: usize,
    pub almost_threshold: usize,
    pub scoring_model: ScoringModel,
    pub fetch_limit: usize,
    pub history_bars: usize,
    pub database_url: String,
    /// Re-run period; `None` runs a single scan.
    pub scan_interval: Option<Duration>,
    pub retry: RetryConfig,
    pub binance: BinanceConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup and validates it.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let exchange = ExchangeKind::from_str(
            &lookup("EXCHANGE").unwrap_or_else(|| "binance".to_string()),
        )?;

        let symbols = parse_symbols(
            &lookup("SYMBOLS").unwrap_or_else(|| DEFAULT_SYMBOLS.to_string()),
        )
        .context("Failed to parse SYMBOLS")?;
        let timeframes = parse_timeframes(
            &lookup("TIMEFRAMES").unwrap_or_else(|| DEFAULT_TIMEFRAMES.to_string()),
        )
        .context("Failed to parse TIMEFRAMES")?;

        let scoring_model = match lookup("SCORING_MODEL") {
            Some(v) => ScoringModel::from_str(&v)?,
            None => ScoringModel::default(),
        };

        let scan_interval = match lookup("SCAN_INTERVAL").filter(|v| !v.trim().is_empty()) {
            Some(v) => Some(Duration::from_secs(
                v.trim()
                    .parse()
                    .context("Failed to parse SCAN_INTERVAL (seconds)")?,
            )),
            None => None,
        };

        let config = Self {
            exchange,
            symbols,
            timeframes,
            concurrency: parse_or(lookup, "CONCURRENCY", 5)?,
            almost_threshold: parse_or(lookup, "ALMOST_THRESHOLD", 7)?,
            scoring_model,
            fetch_limit: parse_or(lookup, "FETCH_LIMIT", 1000)?,
            history_bars: parse_or(lookup, "HISTORY_BARS", 1000)?,
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://market_data.sqlite".to_string()),
            scan_interval,
            retry: RetryConfig::from_lookup(lookup).context("Failed to load retry config")?,
            binance: BinanceConfig::from_lookup(lookup).context("Failed to load Binance config")?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            bail!("SYMBOLS must name at least one pair");
        }
        if self.timeframes.is_empty() {
            bail!("TIMEFRAMES must name at least one timeframe");
        }
        if self.concurrency == 0 {
            bail!("CONCURRENCY must be at least 1");
        }
        if !(1..=11).contains(&self.almost_threshold) {
            bail!(
                "ALMOST_THRESHOLD must be between 1 and 11, got {}",
                self.almost_threshold
            );
        }
        if self.fetch_limit == 0 {
            bail!("FETCH_LIMIT must be at least 1");
        }
        if self.history_bars < MIN_HISTORY_ROWS {
            bail!(
                "HISTORY_BARS must be at least {} to allow scoring, got {}",
                MIN_HISTORY_ROWS,
                self.history_bars
            );
        }
        if self.retry.max_attempts == 0 {
            bail!("FETCH_MAX_ATTEMPTS must be at least 1");
        }
        Ok(())
    }
}
