//! Repository abstractions for the candle and signal stores.
//!
//! The scanner only depends on these traits; the SQLite implementations live
//! in `infrastructure::persistence`.

use crate::domain::market::{Candle, SeriesKey, Timeframe};
use crate::domain::signals::{Signal, SignalKind};
use anyhow::Result;
use async_trait::async_trait;

/// Keyed OHLCV time series storage.
#[async_trait]
pub trait CandleRepository: Send + Sync {
    /// Open time of the newest stored bar, `None` when the series is empty.
    async fn last_timestamp(&self, key: &SeriesKey) -> Result<Option<i64>>;

    /// Inserts new bars and overwrites the OHLCV of bars already stored.
    async fn upsert(&self, key: &SeriesKey, candles: &[Candle]) -> Result<()>;

    /// All bars of the series in ascending order, optionally from `from` (inclusive).
    async fn load(&self, key: &SeriesKey, from: Option<i64>) -> Result<Vec<Candle>>;

    /// The newest `limit` bars, ascending.
    async fn recent(&self, key: &SeriesKey, limit: usize) -> Result<Vec<Candle>>;
}

/// Filters for reading back emitted signals.
#[derive(Debug, Clone)]
pub struct SignalQuery {
    pub exchange: Option<String>,
    pub symbol: Option<String>,
    pub timeframe: Option<Timeframe>,
    pub kind: Option<SignalKind>,
    pub limit: usize,
}

impl Default for SignalQuery {
    fn default() -> Self {
        Self {
            exchange: None,
            symbol: None,
            timeframe: None,
            kind: None,
            limit: 500,
        }
    }
}

/// Append-only signal storage.
#[async_trait]
pub trait SignalRepository: Send + Sync {
    /// Inserts the signal unless one already exists for the same
    /// (exchange, symbol, timeframe, timestamp, kind). Returns whether a row
    /// was written.
    async fn insert(&self, signal: &Signal) -> Result<bool>;

    /// Matching signals, newest first.
    async fn find(&self, query: &SignalQuery) -> Result<Vec<Signal>>;
}
