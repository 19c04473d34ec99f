use crate::config::RetryConfig;
use crate::domain::errors::FetchError;
use crate::domain::market::{Candle, SeriesKey, Timeframe};
use crate::domain::ports::ExchangeClient;
use crate::domain::repositories::CandleRepository;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one incremental fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Bars newer than anything stored before this fetch, ascending. Empty
    /// when the exchange had nothing new.
    Fetched(Vec<Candle>),
    /// The exchange could not serve this key; the scan moves on without it.
    Skipped { reason: FetchError },
}

/// Brings one stored series up to date with the exchange.
pub struct IncrementalFetcher {
    exchange: Arc<dyn ExchangeClient>,
    candles: Arc<dyn CandleRepository>,
    retry: RetryConfig,
    limit: usize,
}

impl IncrementalFetcher {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        candles: Arc<dyn CandleRepository>,
        retry: RetryConfig,
        limit: usize,
    ) -> Self {
        Self {
            exchange,
            candles,
            retry,
            limit,
        }
    }

    pub fn key(&self, symbol: &str, timeframe: Timeframe) -> SeriesKey {
        SeriesKey::new(self.exchange.id(), symbol, timeframe)
    }

    /// Inclusive lower bound for the next request: the bar after the newest
    /// stored one, or `None` for an empty series.
    pub async fn since(&self, key: &SeriesKey) -> Result<Option<i64>> {
        Ok(self
            .candles
            .last_timestamp(key)
            .await?
            .map(|last| key.next_bar_after(last)))
    }

    /// Fetches new bars for (symbol, timeframe) and upserts them.
    ///
    /// Exchange failures never surface as `Err`; only storage errors do.
    pub async fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<FetchOutcome> {
        let key = self.key(symbol, timeframe);
        let last = self.candles.last_timestamp(&key).await?;
        let since = last.map(|ts| key.next_bar_after(ts));

        let mut candles = match self.fetch_with_retry(&key, since).await {
            Ok(candles) => candles,
            Err(reason) => return Ok(FetchOutcome::Skipped { reason }),
        };

        if candles.is_empty() {
            debug!("IncrementalFetcher: {} is up to date", key);
            return Ok(FetchOutcome::Fetched(candles));
        }

        candles.sort_by_key(|c| c.timestamp);
        self.candles.upsert(&key, &candles).await?;

        // Exchanges may echo the last stored bar; it is refreshed but not new.
        if let Some(last) = last {
            candles.retain(|c| c.timestamp > last);
        }
        debug!("IncrementalFetcher: {} +{} bars", key, candles.len());
        Ok(FetchOutcome::Fetched(candles))
    }

    async fn fetch_with_retry(
        &self,
        key: &SeriesKey,
        since: Option<i64>,
    ) -> Result<Vec<Candle>, FetchError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self
                .exchange
                .fetch_candles(&key.symbol, key.timeframe, since, self.limit)
                .await
            {
                Ok(candles) => return Ok(candles),
                Err(e) if e.is_permanent() => {
                    warn!("IncrementalFetcher: {} skipped, permanent error: {}", key, e);
                    return Err(e);
                }
                Err(e) if attempt >= max_attempts => {
                    warn!(
                        "IncrementalFetcher: {} skipped after {} attempts: {}",
                        key, attempt, e
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.retry.delay_after(attempt);
                    info!(
                        "IncrementalFetcher: {} attempt {}/{} failed ({}), retrying in {:?}",
                        key, attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
