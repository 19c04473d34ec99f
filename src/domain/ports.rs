use crate::domain::errors::FetchError;
use crate::domain::market::{Candle, Timeframe};
use async_trait::async_trait;

/// Read access to an exchange's candle history.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Identifier stored in the `exchange` column ("binance", "mock", ...).
    fn id(&self) -> &str;

    /// Fetches up to `limit` bars for `symbol`.
    ///
    /// `since` is an inclusive lower bound on the bar open time; `None` asks
    /// for the most recent `limit` bars. Returned candles carry `id()` as
    /// their exchange.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Candle>, FetchError>;
}
