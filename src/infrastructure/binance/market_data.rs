//! Binance spot klines over the public REST API.

use crate::config::BinanceConfig;
use crate::domain::errors::FetchError;
use crate::domain::market::symbol::denormalize_symbol;
use crate::domain::market::{Candle, Timeframe};
use crate::domain::ports::ExchangeClient;
use crate::infrastructure::core::HttpClientFactory;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Binance caps `limit` on `/api/v3/klines` at 1000.
pub const MAX_KLINES_PER_REQUEST: usize = 1000;

const INVALID_SYMBOL_CODE: i64 = -1121;

#[derive(Debug, Deserialize)]
struct BinanceErrorBody {
    code: i64,
    msg: String,
}

pub struct BinanceExchangeClient {
    client: Client,
    api_key: String,
    base_url: String,
    request_timeout: Duration,
}

impl BinanceExchangeClient {
    pub fn new(config: &BinanceConfig) -> Self {
        let request_timeout = Duration::from_millis(config.request_timeout_ms);
        Self {
            client: HttpClientFactory::create_client(request_timeout),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout,
        }
    }

    fn map_transport_error(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                duration_ms: self.request_timeout.as_millis() as u64,
            }
        } else {
            FetchError::Network {
                reason: error.to_string(),
            }
        }
    }
}

/// Classifies a non-success klines response.
pub fn map_status_error(status: StatusCode, body: &str, symbol: &str) -> FetchError {
    let detail = serde_json::from_str::<BinanceErrorBody>(body).ok();

    if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
        return FetchError::RateLimited {
            reason: format!("HTTP {}: {}", status.as_u16(), body),
        };
    }
    if status.is_server_error() {
        return FetchError::Network {
            reason: format!("HTTP {}: {}", status.as_u16(), body),
        };
    }
    match detail {
        Some(detail) if detail.code == INVALID_SYMBOL_CODE => FetchError::SymbolNotFound {
            symbol: symbol.to_string(),
        },
        Some(detail) => FetchError::Rejected {
            reason: format!("{} ({})", detail.msg, detail.code),
        },
        None => FetchError::Rejected {
            reason: format!("HTTP {}: {}", status.as_u16(), body),
        },
    }
}

/// Parses the klines array: `[openTime, "open", "high", "low", "close", "volume", ...]`.
/// Malformed rows are skipped.
pub fn parse_klines(
    exchange: &str,
    symbol: &str,
    timeframe: Timeframe,
    klines: Vec<serde_json::Value>,
) -> Vec<Candle> {
    klines
        .into_iter()
        .filter_map(|k| {
            let arr = k.as_array()?;
            if arr.len() < 6 {
                return None;
            }

            let field = |i: usize| -> Option<f64> { arr[i].as_str()?.parse::<f64>().ok() };

            Some(Candle {
                exchange: exchange.to_string(),
                symbol: symbol.to_string(),
                timeframe,
                timestamp: arr[0].as_i64()?,
                open: field(1)?,
                high: field(2)?,
                low: field(3)?,
                close: field(4)?,
                volume: field(5)?,
            })
        })
        .collect()
}

#[async_trait]
impl ExchangeClient for BinanceExchangeClient {
    fn id(&self) -> &str {
        "binance"
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Candle>, FetchError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let api_symbol = denormalize_symbol(symbol);
        let limit = limit.clamp(1, MAX_KLINES_PER_REQUEST).to_string();

        let mut params = vec![
            ("symbol", api_symbol),
            ("interval", timeframe.code().to_string()),
            ("limit", limit),
        ];
        if let Some(since) = since {
            params.push(("startTime", since.to_string()));
        }

        let mut request = self.client.get(&url).query(&params);
        if !self.api_key.is_empty() {
            request = request.header("X-MBX-APIKEY", &self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = map_status_error(status, &body, symbol);
            warn!("BinanceExchangeClient: klines {} {} failed: {}", symbol, timeframe, error);
            return Err(error);
        }

        let klines: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let candles = parse_klines(self.id(), symbol, timeframe, klines);
        debug!(
            "BinanceExchangeClient: fetched {} klines for {} {}",
            candles.len(),
            symbol,
            timeframe
        );
        Ok(candles)
    }
}
