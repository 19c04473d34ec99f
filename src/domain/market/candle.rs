use super::timeframe::Timeframe;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One OHLCV bar. `timestamp` is the bar's open time in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub exchange: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn key(&self) -> SeriesKey {
        SeriesKey::new(&self.exchange, &self.symbol, self.timeframe)
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Identifies one stored time series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    pub exchange: String,
    pub symbol: String,
    pub timeframe: Timeframe,
}

impl SeriesKey {
    pub fn new(exchange: &str, symbol: &str, timeframe: Timeframe) -> Self {
        Self {
            exchange: exchange.to_string(),
            symbol: symbol.to_string(),
            timeframe,
        }
    }

    /// Start of the bar that follows `timestamp` in this series.
    pub fn next_bar_after(&self, timestamp: i64) -> i64 {
        timestamp + self.timeframe.duration_ms()
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.exchange, self.symbol, self.timeframe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_key_display() {
        let key = SeriesKey::new("binance", "BTC/USDT", Timeframe::FourHour);
        assert_eq!(key.to_string(), "binance:BTC/USDT:4h");
    }

    #[test]
    fn test_next_bar_after_uses_timeframe_duration() {
        for tf in Timeframe::all() {
            let key = SeriesKey::new("binance", "ETH/USDT", tf);
            assert_eq!(key.next_bar_after(1_000), 1_000 + tf.duration_ms());
        }
    }

    #[test]
    fn test_typical_price() {
        let candle = Candle {
            exchange: "binance".to_string(),
            symbol: "BTC/USDT".to_string(),
            timeframe: Timeframe::OneHour,
            timestamp: 0,
            open: 10.0,
            high: 12.0,
            low: 9.0,
            close: 11.0,
            volume: 1.0,
        };
        assert!((candle.typical_price() - 32.0 / 3.0).abs() < 1e-12);
        assert_eq!(candle.key(), SeriesKey::new("binance", "BTC/USDT", Timeframe::OneHour));
    }
}
