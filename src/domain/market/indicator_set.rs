use super::candle::Candle;
use serde::{Deserialize, Serialize};

/// Indicator values for one bar. `None` means the indicator is undefined at
/// that bar: its window is not filled yet or its formula would divide by zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_100: Option<f64>,
    pub ema_20: Option<f64>,
    pub rsi_14: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_upper: Option<f64>,
    pub obv: Option<f64>,
    pub obv_ema_7: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    pub adx: Option<f64>,
    pub cci_20: Option<f64>,
    pub stoch_rsi: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
}

/// A candle together with the indicators computed up to and including it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRow {
    pub candle: Candle,
    pub indicators: IndicatorSet,
}

impl EnrichedRow {
    pub fn close(&self) -> f64 {
        self.candle.close
    }

    pub fn timestamp(&self) -> i64 {
        self.candle.timestamp
    }
}
