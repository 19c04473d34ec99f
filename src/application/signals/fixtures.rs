//! Engineered price series shared by unit and integration tests.

#[cfg(test)]
use crate::application::indicators::enrich;
#[cfg(test)]
use crate::domain::market::{Candle, EnrichedRow, IndicatorSet, Timeframe};

/// A slow choppy decline (84 bars), a steady 14-bar bleed, then one final
/// move of `final_move`. 100 bars in total. A -40 crash satisfies every
/// oversold condition on the last bar.
pub fn bleed_then(final_move: f64) -> Vec<f64> {
    let mut closes = vec![1000.0];
    for i in 1..=84 {
        let last = closes[closes.len() - 1];
        closes.push(if i % 2 == 1 { last - 2.0 } else { last + 1.0 });
    }
    for _ in 0..14 {
        let last = closes[closes.len() - 1];
        closes.push(last - 2.0);
    }
    let last = closes[closes.len() - 1];
    closes.push(last + final_move);
    closes
}

#[cfg(test)]
pub fn candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            exchange: "binance".to_string(),
            symbol: "BTC/USDT".to_string(),
            timeframe: Timeframe::OneHour,
            timestamp: i as i64 * Timeframe::OneHour.duration_ms(),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 10.0,
        })
        .collect()
}

#[cfg(test)]
pub fn enriched(closes: &[f64]) -> Vec<EnrichedRow> {
    enrich(&candles(closes)).unwrap()
}

#[cfg(test)]
/// `len` identical rows; only the last one matters to the vote scorer.
pub fn rows_ending_with(close: f64, indicators: IndicatorSet, len: usize) -> Vec<EnrichedRow> {
    let row = EnrichedRow {
        candle: candles(&[close]).remove(0),
        indicators,
    };
    vec![row; len]
}
