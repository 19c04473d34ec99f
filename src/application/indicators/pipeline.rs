use super::directional::DirectionalMovementIndex;
use super::window::RollingWindow;
use crate::domain::market::{Candle, EnrichedRow, IndicatorSet};
use anyhow::{Result, anyhow};
use ta::Next;
use ta::indicators::ExponentialMovingAverage;

const SMA_FAST: usize = 20;
const SMA_MEDIUM: usize = 50;
const SMA_SLOW: usize = 100;
const EMA_PERIOD: usize = 20;
const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const BB_STD_DEV: f64 = 2.0;
const OBV_EMA_PERIOD: usize = 7;
const DMI_PERIOD: usize = 14;
const CCI_PERIOD: usize = 20;
const CCI_CONSTANT: f64 = 0.015;
const STOCH_PERIOD: usize = 14;
const STOCH_SMOOTH_K: usize = 3;
const STOCH_SMOOTH_D: usize = 3;

fn ema(period: usize) -> Result<ExponentialMovingAverage> {
    ExponentialMovingAverage::new(period).map_err(|e| anyhow!("Invalid EMA period {}: {:?}", period, e))
}

/// Streaming indicator computation over one series.
///
/// Feed candles oldest first. Every value in the returned row depends only on
/// the candles already fed, so enriching a prefix of a series yields exactly
/// the same rows as the head of the full enrichment.
pub struct IndicatorPipeline {
    prev_close: Option<f64>,

    close_20: RollingWindow,
    close_50: RollingWindow,
    close_100: RollingWindow,
    ema_20: ExponentialMovingAverage,

    macd_fast: ExponentialMovingAverage,
    macd_slow: ExponentialMovingAverage,
    macd_signal: ExponentialMovingAverage,

    gains: RollingWindow,
    losses: RollingWindow,
    rsi_history: RollingWindow,
    stoch_k: RollingWindow,
    stoch_d: RollingWindow,

    obv: f64,
    obv_ema: ExponentialMovingAverage,

    typical_price: RollingWindow,
    dmi: DirectionalMovementIndex,
}

impl IndicatorPipeline {
    pub fn new() -> Result<Self> {
        Ok(Self {
            prev_close: None,
            close_20: RollingWindow::new(SMA_FAST),
            close_50: RollingWindow::new(SMA_MEDIUM),
            close_100: RollingWindow::new(SMA_SLOW),
            ema_20: ema(EMA_PERIOD)?,
            macd_fast: ema(MACD_FAST)?,
            macd_slow: ema(MACD_SLOW)?,
            macd_signal: ema(MACD_SIGNAL)?,
            gains: RollingWindow::new(RSI_PERIOD),
            losses: RollingWindow::new(RSI_PERIOD),
            rsi_history: RollingWindow::new(STOCH_PERIOD),
            stoch_k: RollingWindow::new(STOCH_SMOOTH_K),
            stoch_d: RollingWindow::new(STOCH_SMOOTH_D),
            obv: 0.0,
            obv_ema: ema(OBV_EMA_PERIOD)?,
            typical_price: RollingWindow::new(CCI_PERIOD),
            dmi: DirectionalMovementIndex::new(DMI_PERIOD),
        })
    }

    pub fn next(&mut self, candle: &Candle) -> EnrichedRow {
        let close = candle.close;
        let delta = self.prev_close.map(|prev| close - prev);
        self.prev_close = Some(close);

        // Bollinger bands share the SMA(20) window
        self.close_20.push(Some(close));
        self.close_50.push(Some(close));
        self.close_100.push(Some(close));
        let sma_20 = self.close_20.mean();
        let (bb_lower, bb_upper) = match (sma_20, self.close_20.std_dev()) {
            (Some(mid), Some(sd)) => (Some(mid - BB_STD_DEV * sd), Some(mid + BB_STD_DEV * sd)),
            _ => (None, None),
        };

        // MACD
        let macd_line = self.macd_fast.next(close) - self.macd_slow.next(close);
        let macd_signal = self.macd_signal.next(macd_line);

        // RSI and its stochastic
        self.gains.push(delta.map(|d| d.max(0.0)));
        self.losses.push(delta.map(|d| (-d).max(0.0)));
        let rsi_14 = match (self.gains.mean(), self.losses.mean()) {
            (Some(gain), Some(loss)) if loss != 0.0 => Some(100.0 - 100.0 / (1.0 + gain / loss)),
            _ => None,
        };
        self.rsi_history.push(rsi_14);
        let stoch_rsi = match (rsi_14, self.rsi_history.min(), self.rsi_history.max()) {
            (Some(rsi), Some(lo), Some(hi)) if hi != lo => Some(100.0 * (rsi - lo) / (hi - lo)),
            _ => None,
        };
        let stoch_k = self.stoch_k.next_mean(stoch_rsi);
        let stoch_d = self.stoch_d.next_mean(stoch_k);

        // OBV
        if let Some(d) = delta {
            if d > 0.0 {
                self.obv += candle.volume;
            } else if d < 0.0 {
                self.obv -= candle.volume;
            }
        }
        let obv_ema_7 = self.obv_ema.next(self.obv);

        // CCI
        let typical = candle.typical_price();
        self.typical_price.push(Some(typical));
        let cci_20 = match (self.typical_price.mean(), self.typical_price.mean_abs_dev()) {
            (Some(mean), Some(mad)) if mad != 0.0 => Some((typical - mean) / (CCI_CONSTANT * mad)),
            _ => None,
        };

        let directional = self.dmi.next(candle.high, candle.low, close);

        EnrichedRow {
            candle: candle.clone(),
            indicators: IndicatorSet {
                sma_20,
                sma_50: self.close_50.mean(),
                sma_100: self.close_100.mean(),
                ema_20: Some(self.ema_20.next(close)),
                rsi_14,
                macd_line: Some(macd_line),
                macd_signal: Some(macd_signal),
                macd_hist: Some(macd_line - macd_signal),
                bb_lower,
                bb_middle: sma_20,
                bb_upper,
                obv: Some(self.obv),
                obv_ema_7: Some(obv_ema_7),
                plus_di: directional.plus_di,
                minus_di: directional.minus_di,
                adx: directional.adx,
                cci_20,
                stoch_rsi,
                stoch_k,
                stoch_d,
            },
        }
    }
}

/// Enriches a whole series (ascending by timestamp) in one pass.
pub fn enrich(candles: &[Candle]) -> Result<Vec<EnrichedRow>> {
    let mut pipeline = IndicatorPipeline::new()?;
    Ok(candles.iter().map(|c| pipeline.next(c)).collect())
}
