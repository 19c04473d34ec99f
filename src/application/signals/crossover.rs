use super::{MIN_HISTORY_ROWS, SignalScorer};
use crate::domain::market::EnrichedRow;
use crate::domain::signals::{CrossoverDetails, ScoredSignal, SignalDetails, SignalKind};
use tracing::debug;

const RSI_OVERSOLD: f64 = 30.0;

/// Long entry on a MACD cross-up out of oversold RSI, confirmed by close
/// above EMA20. Needs the last two rows.
#[derive(Debug, Clone, Default)]
pub struct CrossoverScorer;

impl CrossoverScorer {
    pub fn new() -> Self {
        Self
    }

    fn triggers(prev: &EnrichedRow, last: &EnrichedRow) -> Option<bool> {
        let (p, l) = (&prev.indicators, &last.indicators);
        let crossed_up = p.macd_line? <= p.macd_signal? && l.macd_line? > l.macd_signal?;
        let rsi_rebound = p.rsi_14? < RSI_OVERSOLD && l.rsi_14? > p.rsi_14?;
        let above_ema = last.close() > l.ema_20?;
        Some(crossed_up && rsi_rebound && above_ema)
    }
}

impl SignalScorer for CrossoverScorer {
    fn score(&self, rows: &[EnrichedRow]) -> Option<ScoredSignal> {
        if rows.len() < MIN_HISTORY_ROWS {
            return None;
        }
        let [.., prev, last] = rows else {
            return None;
        };

        // Any undefined input means no trigger.
        if !Self::triggers(prev, last).unwrap_or(false) {
            return None;
        }

        debug!(
            "CrossoverScorer [{}]: MACD crossed up with RSI rebounding from {:.2}",
            last.candle.key(),
            prev.indicators.rsi_14.unwrap_or_default()
        );

        Some(ScoredSignal {
            kind: SignalKind::LongMacdRsiEma,
            details: SignalDetails::Crossover(CrossoverDetails {
                rsi_14: last.indicators.rsi_14,
                macd_line: last.indicators.macd_line,
                macd_signal: last.indicators.macd_signal,
            }),
        })
    }

    fn name(&self) -> &str {
        "Crossover"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::signals::fixtures::{bleed_then, enriched};

    #[test]
    fn test_rebound_after_bleed_triggers() {
        let rows = enriched(&bleed_then(40.0));
        let prev = &rows[98].indicators;
        assert_eq!(prev.rsi_14, Some(0.0));
        assert!(prev.macd_line < prev.macd_signal);

        let signal = CrossoverScorer::new().score(&rows).unwrap();
        assert_eq!(signal.kind, SignalKind::LongMacdRsiEma);
        match signal.details {
            SignalDetails::Crossover(details) => {
                assert_eq!(details.rsi_14, rows[99].indicators.rsi_14);
            }
            other => panic!("unexpected details: {:?}", other),
        }
    }

    #[test]
    fn test_small_bounce_does_not_cross() {
        // MACD stays under its signal line.
        let rows = enriched(&bleed_then(5.0));
        assert_eq!(CrossoverScorer::new().score(&rows), None);
    }

    #[test]
    fn test_continued_decline_does_not_trigger() {
        let rows = enriched(&bleed_then(-40.0));
        assert_eq!(CrossoverScorer::new().score(&rows), None);
    }

    #[test]
    fn test_insufficient_history() {
        let rows = enriched(&bleed_then(40.0));
        assert_eq!(CrossoverScorer::new().score(&rows[1..]), None);
    }
}
