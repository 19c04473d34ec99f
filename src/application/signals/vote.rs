use super::{MIN_HISTORY_ROWS, SignalScorer};
use crate::domain::market::{EnrichedRow, IndicatorSet};
use crate::domain::signals::{
    Condition, ConditionVote, ScoredSignal, SignalDetails, SignalKind, VoteDetails,
};
use tracing::debug;

const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;
const STOCH_OVERSOLD: f64 = 20.0;
const STOCH_OVERBOUGHT: f64 = 80.0;
const CCI_OVERSOLD: f64 = -100.0;
const CCI_OVERBOUGHT: f64 = 100.0;
const ADX_TRENDING: f64 = 18.0;

fn at_most(a: Option<f64>, b: Option<f64>) -> bool {
    a.zip(b).is_some_and(|(a, b)| a <= b)
}

fn below(a: Option<f64>, b: Option<f64>) -> bool {
    a.zip(b).is_some_and(|(a, b)| a < b)
}

fn oversold(condition: Condition, close: f64, ind: &IndicatorSet) -> bool {
    let close = Some(close);
    match condition {
        Condition::BollingerBand => at_most(close, ind.bb_lower),
        Condition::Rsi => at_most(ind.rsi_14, Some(RSI_OVERSOLD)),
        Condition::StochK => at_most(ind.stoch_k, Some(STOCH_OVERSOLD)),
        Condition::StochD => at_most(ind.stoch_d, Some(STOCH_OVERSOLD)),
        Condition::Cci => at_most(ind.cci_20, Some(CCI_OVERSOLD)),
        Condition::MacdVsSignal => below(ind.macd_line, ind.macd_signal),
        Condition::MacdVsZero => below(ind.macd_line, Some(0.0)),
        Condition::CloseVsSma50 => below(close, ind.sma_50),
        Condition::CloseVsSma100 => below(close, ind.sma_100),
        Condition::ObvVsEma => below(ind.obv, ind.obv_ema_7),
        Condition::DirectionalTrend => {
            below(ind.plus_di, ind.minus_di) && at_most(Some(ADX_TRENDING), ind.adx)
        }
    }
}

fn overbought(condition: Condition, close: f64, ind: &IndicatorSet) -> bool {
    let close = Some(close);
    match condition {
        Condition::BollingerBand => at_most(ind.bb_upper, close),
        Condition::Rsi => at_most(Some(RSI_OVERBOUGHT), ind.rsi_14),
        Condition::StochK => at_most(Some(STOCH_OVERBOUGHT), ind.stoch_k),
        Condition::StochD => at_most(Some(STOCH_OVERBOUGHT), ind.stoch_d),
        Condition::Cci => at_most(Some(CCI_OVERBOUGHT), ind.cci_20),
        Condition::MacdVsSignal => below(ind.macd_signal, ind.macd_line),
        Condition::MacdVsZero => below(Some(0.0), ind.macd_line),
        Condition::CloseVsSma50 => below(ind.sma_50, close),
        Condition::CloseVsSma100 => below(ind.sma_100, close),
        Condition::ObvVsEma => below(ind.obv_ema_7, ind.obv),
        Condition::DirectionalTrend => {
            below(ind.minus_di, ind.plus_di) && at_most(Some(ADX_TRENDING), ind.adx)
        }
    }
}

/// Eleven-condition oversold/overbought vote on the latest row.
///
/// Classification order: all oversold, all overbought, oversold count at
/// or above the threshold, overbought count at or above the threshold.
#[derive(Debug, Clone)]
pub struct VoteScorer {
    threshold: usize,
}

impl VoteScorer {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    /// Evaluates both condition sets on one row.
    pub fn tally(&self, row: &EnrichedRow) -> VoteDetails {
        let close = row.close();
        let ind = &row.indicators;
        let oversold: Vec<ConditionVote> = Condition::ALL
            .iter()
            .map(|&condition| ConditionVote {
                condition,
                matched: oversold(condition, close, ind),
            })
            .collect();
        let overbought: Vec<ConditionVote> = Condition::ALL
            .iter()
            .map(|&condition| ConditionVote {
                condition,
                matched: overbought(condition, close, ind),
            })
            .collect();

        VoteDetails {
            threshold: self.threshold,
            oversold_matches: oversold.iter().filter(|v| v.matched).count(),
            overbought_matches: overbought.iter().filter(|v| v.matched).count(),
            oversold,
            overbought,
            indicators: ind.clone(),
        }
    }

    pub fn classify(&self, details: &VoteDetails) -> Option<SignalKind> {
        let all = Condition::ALL.len();
        if details.oversold_matches == all {
            Some(SignalKind::Supersold)
        } else if details.overbought_matches == all {
            Some(SignalKind::Superbought)
        } else if details.oversold_matches >= self.threshold {
            Some(SignalKind::AlmostSupersold)
        } else if details.overbought_matches >= self.threshold {
            Some(SignalKind::AlmostSuperbought)
        } else {
            None
        }
    }
}

impl SignalScorer for VoteScorer {
    fn score(&self, rows: &[EnrichedRow]) -> Option<ScoredSignal> {
        if rows.len() < MIN_HISTORY_ROWS {
            return None;
        }
        let last = rows.last()?;
        let details = self.tally(last);
        let kind = self.classify(&details);

        debug!(
            "VoteScorer [{}]: oversold {}/11, overbought {}/11 -> {:?}",
            last.candle.key(),
            details.oversold_matches,
            details.overbought_matches,
            kind
        );

        kind.map(|kind| ScoredSignal {
            kind,
            details: SignalDetails::Votes(details),
        })
    }

    fn name(&self) -> &str {
        "Votes"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::signals::fixtures::{bleed_then, enriched, rows_ending_with};

    fn oversold_row() -> (f64, IndicatorSet) {
        let ind = IndicatorSet {
            bb_lower: Some(95.0),
            rsi_14: Some(20.0),
            stoch_k: Some(10.0),
            stoch_d: Some(12.0),
            cci_20: Some(-150.0),
            macd_line: Some(-2.0),
            macd_signal: Some(-1.0),
            sma_50: Some(100.0),
            sma_100: Some(110.0),
            obv: Some(-5.0),
            obv_ema_7: Some(-3.0),
            plus_di: Some(10.0),
            minus_di: Some(30.0),
            adx: Some(25.0),
            ..Default::default()
        };
        (90.0, ind)
    }

    fn overbought_row() -> (f64, IndicatorSet) {
        let ind = IndicatorSet {
            bb_upper: Some(105.0),
            rsi_14: Some(80.0),
            stoch_k: Some(90.0),
            stoch_d: Some(85.0),
            cci_20: Some(150.0),
            macd_line: Some(2.0),
            macd_signal: Some(1.0),
            sma_50: Some(100.0),
            sma_100: Some(90.0),
            obv: Some(5.0),
            obv_ema_7: Some(3.0),
            plus_di: Some(30.0),
            minus_di: Some(10.0),
            adx: Some(18.0),
            ..Default::default()
        };
        (110.0, ind)
    }

    fn kind_of(scorer: &VoteScorer, close: f64, ind: IndicatorSet) -> Option<SignalKind> {
        scorer
            .score(&rows_ending_with(close, ind, MIN_HISTORY_ROWS))
            .map(|s| s.kind)
    }

    #[test]
    fn test_all_oversold_is_supersold() {
        let (close, ind) = oversold_row();
        assert_eq!(kind_of(&VoteScorer::new(7), close, ind), Some(SignalKind::Supersold));
    }

    #[test]
    fn test_all_overbought_is_superbought() {
        let (close, ind) = overbought_row();
        assert_eq!(kind_of(&VoteScorer::new(7), close, ind), Some(SignalKind::Superbought));
    }

    #[test]
    fn test_six_matches_below_threshold_seven() {
        let (close, mut ind) = oversold_row();
        ind.rsi_14 = None;
        ind.stoch_k = None;
        ind.stoch_d = None;
        ind.cci_20 = None;
        ind.adx = None;

        let scorer = VoteScorer::new(7);
        let details = scorer.tally(&rows_ending_with(close, ind.clone(), 1)[0]);
        assert_eq!(details.oversold_matches, 6);
        assert_eq!(details.overbought_matches, 0);
        assert_eq!(kind_of(&scorer, close, ind.clone()), None);

        assert_eq!(
            kind_of(&VoteScorer::new(6), close, ind),
            Some(SignalKind::AlmostSupersold)
        );
    }

    #[test]
    fn test_seven_matches_reach_threshold_seven() {
        let (close, mut ind) = oversold_row();
        ind.rsi_14 = None;
        ind.stoch_k = None;
        ind.stoch_d = None;
        ind.cci_20 = None;

        assert_eq!(
            kind_of(&VoteScorer::new(7), close, ind),
            Some(SignalKind::AlmostSupersold)
        );
    }

    #[test]
    fn test_almost_supersold_wins_over_almost_superbought() {
        // Three votes on each side.
        let ind = IndicatorSet {
            sma_50: Some(100.0),
            rsi_14: Some(20.0),
            stoch_k: Some(10.0),
            macd_line: Some(2.0),
            macd_signal: Some(1.0),
            obv: Some(5.0),
            obv_ema_7: Some(3.0),
            ..Default::default()
        };
        let scorer = VoteScorer::new(3);
        let details = scorer.tally(&rows_ending_with(90.0, ind.clone(), 1)[0]);
        assert_eq!(details.oversold_matches, 3);
        assert_eq!(details.overbought_matches, 3);
        assert_eq!(kind_of(&scorer, 90.0, ind), Some(SignalKind::AlmostSupersold));
    }

    #[test]
    fn test_undefined_values_never_match() {
        let scorer = VoteScorer::new(1);
        let details = scorer.tally(&rows_ending_with(90.0, IndicatorSet::default(), 1)[0]);
        assert_eq!(details.oversold_matches, 0);
        assert_eq!(details.overbought_matches, 0);
        assert_eq!(kind_of(&scorer, 90.0, IndicatorSet::default()), None);
    }

    #[test]
    fn test_directional_needs_trend_strength() {
        let (close, mut ind) = oversold_row();
        ind.adx = Some(17.9);
        let details = VoteScorer::new(7).tally(&rows_ending_with(close, ind, 1)[0]);
        let directional = details
            .oversold
            .iter()
            .find(|v| v.condition == Condition::DirectionalTrend)
            .unwrap();
        assert!(!directional.matched);
        assert_eq!(details.oversold_matches, 10);
    }

    #[test]
    fn test_insufficient_history_is_no_signal() {
        let (close, ind) = oversold_row();
        let rows = rows_ending_with(close, ind, MIN_HISTORY_ROWS - 1);
        assert_eq!(VoteScorer::new(7).score(&rows), None);
    }

    #[test]
    fn test_engineered_capitulation_is_supersold() {
        let rows = enriched(&bleed_then(-40.0));
        assert_eq!(rows.len(), 100);

        let signal = VoteScorer::new(7).score(&rows).unwrap();
        assert_eq!(signal.kind, SignalKind::Supersold);
        match signal.details {
            SignalDetails::Votes(details) => {
                assert_eq!(details.oversold_matches, 11);
                assert_eq!(details.threshold, 7);
                assert_eq!(details.indicators, rows[99].indicators);
            }
            other => panic!("unexpected details: {:?}", other),
        }

        // Same tail, one row short of the minimum.
        assert_eq!(VoteScorer::new(7).score(&rows[1..]), None);
    }

    #[test]
    fn test_mirrored_capitulation_is_almost_superbought() {
        let closes: Vec<f64> = bleed_then(-40.0).iter().map(|c| 2000.0 - c).collect();
        let rows = enriched(&closes);

        // No losses in the last 14 deltas: RSI and the stochastics are undefined.
        let scorer = VoteScorer::new(7);
        let details = scorer.tally(&rows[99]);
        assert_eq!(details.overbought_matches, 8);
        assert_eq!(
            scorer.score(&rows).map(|s| s.kind),
            Some(SignalKind::AlmostSuperbought)
        );
        assert_eq!(VoteScorer::new(9).score(&rows), None);
    }
}
