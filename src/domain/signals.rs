use crate::domain::market::{IndicatorSet, Timeframe};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification emitted for the latest bar of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    #[serde(rename = "supersold")]
    Supersold,
    #[serde(rename = "superbought")]
    Superbought,
    #[serde(rename = "almost_supersold")]
    AlmostSupersold,
    #[serde(rename = "almost_superbought")]
    AlmostSuperbought,
    /// Emitted only by the crossover scorer.
    #[serde(rename = "LONG_MACD_RSI_EMA")]
    LongMacdRsiEma,
}

impl SignalKind {
    /// Value stored in the `signal` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Supersold => "supersold",
            SignalKind::Superbought => "superbought",
            SignalKind::AlmostSupersold => "almost_supersold",
            SignalKind::AlmostSuperbought => "almost_superbought",
            SignalKind::LongMacdRsiEma => "LONG_MACD_RSI_EMA",
        }
    }

    pub fn all() -> [SignalKind; 5] {
        [
            SignalKind::Supersold,
            SignalKind::Superbought,
            SignalKind::AlmostSupersold,
            SignalKind::AlmostSuperbought,
            SignalKind::LongMacdRsiEma,
        ]
    }
}

impl FromStr for SignalKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SignalKind::all()
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid signal: {}. Valid: supersold, superbought, almost_supersold, almost_superbought, LONG_MACD_RSI_EMA",
                    s
                )
            })
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which scorer turns enriched rows into signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScoringModel {
    /// Eleven-condition oversold/overbought vote.
    #[default]
    Votes,
    /// MACD cross-up with RSI rebound above EMA20.
    Crossover,
}

impl FromStr for ScoringModel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "votes" | "vote" => Ok(ScoringModel::Votes),
            "crossover" => Ok(ScoringModel::Crossover),
            _ => anyhow::bail!("Invalid SCORING_MODEL: {}. Valid: votes, crossover", s),
        }
    }
}

impl fmt::Display for ScoringModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringModel::Votes => write!(f, "votes"),
            ScoringModel::Crossover => write!(f, "crossover"),
        }
    }
}

/// The eleven conditions of the vote scorer. Each has an oversold reading and
/// a mirrored overbought reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    BollingerBand,
    Rsi,
    StochK,
    StochD,
    Cci,
    MacdVsSignal,
    MacdVsZero,
    CloseVsSma50,
    CloseVsSma100,
    ObvVsEma,
    DirectionalTrend,
}

impl Condition {
    pub const ALL: [Condition; 11] = [
        Condition::BollingerBand,
        Condition::Rsi,
        Condition::StochK,
        Condition::StochD,
        Condition::Cci,
        Condition::MacdVsSignal,
        Condition::MacdVsZero,
        Condition::CloseVsSma50,
        Condition::CloseVsSma100,
        Condition::ObvVsEma,
        Condition::DirectionalTrend,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionVote {
    pub condition: Condition,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteDetails {
    pub threshold: usize,
    pub oversold_matches: usize,
    pub overbought_matches: usize,
    pub oversold: Vec<ConditionVote>,
    pub overbought: Vec<ConditionVote>,
    pub indicators: IndicatorSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossoverDetails {
    pub rsi_14: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
}

/// What produced a signal; persisted as the JSON `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum SignalDetails {
    Votes(VoteDetails),
    Crossover(CrossoverDetails),
}

/// A scorer's verdict for one row, before it is bound to a series.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSignal {
    pub kind: SignalKind,
    pub details: SignalDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub exchange: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub timestamp: i64,
    pub kind: SignalKind,
    pub price: f64,
    pub details: SignalDetails,
}

impl Signal {
    pub fn payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.details)
    }
}
