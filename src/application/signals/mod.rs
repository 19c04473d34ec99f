//! Scorers turning the tail of an enriched series into at most one signal.

mod crossover;
#[doc(hidden)]
pub mod fixtures;
mod vote;

pub use crossover::CrossoverScorer;
pub use vote::VoteScorer;

use crate::domain::market::EnrichedRow;
use crate::domain::signals::{ScoredSignal, ScoringModel};
use std::sync::Arc;

/// Fewer enriched rows than this means "no signal", never an error.
pub const MIN_HISTORY_ROWS: usize = 100;

pub trait SignalScorer: Send + Sync {
    /// Scores the last row of `rows` (ascending). Earlier rows are context
    /// only and are never scored themselves.
    fn score(&self, rows: &[EnrichedRow]) -> Option<ScoredSignal>;

    fn name(&self) -> &str;
}

pub struct ScorerFactory;

impl ScorerFactory {
    pub fn create(model: ScoringModel, threshold: usize) -> Arc<dyn SignalScorer> {
        match model {
            ScoringModel::Votes => Arc::new(VoteScorer::new(threshold)),
            ScoringModel::Crossover => Arc::new(CrossoverScorer::new()),
        }
    }
}
