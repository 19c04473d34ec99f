//! One scan over every configured (symbol, timeframe) pair.

use crate::application::indicators::enrich;
use crate::application::market_data::{FetchOutcome, IncrementalFetcher};
use crate::application::signals::SignalScorer;
use crate::config::{Config, RetryConfig};
use crate::domain::market::Timeframe;
use crate::domain::ports::ExchangeClient;
use crate::domain::repositories::{CandleRepository, SignalRepository};
use crate::domain::signals::Signal;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub symbols: Vec<String>,
    pub timeframes: Vec<Timeframe>,
    pub concurrency: usize,
    pub fetch_limit: usize,
    pub history_bars: usize,
    pub retry: RetryConfig,
}

impl ScanSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            symbols: config.symbols.clone(),
            timeframes: config.timeframes.clone(),
            concurrency: config.concurrency,
            fetch_limit: config.fetch_limit,
            history_bars: config.history_bars,
            retry: config.retry.clone(),
        }
    }
}

/// Latest state of one evaluated pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairResult {
    pub last_close: f64,
    pub last_timestamp: i64,
    pub signal: Option<Signal>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SkippedPair {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub results: BTreeMap<String, BTreeMap<Timeframe, PairResult>>,
    /// Sorted by (symbol, timeframe).
    pub skipped: Vec<SkippedPair>,
    /// Signals written by this run; re-emitted signals already stored are not counted.
    pub signals_inserted: usize,
}

impl ScanReport {
    /// Every signal of the run, ordered by (timeframe, symbol).
    pub fn found_signals(&self) -> Vec<&Signal> {
        let mut signals: Vec<&Signal> = self
            .results
            .values()
            .flat_map(|by_tf| by_tf.values())
            .filter_map(|r| r.signal.as_ref())
            .collect();
        signals.sort_by(|a, b| (a.timeframe, &a.symbol).cmp(&(b.timeframe, &b.symbol)));
        signals
    }

    pub fn evaluated_pairs(&self) -> usize {
        self.results.values().map(|by_tf| by_tf.len()).sum()
    }
}

enum PairOutcome {
    Evaluated(PairResult),
    Skipped(String),
}

struct ScanContext {
    fetcher: IncrementalFetcher,
    candles: Arc<dyn CandleRepository>,
    scorer: Arc<dyn SignalScorer>,
    exchange_id: String,
    history_bars: usize,
}

impl ScanContext {
    /// All timeframes of one symbol, in order. Only storage failures are errors.
    async fn scan_symbol(
        &self,
        symbol: &str,
        timeframes: &[Timeframe],
    ) -> Result<Vec<(Timeframe, PairOutcome)>> {
        let mut outcomes = Vec::with_capacity(timeframes.len());
        for &timeframe in timeframes {
            let outcome = self.scan_pair(symbol, timeframe).await?;
            outcomes.push((timeframe, outcome));
        }
        Ok(outcomes)
    }

    async fn scan_pair(&self, symbol: &str, timeframe: Timeframe) -> Result<PairOutcome> {
        if let FetchOutcome::Skipped { reason } = self.fetcher.fetch(symbol, timeframe).await? {
            return Ok(PairOutcome::Skipped(reason.to_string()));
        }

        let key = self.fetcher.key(symbol, timeframe);
        let Some(last) = self.candles.last_timestamp(&key).await? else {
            return Ok(PairOutcome::Skipped("no candles available".to_string()));
        };
        // A window reaching past the representable range loads everything.
        let from = i64::try_from(self.history_bars - 1)
            .ok()
            .and_then(|bars| bars.checked_mul(timeframe.duration_ms()))
            .and_then(|span| last.checked_sub(span));
        let history = self.candles.load(&key, from).await?;

        let rows = enrich(&history)?;
        let Some(latest) = rows.last() else {
            return Ok(PairOutcome::Skipped("no candles available".to_string()));
        };

        let signal = self.scorer.score(&rows).map(|scored| Signal {
            exchange: self.exchange_id.clone(),
            symbol: symbol.to_string(),
            timeframe,
            timestamp: latest.timestamp(),
            kind: scored.kind,
            price: latest.close(),
            details: scored.details,
        });

        debug!(
            "ScanOrchestrator: {} {} rows, close {:.4}, signal {:?}",
            key,
            rows.len(),
            latest.close(),
            signal.as_ref().map(|s| s.kind)
        );

        Ok(PairOutcome::Evaluated(PairResult {
            last_close: latest.close(),
            last_timestamp: latest.timestamp(),
            signal,
        }))
    }
}

/// Runs fetch, enrichment and scoring for every configured pair.
///
/// One task per distinct symbol, at most `concurrency` at once; a symbol's
/// timeframes run one after another inside its task, so no series ever has
/// two concurrent writers.
pub struct ScanOrchestrator {
    context: Arc<ScanContext>,
    signals: Arc<dyn SignalRepository>,
    symbols: Vec<String>,
    timeframes: Vec<Timeframe>,
    concurrency: usize,
}

impl ScanOrchestrator {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        candles: Arc<dyn CandleRepository>,
        signals: Arc<dyn SignalRepository>,
        scorer: Arc<dyn SignalScorer>,
        settings: ScanSettings,
    ) -> Self {
        let exchange_id = exchange.id().to_string();
        let fetcher = IncrementalFetcher::new(
            exchange,
            candles.clone(),
            settings.retry,
            settings.fetch_limit,
        );

        Self {
            context: Arc::new(ScanContext {
                fetcher,
                candles,
                scorer,
                exchange_id,
                history_bars: settings.history_bars.max(1),
            }),
            signals,
            symbols: dedup_preserving_order(settings.symbols),
            timeframes: dedup_preserving_order(settings.timeframes),
            concurrency: settings.concurrency.max(1),
        }
    }

    pub async fn run(&self) -> Result<ScanReport> {
        info!(
            "ScanOrchestrator: scanning {} symbols x {} timeframes on {} (concurrency {})",
            self.symbols.len(),
            self.timeframes.len(),
            self.context.exchange_id,
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let timeframes: Arc<[Timeframe]> = self.timeframes.clone().into();
        let mut tasks = JoinSet::new();

        for symbol in &self.symbols {
            let semaphore = semaphore.clone();
            let context = self.context.clone();
            let timeframes = timeframes.clone();
            let symbol = symbol.clone();
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .context("Scan semaphore closed")?;
                let outcomes = context.scan_symbol(&symbol, &timeframes).await?;
                Ok::<_, anyhow::Error>((symbol, outcomes))
            });
        }

        let mut report = ScanReport::default();
        while let Some(joined) = tasks.join_next().await {
            let (symbol, outcomes) = joined.context("Scan task panicked")??;
            for (timeframe, outcome) in outcomes {
                match outcome {
                    PairOutcome::Evaluated(result) => {
                        report
                            .results
                            .entry(symbol.clone())
                            .or_default()
                            .insert(timeframe, result);
                    }
                    PairOutcome::Skipped(reason) => report.skipped.push(SkippedPair {
                        symbol: symbol.clone(),
                        timeframe,
                        reason,
                    }),
                }
            }
        }
        report.skipped.sort();

        let mut inserted = 0;
        for signal in report.found_signals() {
            if self.signals.insert(signal).await? {
                inserted += 1;
            }
        }
        report.signals_inserted = inserted;

        for skipped in &report.skipped {
            warn!(
                "ScanOrchestrator: skipped {} {}: {}",
                skipped.symbol, skipped.timeframe, skipped.reason
            );
        }
        info!(
            "ScanOrchestrator: {} pairs evaluated, {} skipped, {} signals ({} new)",
            report.evaluated_pairs(),
            report.skipped.len(),
            report.found_signals().len(),
            report.signals_inserted
        );

        Ok(report)
    }
}

fn dedup_preserving_order<T: Clone + Eq + std::hash::Hash>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
