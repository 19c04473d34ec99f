#![allow(dead_code)]

use candlescan::application::scanner::{ScanOrchestrator, ScanSettings};
use candlescan::application::signals::ScorerFactory;
pub use candlescan::application::signals::fixtures::bleed_then;
use candlescan::config::RetryConfig;
use candlescan::domain::market::{Candle, Timeframe};
use candlescan::domain::signals::ScoringModel;
use candlescan::infrastructure::MockExchangeClient;
use candlescan::infrastructure::persistence::{Database, SqliteCandleRepository, SqliteSignalRepository};
use std::sync::Arc;
use std::time::Duration;

/// Sideways oscillation that triggers nothing in particular.
pub fn wave(len: usize, base: f64) -> Vec<f64> {
    (0..len)
        .map(|i| base + (i as f64 * 0.4).sin() * base * 0.02 + (i as f64 * 0.13).cos() * base * 0.01)
        .collect()
}

pub fn candles(closes: &[f64], timeframe: Timeframe) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            exchange: String::new(),
            symbol: String::new(),
            timeframe,
            timestamp: 1_600_000_000_000 + i as i64 * timeframe.duration_ms(),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 10.0,
        })
        .collect()
}

pub fn settings(symbols: &[&str], timeframes: &[Timeframe], concurrency: usize) -> ScanSettings {
    ScanSettings {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        timeframes: timeframes.to_vec(),
        concurrency,
        fetch_limit: 1000,
        history_bars: 1000,
        retry: RetryConfig {
            max_attempts: 5,
            base_delay: Duration::ZERO,
        },
    }
}

pub struct Harness {
    pub db: Database,
    pub candles: Arc<SqliteCandleRepository>,
    pub signals: Arc<SqliteSignalRepository>,
    pub orchestrator: ScanOrchestrator,
}

pub async fn harness(exchange: &MockExchangeClient, settings: ScanSettings) -> Harness {
    let db = Database::in_memory().await.unwrap();
    let candles = Arc::new(SqliteCandleRepository::new(db.pool.clone()));
    let signals = Arc::new(SqliteSignalRepository::new(db.pool.clone()));
    let orchestrator = ScanOrchestrator::new(
        Arc::new(exchange.clone()),
        candles.clone(),
        signals.clone(),
        ScorerFactory::create(ScoringModel::Votes, 7),
        settings,
    );
    Harness {
        db,
        candles,
        signals,
        orchestrator,
    }
}
