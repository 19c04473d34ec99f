//! candlescan - incremental candle sync and indicator signal scanner
//!
//! Fetches new bars for every configured (symbol, timeframe), recomputes the
//! indicators over the trailing history and stores any signal found on the
//! latest bar.
//!
//! # Usage
//! ```sh
//! cargo run -- --symbols BTC/USDT,ETH/USDT --timeframes 1h,4h --print
//! SCAN_INTERVAL=300 cargo run
//! ```

use anyhow::Result;
use candlescan::application::scanner::{ScanOrchestrator, ScanReport, ScanSettings};
use candlescan::application::signals::ScorerFactory;
use candlescan::config::{Config, ExchangeKind, parse_symbols, parse_timeframes};
use candlescan::domain::signals::ScoringModel;
use candlescan::infrastructure::ExchangeFactory;
use candlescan::infrastructure::persistence::{Database, SqliteCandleRepository, SqliteSignalRepository};
use chrono::{TimeZone, Utc};
use clap::Parser;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{Level, error, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Exchange to scan (binance, mock)
    #[arg(long)]
    exchange: Option<String>,

    /// Symbols, comma separated (e.g. BTC/USDT,ETH/USDT)
    #[arg(short, long)]
    symbols: Option<String>,

    /// Timeframes, comma separated (e.g. 15m,1h,4h)
    #[arg(short, long)]
    timeframes: Option<String>,

    /// Symbols scanned in parallel
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Votes needed for an "almost" signal (1-11)
    #[arg(long)]
    threshold: Option<usize>,

    /// Scoring model (votes, crossover)
    #[arg(long)]
    model: Option<String>,

    /// SQLite database URL
    #[arg(long)]
    db: Option<String>,

    /// Seconds between scans; runs once when absent
    #[arg(long)]
    interval: Option<u64>,

    /// Print the signals found by each scan
    #[arg(long)]
    print: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(exchange) = &self.exchange {
            config.exchange = ExchangeKind::from_str(exchange)?;
        }
        if let Some(symbols) = &self.symbols {
            config.symbols = parse_symbols(symbols)?;
        }
        if let Some(timeframes) = &self.timeframes {
            config.timeframes = parse_timeframes(timeframes)?;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(threshold) = self.threshold {
            config.almost_threshold = threshold;
        }
        if let Some(model) = &self.model {
            config.scoring_model = ScoringModel::from_str(model)?;
        }
        if let Some(db) = &self.db {
            config.database_url = db.clone();
        }
        if let Some(interval) = self.interval {
            config.scan_interval = (interval > 0).then(|| Duration::from_secs(interval));
        }
        config.validate()
    }
}

fn format_ts(ts: i64) -> String {
    Utc.timestamp_millis_opt(ts)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn print_signals(report: &ScanReport) {
    let found = report.found_signals();
    if found.is_empty() {
        println!("No signals in this run.");
        return;
    }

    println!(
        "{:<10} {:<14} {:>14} {:<20} {}",
        "timeframe", "symbol", "price", "signal", "bar"
    );
    for signal in found {
        println!(
            "{:<10} {:<14} {:>14.4} {:<20} {}",
            signal.timeframe.code(),
            signal.symbol,
            signal.price,
            signal.kind.as_str(),
            format_ts(signal.timestamp)
        );
    }
}

async fn scan_once(orchestrator: &ScanOrchestrator, config: &Config, print: bool) -> Result<()> {
    let started = Instant::now();
    let report = orchestrator.run().await?;

    if print {
        print_signals(&report);
    }
    println!(
        "Done. {} pairs evaluated, {} skipped, {} new signals in {:.2}s. DB: {}",
        report.evaluated_pairs(),
        report.skipped.len(),
        report.signals_inserted,
        started.elapsed().as_secs_f64(),
        config.database_url
    );
    Ok(())
}

async fn run(orchestrator: &ScanOrchestrator, config: &Config, print: bool) -> Result<()> {
    let Some(period) = config.scan_interval else {
        return scan_once(orchestrator, config, print).await;
    };

    info!("Scanning every {}s. Press Ctrl+C to stop.", period.as_secs());
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => scan_once(orchestrator, config, print).await?,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received.");
                return Ok(());
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    cli.apply(&mut config)?;

    info!(
        "candlescan {} starting: exchange={}, symbols={:?}, timeframes={:?}, model={}",
        env!("CARGO_PKG_VERSION"),
        config.exchange,
        config.symbols,
        config.timeframes.iter().map(|tf| tf.code()).collect::<Vec<_>>(),
        config.scoring_model
    );

    let db = Database::new(&config.database_url).await?;
    let orchestrator = ScanOrchestrator::new(
        ExchangeFactory::create(&config),
        Arc::new(SqliteCandleRepository::new(db.pool.clone())),
        Arc::new(SqliteSignalRepository::new(db.pool.clone())),
        ScorerFactory::create(config.scoring_model, config.almost_threshold),
        ScanSettings::from_config(&config),
    );

    let result = run(&orchestrator, &config, cli.print).await;
    if let Err(e) = &result {
        error!("Scan aborted: {:#}", e);
    }
    db.close().await;
    result
}
