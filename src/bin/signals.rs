//! Read side of the scanner database: stored signals and recent candles.
//!
//! # Usage
//! ```sh
//! cargo run --bin signals -- list --symbol BTC/USDT --kind supersold
//! cargo run --bin signals -- candles --symbol ETH/USDT --timeframe 1h --limit 50
//! ```

use anyhow::Result;
use candlescan::config::Config;
use candlescan::domain::market::symbol::normalize_symbol;
use candlescan::domain::market::{SeriesKey, Timeframe};
use candlescan::domain::repositories::{CandleRepository, SignalQuery, SignalRepository};
use candlescan::domain::signals::SignalKind;
use candlescan::infrastructure::persistence::{Database, SqliteCandleRepository, SqliteSignalRepository};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SQLite database URL (defaults to DATABASE_URL)
    #[arg(long)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stored signals, newest first
    List {
        #[arg(long)]
        exchange: Option<String>,

        #[arg(short, long)]
        symbol: Option<String>,

        #[arg(short, long)]
        timeframe: Option<String>,

        /// supersold, superbought, almost_supersold, almost_superbought, LONG_MACD_RSI_EMA
        #[arg(short, long)]
        kind: Option<String>,

        #[arg(short, long, default_value = "500")]
        limit: usize,

        /// Print each signal's payload as JSON
        #[arg(long)]
        json: bool,
    },
    /// Most recent stored candles of one series
    Candles {
        #[arg(long, default_value = "binance")]
        exchange: String,

        #[arg(short, long)]
        symbol: String,

        #[arg(short, long, default_value = "1h")]
        timeframe: String,

        #[arg(short, long, default_value = "500")]
        limit: usize,
    },
}

fn format_ts(ts: i64) -> String {
    Utc.timestamp_millis_opt(ts)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let db_url = match cli.db {
        Some(db) => db,
        None => Config::from_env()?.database_url,
    };
    let db = Database::new(&db_url).await?;

    let result = match cli.command {
        Commands::List {
            exchange,
            symbol,
            timeframe,
            kind,
            limit,
            json,
        } => {
            let query = SignalQuery {
                exchange,
                symbol: symbol.as_deref().map(normalize_symbol).transpose()?,
                timeframe: timeframe.as_deref().map(Timeframe::from_str).transpose()?,
                kind: kind.as_deref().map(SignalKind::from_str).transpose()?,
                limit,
            };
            let repo = SqliteSignalRepository::new(db.pool.clone());
            let signals = repo.find(&query).await?;

            if signals.is_empty() {
                println!("No signals stored.");
            }
            for signal in &signals {
                println!(
                    "{}  {:<10} {:<14} {:<4} {:<20} {:.4}",
                    format_ts(signal.timestamp),
                    signal.exchange,
                    signal.symbol,
                    signal.timeframe.code(),
                    signal.kind.as_str(),
                    signal.price
                );
                if json {
                    println!("    {}", signal.payload()?);
                }
            }
            Ok(())
        }
        Commands::Candles {
            exchange,
            symbol,
            timeframe,
            limit,
        } => {
            let key = SeriesKey::new(
                &exchange,
                &normalize_symbol(&symbol)?,
                Timeframe::from_str(&timeframe)?,
            );
            let repo = SqliteCandleRepository::new(db.pool.clone());
            let candles = repo.recent(&key, limit).await?;

            println!("{} ({} bars)", key, candles.len());
            for c in &candles {
                println!(
                    "{}  o={:.4} h={:.4} l={:.4} c={:.4} v={:.2}",
                    format_ts(c.timestamp),
                    c.open,
                    c.high,
                    c.low,
                    c.close,
                    c.volume
                );
            }
            Ok(())
        }
    };

    db.close().await;
    result
}
