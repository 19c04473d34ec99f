use crate::domain::market::{Candle, SeriesKey, Timeframe};
use crate::domain::repositories::{CandleRepository, SignalQuery, SignalRepository};
use crate::domain::signals::{Signal, SignalDetails, SignalKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::debug;

pub struct SqliteCandleRepository {
    pool: SqlitePool,
}

impl SqliteCandleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row(key: &SeriesKey, row: &SqliteRow) -> Result<Candle> {
        Ok(Candle {
            exchange: key.exchange.clone(),
            symbol: key.symbol.clone(),
            timeframe: key.timeframe,
            timestamp: row.try_get("ts")?,
            open: row.try_get("open")?,
            high: row.try_get("high")?,
            low: row.try_get("low")?,
            close: row.try_get("close")?,
            volume: row.try_get("volume")?,
        })
    }
}

#[async_trait]
impl CandleRepository for SqliteCandleRepository {
    async fn last_timestamp(&self, key: &SeriesKey) -> Result<Option<i64>> {
        let row = sqlx::query(
            "SELECT MAX(ts) AS last_ts FROM candles WHERE exchange = ? AND symbol = ? AND timeframe = ?",
        )
        .bind(&key.exchange)
        .bind(&key.symbol)
        .bind(key.timeframe.code())
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to read last timestamp for {}", key))?;

        Ok(row.try_get::<Option<i64>, _>("last_ts")?)
    }

    async fn upsert(&self, key: &SeriesKey, candles: &[Candle]) -> Result<()> {
        if candles.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.context("Failed to begin candle upsert")?;
        for candle in candles {
            sqlx::query(
                r#"
                INSERT INTO candles (exchange, symbol, timeframe, ts, open, high, low, close, volume)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(exchange, symbol, timeframe, ts) DO UPDATE SET
                    open = excluded.open,
                    high = excluded.high,
                    low = excluded.low,
                    close = excluded.close,
                    volume = excluded.volume
                "#,
            )
            .bind(&key.exchange)
            .bind(&key.symbol)
            .bind(key.timeframe.code())
            .bind(candle.timestamp)
            .bind(candle.open)
            .bind(candle.high)
            .bind(candle.low)
            .bind(candle.close)
            .bind(candle.volume)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to upsert candle {} @ {}", key, candle.timestamp))?;
        }
        tx.commit().await.context("Failed to commit candle upsert")?;

        debug!("Upserted {} candles for {}", candles.len(), key);
        Ok(())
    }

    async fn load(&self, key: &SeriesKey, from: Option<i64>) -> Result<Vec<Candle>> {
        let rows = sqlx::query(
            r#"
            SELECT ts, open, high, low, close, volume FROM candles
            WHERE exchange = ? AND symbol = ? AND timeframe = ? AND ts >= ?
            ORDER BY ts ASC
            "#,
        )
        .bind(&key.exchange)
        .bind(&key.symbol)
        .bind(key.timeframe.code())
        .bind(from.unwrap_or(i64::MIN))
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to load candles for {}", key))?;

        rows.iter().map(|row| Self::map_row(key, row)).collect()
    }

    async fn recent(&self, key: &SeriesKey, limit: usize) -> Result<Vec<Candle>> {
        let rows = sqlx::query(
            r#"
            SELECT ts, open, high, low, close, volume FROM candles
            WHERE exchange = ? AND symbol = ? AND timeframe = ?
            ORDER BY ts DESC
            LIMIT ?
            "#,
        )
        .bind(&key.exchange)
        .bind(&key.symbol)
        .bind(key.timeframe.code())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to load recent candles for {}", key))?;

        let mut candles = rows
            .iter()
            .map(|row| Self::map_row(key, row))
            .collect::<Result<Vec<_>>>()?;
        candles.reverse();
        Ok(candles)
    }
}

pub struct SqliteSignalRepository {
    pool: SqlitePool,
}

impl SqliteSignalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &SqliteRow) -> Result<Signal> {
        let timeframe: String = row.try_get("timeframe")?;
        let kind: String = row.try_get("signal")?;
        let payload: String = row.try_get("payload")?;

        Ok(Signal {
            exchange: row.try_get("exchange")?,
            symbol: row.try_get("symbol")?,
            timeframe: Timeframe::from_str(&timeframe)?,
            timestamp: row.try_get("ts")?,
            kind: SignalKind::from_str(&kind)?,
            price: row.try_get("price")?,
            details: serde_json::from_str::<SignalDetails>(&payload)
                .context("Failed to parse signal payload")?,
        })
    }
}

#[async_trait]
impl SignalRepository for SqliteSignalRepository {
    async fn insert(&self, signal: &Signal) -> Result<bool> {
        let payload = signal.payload().context("Failed to serialize signal payload")?;

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO signals (exchange, symbol, timeframe, ts, signal, price, payload)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&signal.exchange)
        .bind(&signal.symbol)
        .bind(signal.timeframe.code())
        .bind(signal.timestamp)
        .bind(signal.kind.as_str())
        .bind(signal.price)
        .bind(payload)
        .execute(&self.pool)
        .await
        .context("Failed to insert signal")?;

        Ok(result.rows_affected() > 0)
    }

    async fn find(&self, query: &SignalQuery) -> Result<Vec<Signal>> {
        let rows = sqlx::query(
            r#"
            SELECT exchange, symbol, timeframe, ts, signal, price, payload FROM signals
            WHERE (?1 IS NULL OR exchange = ?1)
              AND (?2 IS NULL OR symbol = ?2)
              AND (?3 IS NULL OR timeframe = ?3)
              AND (?4 IS NULL OR signal = ?4)
            ORDER BY ts DESC, symbol ASC, timeframe ASC
            LIMIT ?5
            "#,
        )
        .bind(query.exchange.as_deref())
        .bind(query.symbol.as_deref())
        .bind(query.timeframe.map(|tf| tf.code()))
        .bind(query.kind.map(|kind| kind.as_str()))
        .bind(query.limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query signals")?;

        rows.iter().map(Self::map_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signals::CrossoverDetails;
    use crate::infrastructure::persistence::Database;
    use tokio_test::assert_ok;

    fn candle(key: &SeriesKey, ts: i64, close: f64) -> Candle {
        Candle {
            exchange: key.exchange.clone(),
            symbol: key.symbol.clone(),
            timeframe: key.timeframe,
            timestamp: ts,
            open: close - 1.0,
            high: close + 2.0,
            low: close - 2.0,
            close,
            volume: 5.0,
        }
    }

    fn signal(ts: i64, kind: SignalKind, rsi: f64) -> Signal {
        Signal {
            exchange: "binance".to_string(),
            symbol: "BTC/USDT".to_string(),
            timeframe: Timeframe::OneHour,
            timestamp: ts,
            kind,
            price: 100.0,
            details: SignalDetails::Crossover(CrossoverDetails {
                rsi_14: Some(rsi),
                macd_line: Some(0.5),
                macd_signal: Some(0.25),
            }),
        }
    }

    #[tokio::test]
    async fn test_empty_series_has_no_last_timestamp() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteCandleRepository::new(db.pool.clone());
        let key = SeriesKey::new("binance", "BTC/USDT", Timeframe::OneHour);

        assert_eq!(repo.last_timestamp(&key).await.unwrap(), None);
        assert_ok!(repo.upsert(&key, &[]).await);
        assert!(repo.load(&key, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_and_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteCandleRepository::new(db.pool.clone());
        let key = SeriesKey::new("binance", "BTC/USDT", Timeframe::OneHour);
        let hour = Timeframe::OneHour.duration_ms();

        let batch = vec![candle(&key, 2 * hour, 12.0), candle(&key, 0, 10.0), candle(&key, hour, 11.0)];
        assert_ok!(repo.upsert(&key, &batch).await);
        assert_ok!(repo.upsert(&key, &batch).await);

        let stored = repo.load(&key, None).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored.iter().map(|c| c.timestamp).collect::<Vec<_>>(), vec![0, hour, 2 * hour]);
        assert_eq!(stored[0], batch[1]);

        // A revised bar replaces the stored OHLCV.
        assert_ok!(repo.upsert(&key, &[candle(&key, hour, 99.0)]).await);
        let stored = repo.load(&key, Some(hour)).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].close, 99.0);
        assert_eq!(repo.last_timestamp(&key).await.unwrap(), Some(2 * hour));
    }

    #[tokio::test]
    async fn test_series_are_isolated_by_key() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteCandleRepository::new(db.pool.clone());
        let hourly = SeriesKey::new("binance", "BTC/USDT", Timeframe::OneHour);
        let daily = SeriesKey::new("binance", "BTC/USDT", Timeframe::OneDay);

        assert_ok!(repo.upsert(&hourly, &[candle(&hourly, 0, 1.0)]).await);
        assert_eq!(repo.last_timestamp(&daily).await.unwrap(), None);
        assert!(repo.load(&daily, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_returns_latest_ascending() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteCandleRepository::new(db.pool.clone());
        let key = SeriesKey::new("binance", "ETH/USDT", Timeframe::FiveMin);
        let step = Timeframe::FiveMin.duration_ms();

        let batch: Vec<Candle> = (0..10).map(|i| candle(&key, i * step, i as f64)).collect();
        assert_ok!(repo.upsert(&key, &batch).await);

        let recent = repo.recent(&key, 3).await.unwrap();
        assert_eq!(recent.iter().map(|c| c.close).collect::<Vec<_>>(), vec![7.0, 8.0, 9.0]);
    }

    #[tokio::test]
    async fn test_signal_insert_keeps_first_payload() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteSignalRepository::new(db.pool.clone());

        let first = signal(1_000, SignalKind::LongMacdRsiEma, 25.0);
        assert!(repo.insert(&first).await.unwrap());
        assert!(!repo.insert(&signal(1_000, SignalKind::LongMacdRsiEma, 99.0)).await.unwrap());

        let stored = repo.find(&SignalQuery::default()).await.unwrap();
        assert_eq!(stored, vec![first]);
    }

    #[tokio::test]
    async fn test_same_bar_different_kind_is_a_new_row() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteSignalRepository::new(db.pool.clone());

        assert!(repo.insert(&signal(1_000, SignalKind::LongMacdRsiEma, 25.0)).await.unwrap());
        assert!(repo.insert(&signal(1_000, SignalKind::Supersold, 25.0)).await.unwrap());
        assert_eq!(repo.find(&SignalQuery::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_find_filters_and_orders_newest_first() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteSignalRepository::new(db.pool.clone());

        for ts in [1_000, 3_000, 2_000] {
            assert_ok!(repo.insert(&signal(ts, SignalKind::LongMacdRsiEma, 20.0)).await);
        }
        let mut other = signal(4_000, SignalKind::LongMacdRsiEma, 20.0);
        other.symbol = "ETH/USDT".to_string();
        assert_ok!(repo.insert(&other).await);

        let btc = repo
            .find(&SignalQuery {
                symbol: Some("BTC/USDT".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(btc.iter().map(|s| s.timestamp).collect::<Vec<_>>(), vec![3_000, 2_000, 1_000]);

        let limited = repo
            .find(&SignalQuery {
                limit: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].symbol, "ETH/USDT");

        let none = repo
            .find(&SignalQuery {
                kind: Some(SignalKind::Superbought),
                timeframe: Some(Timeframe::OneHour),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
