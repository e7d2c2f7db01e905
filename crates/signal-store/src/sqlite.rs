use async_trait::async_trait;
use chrono::NaiveDate;
use signal_core::{DerivedSignal, MarketSummary, SignalError, SignalStore};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(sqlx::FromRow)]
struct SignalRow {
    symbol: String,
    price: f64,
    volume: i64,
    average_volume: i64,
    change_percent: f64,
    volume_ratio: f64,
    sentiment: f64,
    volatility: f64,
    rsi: f64,
    ai_tag: String,
    is_trending: bool,
}

impl SignalRow {
    fn into_signal(self) -> Result<DerivedSignal, SignalError> {
        let ai_tag = self.ai_tag.parse().map_err(SignalError::Storage)?;
        Ok(DerivedSignal {
            symbol: self.symbol,
            price: self.price,
            volume: from_sql_count(self.volume),
            average_volume: from_sql_count(self.average_volume),
            change_percent: self.change_percent,
            volume_ratio: self.volume_ratio,
            sentiment: self.sentiment,
            volatility: self.volatility,
            rsi_approx: self.rsi,
            ai_tag,
            is_trending: self.is_trending,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    date: String,
    fear_greed_score: i64,
    market_mood: String,
    vix_approx: f64,
    bullish_sectors: String,
    bearish_sectors: String,
    active_sectors: String,
    advancing: i64,
    declining: i64,
    symbol_count: i64,
}

impl SummaryRow {
    fn into_summary(self) -> Result<MarketSummary, SignalError> {
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT)
            .map_err(|e| SignalError::Storage(format!("bad summary date {}: {}", self.date, e)))?;
        Ok(MarketSummary {
            date,
            fear_greed_score: self.fear_greed_score.clamp(0, 100) as u8,
            market_mood: self.market_mood.parse().map_err(SignalError::Storage)?,
            vix_approx: self.vix_approx,
            bullish_sectors: decode_list(&self.bullish_sectors)?,
            bearish_sectors: decode_list(&self.bearish_sectors)?,
            active_sectors: decode_list(&self.active_sectors)?,
            advancing: from_sql_count(self.advancing) as usize,
            declining: from_sql_count(self.declining) as usize,
            symbol_count: from_sql_count(self.symbol_count) as usize,
        })
    }
}

fn storage_err(e: sqlx::Error) -> SignalError {
    SignalError::Storage(e.to_string())
}

fn to_sql_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_sql_count(value: i64) -> u64 {
    value.max(0) as u64
}

fn encode_list(list: &[String]) -> Result<String, SignalError> {
    serde_json::to_string(list).map_err(|e| SignalError::Storage(e.to_string()))
}

fn decode_list(text: &str) -> Result<Vec<String>, SignalError> {
    serde_json::from_str(text).map_err(|e| SignalError::Storage(format!("bad sector list: {}", e)))
}

/// SQLite-backed store: `stock_signals` keyed by symbol, `market_sentiment` keyed by date.
#[derive(Clone)]
pub struct SqliteSignalStore {
    pool: SqlitePool,
}

impl SqliteSignalStore {
    /// Connect (creating the file if needed) and make sure the schema exists.
    pub async fn new(database_url: &str) -> Result<Self, SignalError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(storage_err)?
            .create_if_missing(true);

        // Every connection to `:memory:` is its own database, so pin the pool to one.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new().max_connections(5).connect_with(options).await
        }
        .map_err(storage_err)?;

        let store = Self { pool };
        store.init_schema().await?;

        tracing::debug!("Signal store ready at {}", database_url);
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), SignalError> {
        let schema = include_str!("../schema.sql");

        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&self.pool).await.map_err(storage_err)?;
            }
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SignalStore for SqliteSignalStore {
    async fn upsert_signals(&self, signals: &[DerivedSignal]) -> Result<(), SignalError> {
        if signals.is_empty() {
            return Ok(());
        }

        let updated_at = chrono::Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        for signal in signals {
            sqlx::query(
                "INSERT INTO stock_signals
                    (symbol, price, volume, average_volume, change_percent, volume_ratio,
                     sentiment, volatility, rsi, ai_tag, is_trending, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(symbol) DO UPDATE SET
                    price = excluded.price,
                    volume = excluded.volume,
                    average_volume = excluded.average_volume,
                    change_percent = excluded.change_percent,
                    volume_ratio = excluded.volume_ratio,
                    sentiment = excluded.sentiment,
                    volatility = excluded.volatility,
                    rsi = excluded.rsi,
                    ai_tag = excluded.ai_tag,
                    is_trending = excluded.is_trending,
                    updated_at = excluded.updated_at",
            )
            .bind(&signal.symbol)
            .bind(signal.price)
            .bind(to_sql_count(signal.volume))
            .bind(to_sql_count(signal.average_volume))
            .bind(signal.change_percent)
            .bind(signal.volume_ratio)
            .bind(signal.sentiment)
            .bind(signal.volatility)
            .bind(signal.rsi_approx)
            .bind(signal.ai_tag.as_str())
            .bind(signal.is_trending)
            .bind(&updated_at)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        }

        tx.commit().await.map_err(storage_err)?;
        Ok(())
    }

    async fn upsert_market_summary(&self, summary: &MarketSummary) -> Result<(), SignalError> {
        sqlx::query(
            "INSERT INTO market_sentiment
                (date, fear_greed_score, market_mood, vix_approx, bullish_sectors,
                 bearish_sectors, active_sectors, advancing, declining, symbol_count, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(date) DO UPDATE SET
                fear_greed_score = excluded.fear_greed_score,
                market_mood = excluded.market_mood,
                vix_approx = excluded.vix_approx,
                bullish_sectors = excluded.bullish_sectors,
                bearish_sectors = excluded.bearish_sectors,
                active_sectors = excluded.active_sectors,
                advancing = excluded.advancing,
                declining = excluded.declining,
                symbol_count = excluded.symbol_count,
                updated_at = excluded.updated_at",
        )
        .bind(summary.date.format(DATE_FORMAT).to_string())
        .bind(summary.fear_greed_score as i64)
        .bind(summary.market_mood.as_str())
        .bind(summary.vix_approx)
        .bind(encode_list(&summary.bullish_sectors)?)
        .bind(encode_list(&summary.bearish_sectors)?)
        .bind(encode_list(&summary.active_sectors)?)
        .bind(summary.advancing as i64)
        .bind(summary.declining as i64)
        .bind(summary.symbol_count as i64)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn latest_market_summary(&self) -> Result<Option<MarketSummary>, SignalError> {
        let row = sqlx::query_as::<_, SummaryRow>(
            "SELECT date, fear_greed_score, market_mood, vix_approx, bullish_sectors,
                    bearish_sectors, active_sectors, advancing, declining, symbol_count
             FROM market_sentiment
             ORDER BY date DESC
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(SummaryRow::into_summary).transpose()
    }

    async fn signals(&self) -> Result<Vec<DerivedSignal>, SignalError> {
        let rows = sqlx::query_as::<_, SignalRow>(
            "SELECT symbol, price, volume, average_volume, change_percent, volume_ratio,
                    sentiment, volatility, rsi, ai_tag, is_trending
             FROM stock_signals
             ORDER BY symbol",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.into_iter().map(SignalRow::into_signal).collect()
    }
}
