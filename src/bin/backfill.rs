//! One-shot backfill of daily BTC-USD closes into `btc_history`.
//!
//! Pages daily candles from the Coinbase Exchange API in 300-day chunks
//! (the per-request maximum) and inserts closes through the ignore path,
//! so rows the service already wrote are left untouched.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;

const CANDLES_URL: &str = "https://api.exchange.coinbase.com/products/BTC-USD/candles";
const CHUNK_DAYS: i64 = 300;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let db_path = std::env::var("DATABASE_PATH").unwrap_or_else(|_| "crypto.db".to_string());
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open database at {db_path}"))?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS btc_history (date TEXT PRIMARY KEY, price REAL NOT NULL)",
        [],
    )?;

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .user_agent("coinwatch-backfill")
        .build()?;

    // Reliable daily data starts around 2015 on this feed.
    let mut cursor = NaiveDate::from_ymd_opt(2015, 1, 1)
        .expect("valid start date")
        .and_hms_opt(0, 0, 0)
        .expect("valid start time");
    let end = Utc::now().naive_utc();
    let mut inserted = 0usize;

    while cursor < end {
        let chunk_end = (cursor + chrono::Duration::days(CHUNK_DAYS)).min(end);
        tracing::info!("Fetching {} -> {}", cursor.date(), chunk_end.date());

        // Each candle: [time, low, high, open, close, volume]
        let candles: Vec<[f64; 6]> = http
            .get(CANDLES_URL)
            .query(&[
                ("start", cursor.to_string()),
                ("end", chunk_end.to_string()),
                ("granularity", "86400".to_string()),
            ])
            .send()
            .await
            .context("candles request failed")?
            .error_for_status()
            .context("candles API error")?
            .json()
            .await
            .context("failed to parse candles response")?;

        for candle in &candles {
            let date = chrono::DateTime::from_timestamp(candle[0] as i64, 0)
                .context("candle timestamp out of range")?
                .date_naive()
                .to_string();
            inserted += conn.execute(
                "INSERT OR IGNORE INTO btc_history (date, price) VALUES (?1, ?2)",
                rusqlite::params![date, candle[4]],
            )?;
        }

        cursor = chunk_end + chrono::Duration::seconds(1);
    }

    tracing::info!("Backfill complete, {} new rows in btc_history", inserted);
    Ok(())
}
