use std::sync::Arc;

use anyhow::{Context, Result};
use governor::{clock::DefaultClock, state::{InMemoryState, NotKeyed}, RateLimiter};
use reqwest::StatusCode;

use crate::config::AppConfig;
use crate::types::models::{CoinDetail, GlobalResponse, MarketCoin, BITCOIN_ID};

pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Client for the CoinGecko-shaped market-data API.
///
/// Every call waits on the shared rate limiter first and maps an HTTP 429 to
/// `Ok(None)` so the caller can fall back to the last persisted snapshot
/// instead of failing the cycle.
pub struct MarketClient {
    http: reqwest::Client,
    base: String,
    vs_currency: String,
    per_page: u32,
    limiter: Arc<Limiter>,
}

impl MarketClient {
    pub fn new(cfg: &AppConfig, http: reqwest::Client, limiter: Arc<Limiter>) -> Self {
        Self {
            http,
            base: cfg.api_base_url.trim_end_matches('/').to_string(),
            vs_currency: cfg.vs_currency.clone(),
            per_page: cfg.per_page,
            limiter,
        }
    }

    /// Total market cap in the configured quote currency, from `/global`.
    pub async fn global_market_cap(&self) -> Result<Option<f64>> {
        self.limiter.until_ready().await;
        let url = format!("{}/global", self.base);
        let resp = self
            .http
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await
            .context("global market cap request failed")?;

        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Rate limited on /global, total market cap unavailable");
            return Ok(None);
        }

        let body: GlobalResponse = resp
            .error_for_status()
            .context("global market cap API error")?
            .json()
            .await
            .context("failed to parse /global response")?;

        Ok(body.data.total_market_cap.get(&self.vs_currency).copied())
    }

    /// Top coins by market cap from `/coins/markets`, one page.
    pub async fn top_coins(&self) -> Result<Option<Vec<MarketCoin>>> {
        self.limiter.until_ready().await;
        let url = format!("{}/coins/markets", self.base);
        let resp = self
            .http
            .get(&url)
            .header("accept", "application/json")
            .query(&[
                ("vs_currency", self.vs_currency.clone()),
                ("order", "market_cap_desc".to_string()),
                ("per_page", self.per_page.to_string()),
                ("page", "1".to_string()),
                ("sparkline", "false".to_string()),
                ("price_change_percentage", "1h,24h,7d,30d".to_string()),
            ])
            .send()
            .await
            .context("top coins request failed")?;

        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Rate limited on /coins/markets, skipping coin batch");
            return Ok(None);
        }

        let coins: Vec<MarketCoin> = resp
            .error_for_status()
            .context("top coins API error")?
            .json()
            .await
            .context("failed to parse /coins/markets response")?;

        Ok(Some(coins))
    }

    /// Bitcoin's all-time-high price from the single-coin detail endpoint.
    pub async fn bitcoin_ath(&self) -> Result<Option<f64>> {
        self.limiter.until_ready().await;
        let url = format!("{}/coins/{}", self.base, BITCOIN_ID);
        let resp = self
            .http
            .get(&url)
            .header("accept", "application/json")
            .query(&[
                ("localization", "false"),
                ("tickers", "false"),
                ("market_data", "true"),
                ("community_data", "false"),
                ("developer_data", "false"),
            ])
            .send()
            .await
            .context("coin detail request failed")?;

        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Rate limited on coin detail, ATH unavailable");
            return Ok(None);
        }

        let detail: CoinDetail = resp
            .error_for_status()
            .context("coin detail API error")?
            .json()
            .await
            .context("failed to parse coin detail response")?;

        Ok(detail.market_data.ath.get(&self.vs_currency).copied())
    }
}

#[cfg(test)]
mod tests {
    use crate::types::models::{CoinDetail, GlobalResponse, MarketCoin};

    #[test]
    fn parses_global_response() {
        let body = r#"{
            "data": {
                "total_market_cap": {"usd": 3.4e12, "eur": 3.1e12},
                "market_cap_percentage": {"btc": 58.2}
            }
        }"#;
        let parsed: GlobalResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data.total_market_cap.get("usd"), Some(&3.4e12));
        assert!(parsed.data.total_market_cap.get("gbp").is_none());
    }

    #[test]
    fn parses_market_coin_with_missing_change_fields() {
        let body = r#"[{
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "image": "https://example.com/btc.png",
            "current_price": 100000.0,
            "market_cap": 2.0e12,
            "total_volume": 4.0e10,
            "high_24h": 101000.0,
            "low_24h": 98000.0,
            "circulating_supply": 19800000.0,
            "max_supply": 21000000.0,
            "price_change_percentage_24h_in_currency": -1.25
        }]"#;
        let coins: Vec<MarketCoin> = serde_json::from_str(body).unwrap();
        assert_eq!(coins.len(), 1);
        let btc = &coins[0];
        assert_eq!(btc.current_price, Some(100000.0));
        assert_eq!(btc.price_change_percentage_24h_in_currency, Some(-1.25));
        assert!(btc.price_change_percentage_7d_in_currency.is_none());
    }

    #[test]
    fn parses_coin_detail_ath() {
        let body = r#"{
            "market_data": {
                "ath": {"usd": 109000.0},
                "current_price": {"usd": 100000.0}
            }
        }"#;
        let detail: CoinDetail = serde_json::from_str(body).unwrap();
        assert_eq!(detail.market_data.ath.get("usd"), Some(&109000.0));
    }
}
