use std::collections::HashMap;

use serde::Deserialize;

pub const BITCOIN_ID: &str = "bitcoin";

/// One entry of the upstream `/coins/markets` response.
///
/// Numeric fields are optional: the upstream omits or nulls them for thinly
/// traded assets, and a missing change percentage is treated as 0 at upsert
/// time rather than failing the whole batch.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketCoin {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub high_24h: Option<f64>,
    #[serde(default)]
    pub low_24h: Option<f64>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
    #[serde(default)]
    pub max_supply: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_1h_in_currency: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h_in_currency: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_7d_in_currency: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_30d_in_currency: Option<f64>,
}

/// Envelope of the `/global` endpoint.
#[derive(Debug, Deserialize)]
pub struct GlobalResponse {
    pub data: GlobalData,
}

#[derive(Debug, Deserialize)]
pub struct GlobalData {
    #[serde(default)]
    pub total_market_cap: HashMap<String, f64>,
}

/// Subset of the `/coins/{id}` detail response we read the all-time high from.
#[derive(Debug, Deserialize)]
pub struct CoinDetail {
    pub market_data: CoinDetailMarketData,
}

#[derive(Debug, Deserialize)]
pub struct CoinDetailMarketData {
    #[serde(default)]
    pub ath: HashMap<String, f64>,
}

/// One row scraped from the treasuries table, before allow-list filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedHolding {
    pub ticker: String,
    pub country: Option<String>,
    pub country_flag: Option<String>,
    pub filing_link: Option<String>,
    pub btc: f64,
    pub usd: f64,
    pub pct_21m: Option<f64>,
}
