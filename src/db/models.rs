use serde::Serialize;

/// A stored coin snapshot; also the `/api/cryptos` wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinRow {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: Option<String>,
    pub price: f64,
    pub market_cap: f64,
    pub price_change_1h: f64,
    pub price_change_24h: f64,
    pub price_change_7d: f64,
    pub price_change_30d: f64,
    pub market_cap_share: f64,
    pub last_updated: String,
}

/// One closed (or in-progress today) daily Bitcoin price point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub date: String,
    pub price: f64,
}

/// The singleton Bitcoin KPI snapshot; also the `/api/bitcoin/kpis` wire
/// shape. Optional fields stay null when the upstream never supplied them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSnapshot {
    pub price: f64,
    pub change_24h: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub dominance: f64,
    pub circulating_supply: f64,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub max_supply: Option<f64>,
    pub ath: Option<f64>,
    pub from_ath: Option<f64>,
    pub last_updated: String,
}

/// A stored treasury proxy holding; also the `/api/proxies` wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyRow {
    pub ticker: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub btc: f64,
    pub usd: f64,
    pub price: f64,
    pub country: Option<String>,
    pub country_flag: Option<String>,
    pub pct_21m: Option<f64>,
    pub filing_link: Option<String>,
    pub last_updated: String,
}
