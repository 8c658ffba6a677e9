//! Versioned schema migrations, applied in order at startup.
//!
//! Each entry is one schema version; `PRAGMA user_version` records the last
//! applied one. Never edit a shipped entry, append a new one.

pub const MIGRATIONS: &[&str] = &[V1_COINS_AND_HISTORY, V2_BTC_KPIS, V3_PROXIES];

const V1_COINS_AND_HISTORY: &str = r#"
CREATE TABLE IF NOT EXISTS coins (
    id TEXT PRIMARY KEY,
    symbol TEXT NOT NULL,
    name TEXT NOT NULL,
    image TEXT,
    price REAL NOT NULL,
    market_cap REAL NOT NULL,
    price_change_1h REAL NOT NULL DEFAULT 0,
    price_change_24h REAL NOT NULL DEFAULT 0,
    price_change_7d REAL NOT NULL DEFAULT 0,
    price_change_30d REAL NOT NULL DEFAULT 0,
    market_cap_share REAL NOT NULL DEFAULT 0,
    last_updated TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_coins_market_cap ON coins(market_cap DESC);

CREATE TABLE IF NOT EXISTS btc_history (
    date TEXT PRIMARY KEY,
    price REAL NOT NULL
);
"#;

const V2_BTC_KPIS: &str = r#"
CREATE TABLE IF NOT EXISTS btc_kpis (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    price REAL NOT NULL,
    change_24h REAL NOT NULL,
    market_cap REAL NOT NULL,
    volume_24h REAL NOT NULL,
    dominance REAL NOT NULL,
    circulating_supply REAL NOT NULL,
    high_24h REAL,
    low_24h REAL,
    max_supply REAL,
    ath REAL,
    from_ath REAL,
    last_updated TEXT NOT NULL
);
"#;

const V3_PROXIES: &str = r#"
CREATE TABLE IF NOT EXISTS proxies_latest (
    ticker TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    btc REAL NOT NULL,
    usd REAL NOT NULL,
    price REAL NOT NULL,
    country TEXT,
    country_flag TEXT,
    pct_21m REAL,
    filing_link TEXT,
    last_updated TEXT NOT NULL
);
"#;
