use std::env;
use std::path::PathBuf;

/// Service configuration derived from environment variables.
///
/// Variable names are kept compatible with the `.env` file of the original
/// deployment so an existing file can be reused as-is.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: String,
    pub port: u16,

    /// SQLite database file.
    pub database_path: String,

    /// Upstream market-data API base, e.g. https://api.coingecko.com/api/v3
    pub api_base_url: String,
    pub vs_currency: String,
    /// Page size for the top-coins fetch; also the read-API limit.
    pub per_page: u32,

    /// Treasury-holdings page to scrape.
    pub treasuries_url: String,
    /// Curated ticker allow-list (JSON: ticker -> {name, type}).
    pub tickers_file: PathBuf,

    pub static_dir: PathBuf,
    pub kpi_ttl_secs: u64,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind: env_str("BIND", "0.0.0.0"),
            port: env_u16("PORT", 5000),
            database_path: env_str("DATABASE_PATH", "crypto.db"),
            api_base_url: env_str("API_BASE_URL", "https://api.coingecko.com/api/v3"),
            vs_currency: env_str("VS_CURRENCY", "usd").to_lowercase(),
            per_page: env_u32("PER_PAGE", 50),
            treasuries_url: env_str("TREASURIES_URL", "https://bitbo.io/treasuries/"),
            tickers_file: PathBuf::from(env_str("TICKERS_FILE", "proxy_tickers.json")),
            static_dir: PathBuf::from(env_str("STATIC_DIR", "static")),
            kpi_ttl_secs: env_u64("KPI_TTL_SECS", 300),
        }
    }
}
