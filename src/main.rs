use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use tokio::net::TcpListener;

mod api;
mod config;
mod db;
mod services;
mod types;

use crate::api::routes::create_router;
use crate::api::state::AppState;
use crate::config::AppConfig;
use crate::services::cache::TtlCache;
use crate::services::market::MarketClient;
use crate::services::proxies::{self, CuratedList};
use crate::services::{pipeline, scheduler};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();

    dotenv().ok();
    let cfg = AppConfig::from_env();
    tracing::info!("Using database file {}", cfg.database_path);

    let pool = db::init::open_pool(&cfg.database_path, 8)?;
    let conn = pool.get()?;
    db::init::run_migrations(&conn)?;
    drop(conn);

    let limiter = Arc::new(RateLimiter::direct(Quota::per_minute(nonzero!(30u32))));
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(12))
        .build()?;
    let market = MarketClient::new(&cfg, http.clone(), limiter);

    let curated = match CuratedList::load(&cfg.tickers_file) {
        Ok(list) => {
            tracing::info!("Loaded {} curated proxy tickers", list.len());
            list
        }
        Err(e) => {
            tracing::warn!("Could not load curated tickers, proxies disabled: {e:#}");
            CuratedList::default()
        }
    };

    let kpi_cache = TtlCache::new(Duration::from_secs(cfg.kpi_ttl_secs));
    let state = Arc::new(AppState {
        config: cfg,
        pool,
        market,
        http,
        curated,
        kpi_cache,
    });

    // Initial sync so the API serves data before the first timer fires.
    if let Err(e) =
        pipeline::run_market_cycle(&state.market, &state.pool, &state.kpi_cache).await
    {
        tracing::warn!("Initial market sync failed: {e:#}");
    }
    if let Err(e) = proxies::update_proxies(
        &state.http,
        &state.config.treasuries_url,
        &state.curated,
        &state.pool,
    )
    .await
    {
        tracing::warn!("Initial treasuries scrape failed: {e:#}");
    }

    scheduler::start(Arc::clone(&state));

    let app = create_router(Arc::clone(&state), &state.config.static_dir);
    let addr: SocketAddr = format!("{}:{}", state.config.bind, state.config.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
