use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::init::DbPool;
use crate::db::models::KpiSnapshot;
use crate::services::cache::TtlCache;
use crate::services::market::MarketClient;
use crate::services::proxies::CuratedList;

/// Shared application state, handed to route handlers and the scheduler.
pub struct AppState {
    pub config: AppConfig,
    pub pool: DbPool,
    pub market: MarketClient,
    pub http: reqwest::Client,
    pub curated: CuratedList,
    pub kpi_cache: TtlCache<KpiSnapshot>,
}

pub type SharedState = Arc<AppState>;
