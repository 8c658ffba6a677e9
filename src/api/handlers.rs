use axum::{extract::State, Json};

use super::error::ApiError;
use super::state::SharedState;
use crate::db::models::{CoinRow, HistoryPoint, KpiSnapshot, ProxyRow};
use crate::db::queries;
use crate::services::pipeline;

/// Stored coin snapshots, market cap descending.
pub async fn get_cryptos(State(state): State<SharedState>) -> Result<Json<Vec<CoinRow>>, ApiError> {
    let conn = state.pool.get()?;
    let rows = queries::top_coins(&conn, state.config.per_page)?;
    Ok(Json(rows))
}

/// Daily Bitcoin closes, oldest first.
pub async fn get_btc_history(
    State(state): State<SharedState>,
) -> Result<Json<Vec<HistoryPoint>>, ApiError> {
    let conn = state.pool.get()?;
    let points = queries::btc_history(&conn)?;
    Ok(Json(points))
}

/// The KPI snapshot, via the TTL cache. On expiry this blocks the request
/// on the full refresh chain; a failed chain falls back to the persisted
/// snapshot, and only a never-populated store yields a 503.
pub async fn get_btc_kpis(
    State(state): State<SharedState>,
) -> Result<Json<KpiSnapshot>, ApiError> {
    let snap = state
        .kpi_cache
        .get_or_refresh(|| async {
            match pipeline::refresh_kpis_live(&state.market, &state.pool).await {
                Ok(snap) => snap,
                Err(e) => {
                    tracing::error!("KPI refresh failed: {e:#}");
                    None
                }
            }
        })
        .await;

    snap.map(Json).ok_or(ApiError::KpisNotReady)
}

/// Stored treasury proxy holdings.
pub async fn get_proxies(
    State(state): State<SharedState>,
) -> Result<Json<Vec<ProxyRow>>, ApiError> {
    let conn = state.pool.get()?;
    let rows = queries::list_proxies(&conn)?;
    Ok(Json(rows))
}
