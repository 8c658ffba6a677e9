use std::path::Path;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use super::handlers::{get_btc_history, get_btc_kpis, get_cryptos, get_proxies};
use super::state::SharedState;

/// The read API plus static asset passthrough; unmatched paths fall back
/// to the index document.
pub fn create_router(state: SharedState, static_dir: &Path) -> Router {
    let assets = ServeDir::new(static_dir)
        .not_found_service(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/api/cryptos", get(get_cryptos))
        .route("/api/bitcoin/history", get(get_btc_history))
        .route("/api/bitcoin/kpis", get(get_btc_kpis))
        .route("/api/proxies", get(get_proxies))
        .fallback_service(assets)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
