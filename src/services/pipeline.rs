use anyhow::Result;
use chrono::Utc;

use crate::db::init::DbPool;
use crate::db::models::{CoinRow, KpiSnapshot};
use crate::db::operations::{insert_close, save_kpis, upsert_coins, upsert_today_close};
use crate::db::queries::load_kpis;
use crate::services::cache::TtlCache;
use crate::services::market::MarketClient;
use crate::types::models::{MarketCoin, BITCOIN_ID};

pub fn today_utc() -> String {
    Utc::now().date_naive().to_string()
}

/// One scheduled market cycle: fetch global cap and top coins, upsert the
/// coin batch under a single shared timestamp, roll Bitcoin's intra-day
/// close, then refresh the KPI snapshot. A failed fetch degrades that part
/// of the cycle; storage errors propagate to the caller.
pub async fn run_market_cycle(
    market: &MarketClient,
    pool: &DbPool,
    cache: &TtlCache<KpiSnapshot>,
) -> Result<()> {
    let total = match market.global_market_cap().await {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!("Global market cap fetch failed: {e:#}");
            None
        }
    };
    let coins = match market.top_coins().await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Top coins fetch failed: {e:#}");
            None
        }
    };
    let now = Utc::now().to_rfc3339();

    if let Some(coins) = &coins {
        let rows = normalize_coins(coins, total, &now);
        let conn = pool.get()?;
        upsert_coins(&conn, &rows)?;
        tracing::info!("Upserted {} coins", rows.len());

        if let Some(price) = coins
            .iter()
            .find(|c| c.id == BITCOIN_ID)
            .and_then(|c| c.current_price)
        {
            upsert_today_close(&conn, &today_utc(), price)?;
        }
    }

    if let Some(snap) = refresh_kpis(market, pool, coins.as_deref(), total, &now).await? {
        cache.put(snap).await;
    }

    Ok(())
}

/// Turn fetched coins into storable rows. The market-cap share is derived
/// from this cycle's global total (0 when the total is zero or
/// unavailable); rows missing price or market cap are dropped.
pub fn normalize_coins(coins: &[MarketCoin], total: Option<f64>, now: &str) -> Vec<CoinRow> {
    coins
        .iter()
        .filter_map(|c| {
            let price = c.current_price?;
            let market_cap = c.market_cap?;
            let share = match total {
                Some(t) if t > 0.0 => market_cap / t * 100.0,
                _ => 0.0,
            };
            Some(CoinRow {
                id: c.id.clone(),
                symbol: c.symbol.clone(),
                name: c.name.clone(),
                image: c.image.clone(),
                price,
                market_cap,
                price_change_1h: c.price_change_percentage_1h_in_currency.unwrap_or(0.0),
                price_change_24h: c.price_change_percentage_24h_in_currency.unwrap_or(0.0),
                price_change_7d: c.price_change_percentage_7d_in_currency.unwrap_or(0.0),
                price_change_30d: c.price_change_percentage_30d_in_currency.unwrap_or(0.0),
                market_cap_share: share,
                last_updated: now.to_string(),
            })
        })
        .collect()
}

/// Refresh the KPI snapshot from an already-fetched coin batch and global
/// total. When either input is unavailable the prior persisted snapshot is
/// returned unchanged; nothing is partially overwritten. The ATH detail
/// fetch degrades to the persisted ATH on rate limiting.
pub async fn refresh_kpis(
    market: &MarketClient,
    pool: &DbPool,
    coins: Option<&[MarketCoin]>,
    total: Option<f64>,
    now: &str,
) -> Result<Option<KpiSnapshot>> {
    let btc = coins.and_then(|cs| cs.iter().find(|c| c.id == BITCOIN_ID));
    let (btc, total) = match (btc, total) {
        (Some(b), Some(t)) if t > 0.0 => (b, t),
        _ => {
            tracing::debug!("KPI inputs unavailable, serving last persisted snapshot");
            let conn = pool.get()?;
            return load_kpis(&conn);
        }
    };

    let ath = match market.bitcoin_ath().await {
        Ok(Some(a)) => Some(a),
        Ok(None) => stored_ath(pool)?,
        Err(e) => {
            tracing::warn!("ATH fetch failed, reusing persisted value: {e:#}");
            stored_ath(pool)?
        }
    };

    let snap = build_kpi_snapshot(btc, total, ath, now);
    let conn = pool.get()?;
    save_kpis(&conn, &snap)?;
    Ok(Some(snap))
}

/// Full refresh chain (global cap -> markets -> ATH) used by the KPI
/// endpoint on cache expiry.
pub async fn refresh_kpis_live(market: &MarketClient, pool: &DbPool) -> Result<Option<KpiSnapshot>> {
    let total = match market.global_market_cap().await {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!("Global market cap fetch failed: {e:#}");
            None
        }
    };
    let coins = match market.top_coins().await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Top coins fetch failed: {e:#}");
            None
        }
    };
    let now = Utc::now().to_rfc3339();
    refresh_kpis(market, pool, coins.as_deref(), total, &now).await
}

fn stored_ath(pool: &DbPool) -> Result<Option<f64>> {
    let conn = pool.get()?;
    Ok(load_kpis(&conn)?.and_then(|k| k.ath))
}

/// Assemble the snapshot from one cycle's inputs. Dominance and
/// percent-from-ATH are always recomputed from the same-cycle price and
/// total, never carried over.
pub fn build_kpi_snapshot(
    btc: &MarketCoin,
    total: f64,
    ath: Option<f64>,
    now: &str,
) -> KpiSnapshot {
    let price = btc.current_price.unwrap_or(0.0);
    let market_cap = btc.market_cap.unwrap_or(0.0);
    let from_ath = ath
        .filter(|a| *a > 0.0)
        .map(|a| (price - a) / a * 100.0);

    KpiSnapshot {
        price,
        change_24h: btc.price_change_percentage_24h_in_currency.unwrap_or(0.0),
        market_cap,
        volume_24h: btc.total_volume.unwrap_or(0.0),
        dominance: if total > 0.0 {
            market_cap / total * 100.0
        } else {
            0.0
        },
        circulating_supply: btc.circulating_supply.unwrap_or(0.0),
        high_24h: btc.high_24h,
        low_24h: btc.low_24h,
        max_supply: btc.max_supply,
        ath,
        from_ath,
        last_updated: now.to_string(),
    }
}

/// Daily rollover: seal the new calendar date through the ignore path so
/// closed days are never rewritten.
pub async fn run_rollover(market: &MarketClient, pool: &DbPool) -> Result<()> {
    let Some(coins) = market.top_coins().await? else {
        tracing::warn!("Rollover skipped, coin fetch unavailable");
        return Ok(());
    };
    let Some(price) = coins
        .iter()
        .find(|c| c.id == BITCOIN_ID)
        .and_then(|c| c.current_price)
    else {
        tracing::warn!("Rollover skipped, no Bitcoin price in batch");
        return Ok(());
    };

    let conn = pool.get()?;
    let date = today_utc();
    if insert_close(&conn, &date, price)? > 0 {
        tracing::info!("History rollover recorded {} @ {}", date, price);
    }
    Ok(())
}
