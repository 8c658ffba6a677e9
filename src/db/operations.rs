use anyhow::Result;
use rusqlite::{params, Connection};

use crate::db::models::{CoinRow, KpiSnapshot, ProxyRow};

/// Upsert a whole coin batch in one transaction, keyed by id.
///
/// Symbol and name are write-once; everything mutable is replaced. The batch
/// carries a single shared `last_updated` so one cycle stays internally
/// consistent.
pub fn upsert_coins(conn: &Connection, coins: &[CoinRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO coins (
                id, symbol, name, image,
                price, market_cap,
                price_change_1h, price_change_24h,
                price_change_7d, price_change_30d,
                market_cap_share, last_updated
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(id) DO UPDATE SET
                image = excluded.image,
                price = excluded.price,
                market_cap = excluded.market_cap,
                price_change_1h = excluded.price_change_1h,
                price_change_24h = excluded.price_change_24h,
                price_change_7d = excluded.price_change_7d,
                price_change_30d = excluded.price_change_30d,
                market_cap_share = excluded.market_cap_share,
                last_updated = excluded.last_updated",
        )?;
        for c in coins {
            stmt.execute(params![
                c.id,
                c.symbol,
                c.name,
                c.image,
                c.price,
                c.market_cap,
                c.price_change_1h,
                c.price_change_24h,
                c.price_change_7d,
                c.price_change_30d,
                c.market_cap_share,
                c.last_updated,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Replace-on-conflict path for the current (still open) trading day.
pub fn upsert_today_close(conn: &Connection, date: &str, price: f64) -> Result<()> {
    conn.execute(
        "INSERT INTO btc_history (date, price) VALUES (?1, ?2)
         ON CONFLICT(date) DO UPDATE SET price = excluded.price",
        params![date, price],
    )?;
    Ok(())
}

/// Ignore-on-conflict path for closed days; never rewrites an existing row.
pub fn insert_close(conn: &Connection, date: &str, price: f64) -> Result<usize> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO btc_history (date, price) VALUES (?1, ?2)",
        params![date, price],
    )?;
    Ok(inserted)
}

/// Overwrite the singleton KPI snapshot.
pub fn save_kpis(conn: &Connection, kpis: &KpiSnapshot) -> Result<()> {
    conn.execute(
        "INSERT INTO btc_kpis (
            id, price, change_24h, market_cap, volume_24h, dominance,
            circulating_supply, high_24h, low_24h, max_supply, ath, from_ath,
            last_updated
        ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(id) DO UPDATE SET
            price = excluded.price,
            change_24h = excluded.change_24h,
            market_cap = excluded.market_cap,
            volume_24h = excluded.volume_24h,
            dominance = excluded.dominance,
            circulating_supply = excluded.circulating_supply,
            high_24h = excluded.high_24h,
            low_24h = excluded.low_24h,
            max_supply = excluded.max_supply,
            ath = excluded.ath,
            from_ath = excluded.from_ath,
            last_updated = excluded.last_updated",
        params![
            kpis.price,
            kpis.change_24h,
            kpis.market_cap,
            kpis.volume_24h,
            kpis.dominance,
            kpis.circulating_supply,
            kpis.high_24h,
            kpis.low_24h,
            kpis.max_supply,
            kpis.ath,
            kpis.from_ath,
            kpis.last_updated,
        ],
    )?;
    Ok(())
}

/// Upsert scraped proxy holdings keyed by ticker. Tickers missing from this
/// batch are left as-is; there is no tombstoning.
pub fn upsert_proxies(conn: &Connection, rows: &[ProxyRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO proxies_latest (
                ticker, name, type, btc, usd, price,
                country, country_flag, pct_21m, filing_link, last_updated
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(ticker) DO UPDATE SET
                name = excluded.name,
                type = excluded.type,
                btc = excluded.btc,
                usd = excluded.usd,
                price = excluded.price,
                country = excluded.country,
                country_flag = excluded.country_flag,
                pct_21m = excluded.pct_21m,
                filing_link = excluded.filing_link,
                last_updated = excluded.last_updated",
        )?;
        for r in rows {
            stmt.execute(params![
                r.ticker,
                r.name,
                r.kind,
                r.btc,
                r.usd,
                r.price,
                r.country,
                r.country_flag,
                r.pct_21m,
                r.filing_link,
                r.last_updated,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::run_migrations;
    use crate::db::queries::{btc_history, list_proxies, load_kpis, top_coins};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn coin(id: &str, market_cap: f64, price: f64) -> CoinRow {
        CoinRow {
            id: id.to_string(),
            symbol: id[..3.min(id.len())].to_string(),
            name: id.to_string(),
            image: None,
            price,
            market_cap,
            price_change_1h: 0.1,
            price_change_24h: -1.2,
            price_change_7d: 3.4,
            price_change_30d: 5.6,
            market_cap_share: 0.0,
            last_updated: "2025-06-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn coin_upsert_is_idempotent() {
        let conn = test_conn();
        let batch = vec![coin("bitcoin", 2.0e12, 100_000.0), coin("ethereum", 4.0e11, 3_500.0)];

        upsert_coins(&conn, &batch).unwrap();
        upsert_coins(&conn, &batch).unwrap();

        let rows = top_coins(&conn, 50).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "bitcoin");
        assert_eq!(rows[1].id, "ethereum");
    }

    #[test]
    fn coin_upsert_replaces_mutable_fields_only() {
        let conn = test_conn();
        upsert_coins(&conn, &[coin("bitcoin", 2.0e12, 100_000.0)]).unwrap();

        let mut updated = coin("bitcoin", 2.1e12, 104_000.0);
        updated.symbol = "xxx".to_string();
        updated.name = "Renamed".to_string();
        upsert_coins(&conn, &[updated]).unwrap();

        let rows = top_coins(&conn, 50).unwrap();
        assert_eq!(rows[0].price, 104_000.0);
        assert_eq!(rows[0].market_cap, 2.1e12);
        // symbol/name are write-once
        assert_eq!(rows[0].symbol, "bit");
        assert_eq!(rows[0].name, "bitcoin");
    }

    #[test]
    fn history_ignore_path_never_rewrites_a_closed_day() {
        let conn = test_conn();
        assert_eq!(insert_close(&conn, "2025-05-30", 101_000.0).unwrap(), 1);
        assert_eq!(insert_close(&conn, "2025-05-30", 999_999.0).unwrap(), 0);

        let points = btc_history(&conn).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].price, 101_000.0);
    }

    #[test]
    fn history_today_path_replaces_in_place() {
        let conn = test_conn();
        upsert_today_close(&conn, "2025-05-31", 101_000.0).unwrap();
        upsert_today_close(&conn, "2025-05-31", 102_500.0).unwrap();

        let points = btc_history(&conn).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].price, 102_500.0);
    }

    #[test]
    fn kpi_snapshot_roundtrips_and_overwrites() {
        let conn = test_conn();
        assert!(load_kpis(&conn).unwrap().is_none());

        let mut snap = KpiSnapshot {
            price: 100_000.0,
            change_24h: 1.5,
            market_cap: 2.0e12,
            volume_24h: 4.0e10,
            dominance: 55.0,
            circulating_supply: 1.98e7,
            high_24h: Some(101_000.0),
            low_24h: Some(98_000.0),
            max_supply: Some(2.1e7),
            ath: Some(109_000.0),
            from_ath: Some(-8.25),
            last_updated: "2025-06-01T00:00:00+00:00".to_string(),
        };
        save_kpis(&conn, &snap).unwrap();
        assert_eq!(load_kpis(&conn).unwrap().unwrap(), snap);

        snap.price = 95_000.0;
        snap.ath = None;
        snap.from_ath = None;
        save_kpis(&conn, &snap).unwrap();

        let loaded = load_kpis(&conn).unwrap().unwrap();
        assert_eq!(loaded.price, 95_000.0);
        assert!(loaded.ath.is_none());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM btc_kpis", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn proxy_upsert_keeps_absent_tickers() {
        let conn = test_conn();
        let row = |ticker: &str, btc: f64| ProxyRow {
            ticker: ticker.to_string(),
            name: format!("{ticker} Inc."),
            kind: "public".to_string(),
            btc,
            usd: btc * 100_000.0,
            price: 100_000.0,
            country: Some("United States".to_string()),
            country_flag: None,
            pct_21m: Some(btc / 21_000_000.0 * 100.0),
            filing_link: None,
            last_updated: "2025-06-01T00:00:00+00:00".to_string(),
        };

        upsert_proxies(&conn, &[row("MSTR", 580_000.0), row("MARA", 48_000.0)]).unwrap();
        // next scrape no longer contains MARA
        upsert_proxies(&conn, &[row("MSTR", 582_000.0)]).unwrap();

        let rows = list_proxies(&conn).unwrap();
        assert_eq!(rows.len(), 2);
        let mstr = rows.iter().find(|r| r.ticker == "MSTR").unwrap();
        assert_eq!(mstr.btc, 582_000.0);
        assert!(rows.iter().any(|r| r.ticker == "MARA"));
    }
}
