use anyhow::Result;
use rusqlite::Connection;

use crate::db::models::{CoinRow, HistoryPoint, KpiSnapshot, ProxyRow};

/// Stored coins ordered by market cap, largest first.
pub fn top_coins(conn: &Connection, limit: u32) -> Result<Vec<CoinRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, symbol, name, image,
                price, market_cap,
                price_change_1h, price_change_24h,
                price_change_7d, price_change_30d,
                market_cap_share, last_updated
           FROM coins
          ORDER BY market_cap DESC
          LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit], |row| {
            Ok(CoinRow {
                id: row.get(0)?,
                symbol: row.get(1)?,
                name: row.get(2)?,
                image: row.get(3)?,
                price: row.get(4)?,
                market_cap: row.get(5)?,
                price_change_1h: row.get(6)?,
                price_change_24h: row.get(7)?,
                price_change_7d: row.get(8)?,
                price_change_30d: row.get(9)?,
                market_cap_share: row.get(10)?,
                last_updated: row.get(11)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Daily Bitcoin closes, oldest first.
pub fn btc_history(conn: &Connection) -> Result<Vec<HistoryPoint>> {
    let mut stmt = conn.prepare("SELECT date, price FROM btc_history ORDER BY date")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(HistoryPoint {
                date: row.get(0)?,
                price: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The persisted KPI snapshot, if one was ever stored.
pub fn load_kpis(conn: &Connection) -> Result<Option<KpiSnapshot>> {
    let result = conn.query_row(
        "SELECT price, change_24h, market_cap, volume_24h, dominance,
                circulating_supply, high_24h, low_24h, max_supply, ath,
                from_ath, last_updated
           FROM btc_kpis
          WHERE id = 1",
        [],
        |row| {
            Ok(KpiSnapshot {
                price: row.get(0)?,
                change_24h: row.get(1)?,
                market_cap: row.get(2)?,
                volume_24h: row.get(3)?,
                dominance: row.get(4)?,
                circulating_supply: row.get(5)?,
                high_24h: row.get(6)?,
                low_24h: row.get(7)?,
                max_supply: row.get(8)?,
                ath: row.get(9)?,
                from_ath: row.get(10)?,
                last_updated: row.get(11)?,
            })
        },
    );

    match result {
        Ok(snap) => Ok(Some(snap)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All stored proxy holdings.
pub fn list_proxies(conn: &Connection) -> Result<Vec<ProxyRow>> {
    let mut stmt = conn.prepare(
        "SELECT ticker, name, type, btc, usd, price,
                country, country_flag, pct_21m, filing_link, last_updated
           FROM proxies_latest",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ProxyRow {
                ticker: row.get(0)?,
                name: row.get(1)?,
                kind: row.get(2)?,
                btc: row.get(3)?,
                usd: row.get(4)?,
                price: row.get(5)?,
                country: row.get(6)?,
                country_flag: row.get(7)?,
                pct_21m: row.get(8)?,
                filing_link: row.get(9)?,
                last_updated: row.get(10)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::run_migrations;
    use crate::db::operations::{insert_close, upsert_coins};

    #[test]
    fn top_coins_orders_by_market_cap_and_limits() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let mk = |id: &str, mcap: f64| CoinRow {
            id: id.to_string(),
            symbol: id.to_string(),
            name: id.to_string(),
            image: None,
            price: 1.0,
            market_cap: mcap,
            price_change_1h: 0.0,
            price_change_24h: 0.0,
            price_change_7d: 0.0,
            price_change_30d: 0.0,
            market_cap_share: 0.0,
            last_updated: "2025-06-01T00:00:00+00:00".to_string(),
        };
        upsert_coins(&conn, &[mk("small", 1.0), mk("big", 3.0), mk("mid", 2.0)]).unwrap();

        let rows = top_coins(&conn, 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "big");
        assert_eq!(rows[1].id, "mid");
    }

    #[test]
    fn history_is_ordered_by_date_ascending() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        insert_close(&conn, "2025-06-02", 2.0).unwrap();
        insert_close(&conn, "2025-06-01", 1.0).unwrap();
        insert_close(&conn, "2025-06-03", 3.0).unwrap();

        let dates: Vec<String> = btc_history(&conn).unwrap().into_iter().map(|p| p.date).collect();
        assert_eq!(dates, vec!["2025-06-01", "2025-06-02", "2025-06-03"]);
    }
}
