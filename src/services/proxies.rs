use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

use crate::db::init::DbPool;
use crate::db::models::ProxyRow;
use crate::db::operations::upsert_proxies;
use crate::types::models::ScrapedHolding;

/// One curated entry: the display name and holder type we publish for a
/// ticker instead of whatever the scraped page shows.
#[derive(Debug, Clone, Deserialize)]
pub struct CuratedTicker {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Allow-list of tickers permitted to be persisted from scraped data,
/// loaded from an external JSON file (ticker -> {name, type}).
#[derive(Debug, Clone, Default)]
pub struct CuratedList(HashMap<String, CuratedTicker>);

impl CuratedList {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read curated tickers file {}", path.display()))?;
        let map: HashMap<String, CuratedTicker> =
            serde_json::from_str(&raw).context("invalid curated tickers file")?;
        Ok(Self(
            map.into_iter().map(|(k, v)| (k.to_uppercase(), v)).collect(),
        ))
    }

    pub fn get(&self, ticker: &str) -> Option<&CuratedTicker> {
        self.0.get(ticker.to_uppercase().as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse the fixed treasuries table: name, country flag, ticker, filing
/// link, BTC holdings, USD value, percent-of-float. Rows that are short or
/// fail numeric parsing are skipped.
pub fn parse_treasury_table(html: &str) -> Vec<ScrapedHolding> {
    let doc = Html::parse_document(html);
    let row_sel = Selector::parse("table tbody tr").expect("valid selector");
    let cell_sel = Selector::parse("td").expect("valid selector");
    let link_sel = Selector::parse("a").expect("valid selector");
    let titled_sel = Selector::parse("[title]").expect("valid selector");

    let mut holdings = Vec::new();
    for row in doc.select(&row_sel) {
        let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
        if cells.len() < 7 {
            continue;
        }

        let ticker = cell_text(&cells[2]).to_uppercase();
        if ticker.is_empty() {
            continue;
        }

        let (btc, usd) = match (
            parse_number(&cell_text(&cells[4])),
            parse_number(&cell_text(&cells[5])),
        ) {
            (Some(btc), Some(usd)) => (btc, usd),
            _ => continue,
        };

        let country = cells[1]
            .select(&titled_sel)
            .next()
            .and_then(|el| el.value().attr("title"))
            .map(str::to_string);
        let country_flag = Some(cell_text(&cells[1])).filter(|s| !s.is_empty());
        let filing_link = cells[3]
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string);

        holdings.push(ScrapedHolding {
            ticker,
            country,
            country_flag,
            filing_link,
            btc,
            usd,
            pct_21m: parse_number(&cell_text(&cells[6])),
        });
    }
    holdings
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Parse a display number ("$1,234.56", "2.76%", "48,237"); None for
/// empty or placeholder cells.
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse().ok()
}

/// Keep only allow-listed tickers and attach their curated name/type. The
/// implied BTC price is usd/btc for non-zero holdings.
pub fn filter_curated(
    scraped: Vec<ScrapedHolding>,
    curated: &CuratedList,
    last_updated: &str,
) -> Vec<ProxyRow> {
    scraped
        .into_iter()
        .filter_map(|h| {
            let entry = curated.get(&h.ticker)?;
            Some(ProxyRow {
                ticker: h.ticker,
                name: entry.name.clone(),
                kind: entry.kind.clone(),
                btc: h.btc,
                usd: h.usd,
                price: if h.btc > 0.0 { h.usd / h.btc } else { 0.0 },
                country: h.country,
                country_flag: h.country_flag,
                pct_21m: h.pct_21m,
                filing_link: h.filing_link,
                last_updated: last_updated.to_string(),
            })
        })
        .collect()
}

/// Scrape the treasuries page and upsert the curated rows. Tickers absent
/// from this scrape are left stale in storage.
pub async fn update_proxies(
    http: &reqwest::Client,
    url: &str,
    curated: &CuratedList,
    pool: &DbPool,
) -> Result<()> {
    if curated.is_empty() {
        tracing::warn!("Curated ticker list is empty, skipping treasuries scrape");
        return Ok(());
    }

    let body = http
        .get(url)
        .send()
        .await
        .context("treasuries page request failed")?
        .error_for_status()
        .context("treasuries page returned an error status")?
        .text()
        .await
        .context("failed to read treasuries page body")?;

    let scraped = parse_treasury_table(&body);
    let now = Utc::now().to_rfc3339();
    let rows = filter_curated(scraped, curated, &now);
    if rows.is_empty() {
        tracing::warn!("Treasuries scrape matched no curated tickers");
        return Ok(());
    }

    let conn = pool.get()?;
    upsert_proxies(&conn, &rows)?;
    tracing::info!("Stored {} proxy holdings", rows.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
    <html><body>
    <table>
      <thead><tr><th>Name</th><th></th><th>Ticker</th><th>Filing</th><th>BTC</th><th>USD</th><th>% of 21m</th></tr></thead>
      <tbody>
        <tr>
          <td>Strategy</td>
          <td><span title="United States">&#127482;&#127480;</span></td>
          <td>MSTR</td>
          <td><a href="https://example.com/mstr-filing">Filing</a></td>
          <td>580,250</td>
          <td>$58,025,000,000</td>
          <td>2.763%</td>
        </tr>
        <tr>
          <td>Marathon Digital</td>
          <td><span title="United States">&#127482;&#127480;</span></td>
          <td>MARA</td>
          <td><a href="https://example.com/mara-filing">Filing</a></td>
          <td>48,237</td>
          <td>$4,823,700,000</td>
          <td>0.230%</td>
        </tr>
        <tr>
          <td>Shady Shell Co</td>
          <td><span title="Nowhere">??</span></td>
          <td>SHDY</td>
          <td></td>
          <td>1,000</td>
          <td>$100,000,000</td>
          <td>0.005%</td>
        </tr>
        <tr><td>Short row</td><td>XX</td><td>123</td></tr>
        <tr>
          <td>No numbers</td>
          <td></td>
          <td>NONUM</td>
          <td></td>
          <td>&mdash;</td>
          <td>&mdash;</td>
          <td></td>
        </tr>
      </tbody>
    </table>
    </body></html>
    "#;

    fn curated() -> CuratedList {
        let raw = r#"{
            "MSTR": {"name": "Strategy", "type": "public"},
            "MARA": {"name": "Marathon Digital Holdings", "type": "miner"}
        }"#;
        let map: HashMap<String, CuratedTicker> = serde_json::from_str(raw).unwrap();
        CuratedList(map)
    }

    #[test]
    fn parses_well_formed_rows_and_skips_malformed_ones() {
        let scraped = parse_treasury_table(FIXTURE);
        let tickers: Vec<&str> = scraped.iter().map(|h| h.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["MSTR", "MARA", "SHDY"]);

        let mstr = &scraped[0];
        assert_eq!(mstr.btc, 580_250.0);
        assert_eq!(mstr.usd, 58_025_000_000.0);
        assert_eq!(mstr.pct_21m, Some(2.763));
        assert_eq!(mstr.country.as_deref(), Some("United States"));
        assert_eq!(
            mstr.filing_link.as_deref(),
            Some("https://example.com/mstr-filing")
        );
    }

    #[test]
    fn allow_list_gates_which_rows_are_persisted() {
        let rows = filter_curated(parse_treasury_table(FIXTURE), &curated(), "t0");
        let tickers: Vec<&str> = rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["MSTR", "MARA"]);
        // curated metadata wins over the scraped name
        assert_eq!(rows[1].name, "Marathon Digital Holdings");
        assert_eq!(rows[1].kind, "miner");
        assert_eq!(rows[1].last_updated, "t0");
    }

    #[test]
    fn implied_price_is_usd_over_btc() {
        let rows = filter_curated(parse_treasury_table(FIXTURE), &curated(), "t0");
        let mstr = &rows[0];
        assert!((mstr.price - 100_000.0).abs() < 1e-6);
    }

    #[test]
    fn parse_number_handles_display_formats() {
        assert_eq!(parse_number("$1,234.56"), Some(1234.56));
        assert_eq!(parse_number("2.76%"), Some(2.76));
        assert_eq!(parse_number("48,237"), Some(48237.0));
        assert_eq!(parse_number("-1.5%"), Some(-1.5));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("\u{2014}"), None);
    }

    #[test]
    fn curated_lookup_is_case_insensitive() {
        let list = curated();
        assert!(list.get("mstr").is_some());
        assert!(list.get("MSTR").is_some());
        assert!(list.get("TSLA").is_none());
    }
}
