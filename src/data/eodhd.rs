//! EODHD end-of-day price API.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::data::FetchError;
use crate::domain::Exchange;

const BASE_URL: &str = "https://eodhistoricaldata.com/api/eod";
const PROVIDER: &str = "EODHD";
const TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable holding the API token.
pub const API_KEY_VAR: &str = "EODHD_API_KEY";

/// Placeholder values shipped in templates; treated as "no key".
const PLACEHOLDER_KEYS: [&str; 1] = ["YOUR_API_KEY_HERE"];

pub struct EodhdClient {
    client: Client,
    api_key: String,
}

impl EodhdClient {
    /// Build a client from `EODHD_API_KEY` (a `.env` file is honored).
    ///
    /// Returns `None` when the key is missing, empty or a template placeholder.
    pub fn from_env() -> Option<Self> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var(API_KEY_VAR).ok()?;
        if !is_usable_key(&api_key) {
            debug!("ignoring placeholder EODHD API key");
            return None;
        }
        Self::new(api_key).ok()
    }

    pub fn new(api_key: String) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self { client, api_key })
    }

    /// Daily `(date, adjusted_close)` pairs from `start` onwards.
    pub fn fetch_prices(
        &self,
        ticker: &str,
        exchange: Exchange,
        start: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, FetchError> {
        let symbol = eodhd_symbol(ticker, exchange);
        let url = format!("{BASE_URL}/{symbol}");
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("api_token", self.api_key.as_str()),
                ("from", &start.to_string()),
                ("fmt", "json"),
                ("period", "d"),
            ])
            .send()?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                provider: PROVIDER,
                status: resp.status().as_u16(),
            });
        }

        let rows: Vec<EodRow> = resp.json().map_err(|e| FetchError::Parse {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        let out = parse_rows(rows)?;
        if out.is_empty() {
            return Err(FetchError::Empty {
                provider: PROVIDER,
                symbol,
            });
        }
        info!(%symbol, rows = out.len(), "fetched EODHD prices");
        Ok(out)
    }
}

#[derive(Debug, Deserialize)]
struct EodRow {
    date: String,
    adjusted_close: Option<f64>,
    close: Option<f64>,
}

fn parse_rows(rows: Vec<EodRow>) -> Result<Vec<(NaiveDate, f64)>, FetchError> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(price) = row.adjusted_close.or(row.close).filter(|p| p.is_finite() && *p > 0.0) else {
            continue;
        };
        let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|e| FetchError::Parse {
            provider: PROVIDER,
            message: format!("invalid date '{}': {e}", row.date),
        })?;
        out.push((date, price));
    }
    Ok(out)
}

/// `spy` + `US` → `SPY.US`.
pub fn eodhd_symbol(ticker: &str, exchange: Exchange) -> String {
    format!("{}.{}", ticker.trim().to_uppercase(), exchange.code())
}

fn is_usable_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && !PLACEHOLDER_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_includes_exchange() {
        assert_eq!(eodhd_symbol("spy", Exchange::Us), "SPY.US");
        assert_eq!(eodhd_symbol("eth-usd", Exchange::Cc), "ETH-USD.CC");
        assert_eq!(eodhd_symbol(" eurusd ", Exchange::Forex), "EURUSD.FOREX");
    }

    #[test]
    fn placeholder_keys_are_rejected() {
        assert!(!is_usable_key(""));
        assert!(!is_usable_key("  "));
        assert!(!is_usable_key("YOUR_API_KEY_HERE"));
        assert!(is_usable_key("abc123.demo"));
    }

    #[test]
    fn parse_rows_prefers_adjusted_close() {
        let body = r#"[
            {"date":"2024-01-02","open":1.0,"close":10.0,"adjusted_close":9.5,"volume":100},
            {"date":"2024-01-03","close":11.0,"adjusted_close":null},
            {"date":"2024-01-04","close":null,"adjusted_close":null}
        ]"#;
        let rows: Vec<EodRow> = serde_json::from_str(body).unwrap();
        let out = parse_rows(rows).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].1, 9.5);
        assert_eq!(out[1].1, 11.0);
    }

    #[test]
    fn parse_rows_rejects_bad_dates() {
        let rows: Vec<EodRow> =
            serde_json::from_str(r#"[{"date":"02/01/2024","adjusted_close":1.0}]"#).unwrap();
        assert!(matches!(parse_rows(rows), Err(FetchError::Parse { .. })));
    }

    #[test]
    fn parse_rows_drops_non_positive_prices() {
        let body = r#"[
            {"date":"2024-01-02","adjusted_close":9.5},
            {"date":"2024-01-03","adjusted_close":0.0},
            {"date":"2024-01-04","adjusted_close":-1.0},
            {"date":"2024-01-05","adjusted_close":9.7}
        ]"#;
        let rows: Vec<EodRow> = serde_json::from_str(body).unwrap();
        let out = parse_rows(rows).unwrap();
        assert_eq!(out.iter().map(|p| p.1).collect::<Vec<_>>(), vec![9.5, 9.7]);
    }
}
