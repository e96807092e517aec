//! Yahoo Finance chart API (free fallback provider).

use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::info;

use crate::data::FetchError;
use crate::domain::Exchange;

const CHART_API_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const PROVIDER: &str = "Yahoo Finance";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";
const TIMEOUT: Duration = Duration::from_secs(30);

pub struct YahooClient {
    client: Client,
}

impl YahooClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder().user_agent(USER_AGENT).timeout(TIMEOUT).build()?;
        Ok(Self { client })
    }

    /// Daily `(date, adjusted_close)` pairs from `start` up to now.
    ///
    /// Falls back to the raw close when Yahoo omits adjusted closes.
    pub fn fetch_prices(
        &self,
        ticker: &str,
        exchange: Exchange,
        start: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, FetchError> {
        let symbol = yahoo_symbol(ticker, exchange);
        let period1 = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| Utc.from_utc_datetime(&dt).timestamp())
            .unwrap_or(0);
        let period2 = Utc::now().timestamp();

        let resp = self
            .client
            .get(format!("{CHART_API_URL}/{symbol}"))
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .send()?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                provider: PROVIDER,
                status: resp.status().as_u16(),
            });
        }

        let body: ChartResponse = resp.json().map_err(|e| FetchError::Parse {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        let out = parse_chart(body)?;
        if out.is_empty() {
            return Err(FetchError::Empty {
                provider: PROVIDER,
                symbol,
            });
        }
        info!(%symbol, rows = out.len(), "fetched Yahoo prices");
        Ok(out)
    }
}

/// Map a ticker to Yahoo's symbol convention.
///
/// Crypto tickers are used as-is (`eth-usd` → `ETH-USD`); other tickers drop
/// exchange suffixes (`spy.us` → `SPY`).
pub fn yahoo_symbol(ticker: &str, exchange: Exchange) -> String {
    let upper = ticker.trim().to_uppercase();
    match exchange {
        Exchange::Cc => upper,
        Exchange::Us | Exchange::Forex => upper.replace(".US", "").replace(".EU", ""),
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    adjclose: Vec<Option<f64>>,
}

fn parse_chart(body: ChartResponse) -> Result<Vec<(NaiveDate, f64)>, FetchError> {
    if let Some(err) = body.chart.error {
        return Err(FetchError::Parse {
            provider: PROVIDER,
            message: err.description.unwrap_or_else(|| "unknown chart error".to_string()),
        });
    }

    let Some(result) = body.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let timestamps = result.timestamp.unwrap_or_default();

    let adjusted = result
        .indicators
        .adjclose
        .and_then(|a| a.into_iter().next())
        .map(|a| a.adjclose)
        .filter(|a| a.len() == timestamps.len());
    let prices = match adjusted {
        Some(a) => a,
        None => result
            .indicators
            .quote
            .into_iter()
            .next()
            .and_then(|q| q.close)
            .unwrap_or_default(),
    };

    let out = timestamps
        .iter()
        .zip(prices)
        .filter_map(|(&ts, price)| {
            let date = Utc.timestamp_opt(ts, 0).single()?.date_naive();
            let price = price.filter(|p| p.is_finite() && *p > 0.0)?;
            Some((date, price))
        })
        .collect();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_normalization() {
        assert_eq!(yahoo_symbol("eth-usd", Exchange::Cc), "ETH-USD");
        assert_eq!(yahoo_symbol("spy.us", Exchange::Us), "SPY");
        assert_eq!(yahoo_symbol("sx5e.eu", Exchange::Us), "SX5E");
        assert_eq!(yahoo_symbol("QQQ", Exchange::Us), "QQQ");
    }

    #[test]
    fn parse_chart_uses_adjusted_close() {
        let body = r#"{"chart":{"result":[{
            "timestamp":[1704205800,1704292200,1704378600],
            "indicators":{
                "quote":[{"close":[10.0,11.0,12.0]}],
                "adjclose":[{"adjclose":[9.0,null,11.0]}]
            }}],"error":null}}"#;
        let parsed: ChartResponse = serde_json::from_str(body).unwrap();
        let out = parse_chart(parsed).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], (NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 9.0));
        assert_eq!(out[1].1, 11.0);
    }

    #[test]
    fn parse_chart_falls_back_to_close() {
        let body = r#"{"chart":{"result":[{
            "timestamp":[1704205800,1704292200],
            "indicators":{"quote":[{"close":[10.0,11.0]}]}}],"error":null}}"#;
        let parsed: ChartResponse = serde_json::from_str(body).unwrap();
        let out = parse_chart(parsed).unwrap();
        assert_eq!(out.iter().map(|p| p.1).collect::<Vec<_>>(), vec![10.0, 11.0]);
    }

    #[test]
    fn parse_chart_drops_non_positive_prices() {
        let body = r#"{"chart":{"result":[{
            "timestamp":[1704205800,1704292200,1704378600],
            "indicators":{"quote":[{"close":[10.0,0.0,12.0]}]}}],"error":null}}"#;
        let parsed: ChartResponse = serde_json::from_str(body).unwrap();
        let out = parse_chart(parsed).unwrap();
        assert_eq!(out.iter().map(|p| p.1).collect::<Vec<_>>(), vec![10.0, 12.0]);
    }

    #[test]
    fn parse_chart_reports_api_errors() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        let parsed: ChartResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(parse_chart(parsed), Err(FetchError::Parse { .. })));
    }
}
