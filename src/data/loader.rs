//! Provider selection, fallback and caching.
//!
//! The loader is the only place that knows where a `PriceSeries` comes from;
//! everything downstream only sees the materialized series.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::data::{EodhdClient, FetchError, YahooClient, generate_series};
use crate::domain::{AnalysisConfig, DataSource, Exchange, PriceSeries};
use crate::error::AppError;

/// How long a remote fetch stays fresh.
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source: DataSource,
    ticker: String,
    exchange: Exchange,
    start: NaiveDate,
}

/// Minimal time-bounded map.
#[derive(Debug)]
struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, (Instant, V)>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    fn get(&self, key: &K, now: Instant) -> Option<V> {
        self.entries
            .get(key)
            .filter(|(stored, _)| now.saturating_duration_since(*stored) < self.ttl)
            .map(|(_, v)| v.clone())
    }

    fn insert(&mut self, key: K, value: V, now: Instant) {
        self.entries.retain(|_, (stored, _)| now.saturating_duration_since(*stored) < self.ttl);
        self.entries.insert(key, (now, value));
    }
}

/// Loads price history for a run configuration.
pub struct PriceLoader {
    eodhd: Option<EodhdClient>,
    cache: TtlCache<CacheKey, PriceSeries>,
}

impl PriceLoader {
    pub fn from_env() -> Self {
        Self {
            eodhd: EodhdClient::from_env(),
            cache: TtlCache::new(CACHE_TTL),
        }
    }

    /// True when an EODHD key was found.
    pub fn has_eodhd_key(&self) -> bool {
        self.eodhd.is_some()
    }

    /// Load (or reuse a fresh cached copy of) the configured series.
    pub fn load(&mut self, config: &AnalysisConfig) -> Result<PriceSeries, AppError> {
        self.load_inner(config, false)
    }

    /// Load bypassing the cache.
    pub fn reload(&mut self, config: &AnalysisConfig) -> Result<PriceSeries, AppError> {
        self.load_inner(config, true)
    }

    fn load_inner(&mut self, config: &AnalysisConfig, force: bool) -> Result<PriceSeries, AppError> {
        let series = match config.source {
            DataSource::Csv => {
                let path = config
                    .csv_path
                    .as_ref()
                    .ok_or_else(|| AppError::usage("--source csv requires --csv <path>."))?;
                crate::io::ingest::load_price_csv(path)?.series
            }
            DataSource::Synthetic => generate_series(config.start_date, config.params.as_of, config.seed),
            DataSource::Auto | DataSource::Eodhd | DataSource::Yahoo => {
                let key = CacheKey {
                    source: config.source,
                    ticker: config.ticker.trim().to_uppercase(),
                    exchange: config.exchange,
                    start: config.start_date,
                };
                let now = Instant::now();
                if !force {
                    if let Some(hit) = self.cache.get(&key, now) {
                        info!(ticker = %key.ticker, "using cached prices");
                        return Ok(hit);
                    }
                }
                let prices = self.fetch_remote(config)?;
                let series = PriceSeries::from_prices(prices);
                self.cache.insert(key, series.clone(), now);
                series
            }
        };

        if series.is_empty() {
            return Err(AppError::no_data(format!(
                "No price data available for {}.",
                config.ticker
            )));
        }
        Ok(series)
    }

    fn fetch_remote(&self, config: &AnalysisConfig) -> Result<Vec<(NaiveDate, f64)>, AppError> {
        let (ticker, exchange, start) = (config.ticker.as_str(), config.exchange, config.start_date);
        match config.source {
            DataSource::Eodhd => {
                let client = self.eodhd.as_ref().ok_or_else(|| {
                    AppError::usage(format!("Missing {} in environment (.env).", crate::data::eodhd::API_KEY_VAR))
                })?;
                client.fetch_prices(ticker, exchange, start).map_err(AppError::from)
            }
            DataSource::Yahoo => fetch_yahoo(ticker, exchange, start),
            _ => {
                let mut eodhd_err = None;
                if let Some(client) = &self.eodhd {
                    match client.fetch_prices(ticker, exchange, start) {
                        Ok(prices) => return Ok(prices),
                        Err(e) => {
                            warn!(error = %e, "EODHD unavailable, falling back to Yahoo Finance");
                            eodhd_err = Some(e);
                        }
                    }
                }
                fetch_yahoo(ticker, exchange, start).map_err(|e| with_fallback_cause(e, eodhd_err.as_ref()))
            }
        }
    }
}

fn fetch_yahoo(ticker: &str, exchange: Exchange, start: NaiveDate) -> Result<Vec<(NaiveDate, f64)>, AppError> {
    YahooClient::new()
        .and_then(|client| client.fetch_prices(ticker, exchange, start))
        .map_err(AppError::from)
}

/// Append the EODHD failure that triggered a fallback to the final error.
fn with_fallback_cause(err: AppError, eodhd: Option<&FetchError>) -> AppError {
    match eodhd {
        Some(cause) => AppError::new(err.exit_code(), format!("{} (EODHD: {cause})", err.message())),
        None => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AnalysisParams;

    fn config(source: DataSource) -> AnalysisConfig {
        AnalysisConfig {
            ticker: "SPY".to_string(),
            exchange: Exchange::Us,
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            source,
            csv_path: None,
            seed: 3,
            params: AnalysisParams::new(NaiveDate::from_ymd_opt(2021, 6, 30).unwrap()),
            reference_year: None,
            reference_quarter: None,
            plot: false,
            plot_width: 80,
            plot_height: 20,
        }
    }

    #[test]
    fn ttl_cache_expires() {
        let mut cache = TtlCache::new(Duration::from_secs(10));
        let t0 = Instant::now();
        cache.insert("a", 1, t0);
        assert_eq!(cache.get(&"a", t0 + Duration::from_secs(5)), Some(1));
        assert_eq!(cache.get(&"a", t0 + Duration::from_secs(10)), None);
        assert_eq!(cache.get(&"b", t0), None);
    }

    #[test]
    fn ttl_cache_evicts_stale_entries_on_insert() {
        let mut cache = TtlCache::new(Duration::from_secs(1));
        let t0 = Instant::now();
        cache.insert("old", 1, t0);
        cache.insert("new", 2, t0 + Duration::from_secs(5));
        assert_eq!(cache.entries.len(), 1);
    }

    #[test]
    fn synthetic_source_is_offline_and_bounded_by_as_of() {
        let mut loader = PriceLoader {
            eodhd: None,
            cache: TtlCache::new(CACHE_TTL),
        };
        let series = loader.load(&config(DataSource::Synthetic)).unwrap();
        assert!(!series.is_empty());
        assert!(series.last_date().unwrap() <= NaiveDate::from_ymd_opt(2021, 6, 30).unwrap());
    }

    #[test]
    fn csv_source_requires_path() {
        let mut loader = PriceLoader {
            eodhd: None,
            cache: TtlCache::new(CACHE_TTL),
        };
        let err = loader.load(&config(DataSource::Csv)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn eodhd_source_without_key_is_a_config_error() {
        let mut loader = PriceLoader {
            eodhd: None,
            cache: TtlCache::new(CACHE_TTL),
        };
        let err = loader.load(&config(DataSource::Eodhd)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn fallback_failure_keeps_the_eodhd_cause() {
        let yahoo = AppError::from(FetchError::Status {
            provider: "Yahoo Finance",
            status: 404,
        });
        let eodhd = FetchError::Status {
            provider: "EODHD",
            status: 401,
        };
        let err = with_fallback_cause(yahoo.clone(), Some(&eodhd));
        assert_eq!(err.exit_code(), yahoo.exit_code());
        assert!(err.message().starts_with(yahoo.message()));
        assert!(err.message().contains("401"), "{}", err.message());
        assert!(err.message().contains("EODHD"));

        let empty = AppError::from(FetchError::Empty {
            provider: "Yahoo Finance",
            symbol: "SPY".to_string(),
        });
        let err = with_fallback_cause(empty, Some(&eodhd));
        assert_eq!(err.exit_code(), crate::error::EXIT_NO_DATA);

        let err = with_fallback_cause(yahoo.clone(), None);
        assert_eq!(err.message(), yahoo.message());
    }
}
