//! Price-history acquisition.
//!
//! - EODHD end-of-day API (`eodhd`)
//! - Yahoo Finance chart API (`yahoo`)
//! - provider selection, fallback and a time-bounded cache (`loader`)
//! - seeded synthetic series for offline runs and tests (`sample`)

use thiserror::Error;

pub mod eodhd;
pub mod loader;
pub mod sample;
pub mod yahoo;

pub use eodhd::EodhdClient;
pub use loader::PriceLoader;
pub use sample::generate_series;
pub use yahoo::YahooClient;

/// Failure inside a single provider.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status} from {provider}")]
    Status { provider: &'static str, status: u16 },
    #[error("invalid response from {provider}: {message}")]
    Parse { provider: &'static str, message: String },
    #[error("{provider} returned no observations for {symbol}")]
    Empty { provider: &'static str, symbol: String },
}
