//! Synthetic price history for offline runs and tests.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

use crate::domain::PriceSeries;

/// Daily drift of the log price (~7% a year over 252 days).
const DAILY_DRIFT: f64 = 0.00028;
/// Daily volatility of the log price (~18% a year).
const DAILY_VOL: f64 = 0.0115;
const START_PRICE: f64 = 100.0;

/// Seeded geometric random walk on weekdays in `start..=end`.
///
/// The same `(start, end, seed)` always yields the same series.
pub fn generate_series(start: NaiveDate, end: NaiveDate, seed: u64) -> PriceSeries {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut prices = Vec::new();
    let mut price = START_PRICE;
    let mut date = start;
    while date <= end {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            prices.push((date, price));
            let z: f64 = rng.sample(StandardNormal);
            price *= (DAILY_DRIFT + DAILY_VOL * z).exp();
        }
        let Some(next) = date.succ_opt() else {
            break;
        };
        date = next;
    }

    PriceSeries::from_prices(prices)
}
