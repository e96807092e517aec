//! Period extraction.
//!
//! A period is selected by calendar membership only: no interpolation and no
//! gap filling. Two extracts are later aligned by ordinal position (1st
//! trading day vs 1st trading day), not by date.

use chrono::Datelike;

use crate::domain::{MonthDay, PeriodKey, PriceBar, PriceSeries, Quarter};

/// Observations of `year`, optionally stopping at the `cutoff` month/day.
///
/// The cutoff is calendar-relative: every year stops at the same month/day,
/// which keeps year-to-date comparisons fair across years.
pub fn extract_year(series: &PriceSeries, year: i32, cutoff: Option<MonthDay>) -> Vec<PriceBar> {
    series
        .bars()
        .iter()
        .filter(|b| b.daily_return.is_some())
        .filter(|b| b.date.year() == year)
        .filter(|b| cutoff.is_none_or(|c| c.includes(b.date)))
        .copied()
        .collect()
}

/// Observations of quarter `quarter` (1..=4) of `year`.
///
/// An in-progress quarter is naturally truncated: there are no future rows.
/// An invalid quarter number yields an empty extract.
pub fn extract_quarter(series: &PriceSeries, year: i32, quarter: u32) -> Vec<PriceBar> {
    match Quarter::from_number(quarter) {
        Some(q) => quarter_bars(series, year, q),
        None => Vec::new(),
    }
}

/// Dispatch on a period key. The cutoff only applies to whole-year keys.
pub fn extract(series: &PriceSeries, key: &PeriodKey, cutoff: Option<MonthDay>) -> Vec<PriceBar> {
    match *key {
        PeriodKey::Year(year) => extract_year(series, year, cutoff),
        PeriodKey::Quarter { year, quarter } => quarter_bars(series, year, quarter),
    }
}

fn quarter_bars(series: &PriceSeries, year: i32, quarter: Quarter) -> Vec<PriceBar> {
    series
        .bars()
        .iter()
        .filter(|b| b.daily_return.is_some())
        .filter(|b| b.date.year() == year && quarter.contains_month(b.date.month()))
        .copied()
        .collect()
}
