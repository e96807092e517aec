//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - handed to the analysis core fully materialized (no I/O inside the core)
//! - shared between the CLI and the TUI front-ends
//! - tested without any network access

use std::fmt;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Minimum number of observations for year-level comparisons.
pub const MIN_YEAR_OBSERVATIONS: usize = 20;

/// Minimum number of observations for quarter-level comparisons.
pub const MIN_QUARTER_OBSERVATIONS: usize = 15;

pub const DEFAULT_MIN_CORRELATION: f64 = 0.70;
pub const DEFAULT_TOP_N: usize = 5;

/// One daily observation with its derived return fields.
///
/// `daily_return` and `cumulative_return` are only ever produced by
/// [`PriceSeries::from_prices`], so they always agree with `adjusted_close`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    /// Dividend/split-adjusted close.
    pub adjusted_close: f64,
    /// `close[t] / close[t-1] - 1`; `None` for the first observation.
    pub daily_return: Option<f64>,
    /// Compounded return from the start of the series.
    pub cumulative_return: Option<f64>,
}

/// Date-indexed, ascending, adjusted-close price history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series from raw `(date, adjusted_close)` pairs.
    ///
    /// Input order does not matter. If a date appears more than once, the last
    /// price seen for it wins.
    pub fn from_prices(mut prices: Vec<(NaiveDate, f64)>) -> Self {
        // Stable sort keeps input order among equal dates, so "last wins" below
        // means "last in the input".
        prices.sort_by_key(|(d, _)| *d);

        let mut deduped: Vec<(NaiveDate, f64)> = Vec::with_capacity(prices.len());
        let mut duplicates = 0usize;
        for (date, price) in prices {
            match deduped.last_mut() {
                Some(last) if last.0 == date => {
                    last.1 = price;
                    duplicates += 1;
                }
                _ => deduped.push((date, price)),
            }
        }
        if duplicates > 0 {
            warn!(duplicates, "dropped duplicate price dates (kept last value)");
        }

        let mut bars = Vec::with_capacity(deduped.len());
        let mut growth = 1.0_f64;
        let mut prev: Option<f64> = None;
        for (date, price) in deduped {
            let daily_return = prev.and_then(|p| simple_return(p, price));
            let cumulative_return = daily_return.map(|r| {
                growth *= 1.0 + r;
                growth - 1.0
            });
            bars.push(PriceBar {
                date,
                adjusted_close: price,
                daily_return,
                cumulative_return,
            });
            prev = Some(price);
        }

        Self { bars }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// Distinct calendar years present in the series, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.bars.iter().map(|b| b.date.year()).collect();
        years.dedup();
        years
    }
}

fn simple_return(prev: f64, cur: f64) -> Option<f64> {
    if !(prev.is_finite() && cur.is_finite()) || prev <= 0.0 || cur <= 0.0 {
        return None;
    }
    Some(cur / prev - 1.0)
}

/// Calendar quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    /// `1..=4` → quarter; anything else → `None`.
    pub fn from_number(n: u32) -> Option<Self> {
        match n {
            1 => Some(Quarter::Q1),
            2 => Some(Quarter::Q2),
            3 => Some(Quarter::Q3),
            4 => Some(Quarter::Q4),
            _ => None,
        }
    }

    pub fn of_date(date: NaiveDate) -> Self {
        match date.month() {
            1..=3 => Quarter::Q1,
            4..=6 => Quarter::Q2,
            7..=9 => Quarter::Q3,
            _ => Quarter::Q4,
        }
    }

    pub fn number(self) -> u32 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 2,
            Quarter::Q3 => 3,
            Quarter::Q4 => 4,
        }
    }

    /// Calendar months (1-based) covered by the quarter.
    pub fn months(self) -> [u32; 3] {
        let first = (self.number() - 1) * 3 + 1;
        [first, first + 1, first + 2]
    }

    pub fn contains_month(self, month: u32) -> bool {
        self.months().contains(&month)
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

/// Identity of a comparable period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PeriodKey {
    Year(i32),
    Quarter { year: i32, quarter: Quarter },
}

impl PeriodKey {
    pub fn year(self) -> i32 {
        match self {
            PeriodKey::Year(y) => y,
            PeriodKey::Quarter { year, .. } => year,
        }
    }
}

/// Formats as `2024` or `2024-Q3`.
impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodKey::Year(y) => write!(f, "{y}"),
            PeriodKey::Quarter { year, quarter } => write!(f, "{year}-{quarter}"),
        }
    }
}

/// A calendar month/day used as the year-to-date cutoff.
///
/// Ordering is calendar order within a year, so `MonthDay { 2, 29 }` sorts
/// between Feb 28 and Mar 1 regardless of leap years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            day: date.day(),
        }
    }

    /// True if `date` falls on or before this month/day within its own year.
    pub fn includes(self, date: NaiveDate) -> bool {
        (date.month(), date.day()) <= (self.month, self.day)
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

/// Per-call analysis parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisParams {
    pub min_correlation: f64,
    pub top_n: usize,
    /// The "as-of" point: its month/day is the year-to-date cutoff.
    pub as_of: NaiveDate,
}

impl AnalysisParams {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            min_correlation: DEFAULT_MIN_CORRELATION,
            top_n: DEFAULT_TOP_N,
            as_of,
        }
    }

    pub fn cutoff(&self) -> MonthDay {
        MonthDay::of(self.as_of)
    }

    pub fn reference_quarter(&self) -> Quarter {
        Quarter::of_date(self.as_of)
    }
}

/// A ranked analog of the reference period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub period: PeriodKey,
    /// Pearson correlation of the two cumulative-return paths.
    pub correlation: f64,
    /// Return of the full calendar year/quarter, in percent.
    pub period_return_pct: Option<f64>,
    /// Return over the compared window (YTD at the cutoff for years, the
    /// ordinal quarter-to-date span for quarters), in percent.
    pub window_return_pct: Option<f64>,
}

/// Where price history comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// EODHD when an API key is configured, falling back to Yahoo.
    Auto,
    Eodhd,
    Yahoo,
    /// Local CSV file (`--csv`).
    Csv,
    /// Seeded random walk (offline demos).
    Synthetic,
}

/// Exchange code as used by EODHD symbols (`SPY.US`, `ETH-USD.CC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Us,
    /// Crypto.
    Cc,
    Forex,
}

impl Exchange {
    pub const ALL: [Exchange; 3] = [Exchange::Us, Exchange::Cc, Exchange::Forex];

    pub fn code(self) -> &'static str {
        match self {
            Exchange::Us => "US",
            Exchange::Cc => "CC",
            Exchange::Forex => "FOREX",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Exchange::Us => Exchange::Cc,
            Exchange::Cc => Exchange::Forex,
            Exchange::Forex => Exchange::Us,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Exchange::Us => Exchange::Forex,
            Exchange::Cc => Exchange::Us,
            Exchange::Forex => Exchange::Cc,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub ticker: String,
    pub exchange: Exchange,
    /// First date requested from the data provider.
    pub start_date: NaiveDate,
    pub source: DataSource,
    pub csv_path: Option<PathBuf>,
    /// Seed for `DataSource::Synthetic`.
    pub seed: u64,

    pub params: AnalysisParams,
    /// Override of the reference year (defaults to `params.as_of.year()`).
    pub reference_year: Option<i32>,
    /// Override of the reference quarter (defaults to the as-of quarter).
    pub reference_quarter: Option<Quarter>,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}

impl AnalysisConfig {
    pub fn reference_year(&self) -> i32 {
        self.reference_year.unwrap_or_else(|| self.params.as_of.year())
    }

    pub fn reference_quarter(&self) -> Quarter {
        self.reference_quarter
            .unwrap_or_else(|| self.params.reference_quarter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn derived_returns_follow_prices() {
        let series = PriceSeries::from_prices(vec![
            (d(2024, 1, 3), 110.0),
            (d(2024, 1, 2), 100.0),
            (d(2024, 1, 4), 99.0),
        ]);
        let bars = series.bars();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, d(2024, 1, 2));
        assert!(bars[0].daily_return.is_none());
        assert!(bars[0].cumulative_return.is_none());
        assert!((bars[1].daily_return.unwrap() - 0.10).abs() < 1e-12);
        assert!((bars[2].daily_return.unwrap() + 0.10).abs() < 1e-12);
        // 1.1 * 0.9 - 1
        assert!((bars[2].cumulative_return.unwrap() + 0.01).abs() < 1e-12);
    }

    #[test]
    fn duplicate_dates_keep_last_price() {
        let series = PriceSeries::from_prices(vec![
            (d(2024, 1, 2), 100.0),
            (d(2024, 1, 3), 50.0),
            (d(2024, 1, 3), 105.0),
        ]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[1].adjusted_close, 105.0);
    }

    #[test]
    fn non_positive_prices_leave_returns_undefined() {
        let series = PriceSeries::from_prices(vec![
            (d(2024, 1, 2), 100.0),
            (d(2024, 1, 3), 0.0),
            (d(2024, 1, 4), 10.0),
            (d(2024, 1, 5), 11.0),
            (d(2024, 1, 8), -5.0),
        ]);
        let bars = series.bars();
        assert!(bars[1].daily_return.is_none());
        assert!(bars[1].cumulative_return.is_none());
        assert!(bars[2].daily_return.is_none());
        assert!(bars[2].cumulative_return.is_none());
        // Growth resumes from where it stood before the zero.
        assert!((bars[3].daily_return.unwrap() - 0.10).abs() < 1e-12);
        assert!((bars[3].cumulative_return.unwrap() - 0.10).abs() < 1e-12);
        assert!(bars[4].daily_return.is_none());
        assert!(bars
            .iter()
            .filter_map(|b| b.cumulative_return)
            .all(|c| c > -1.0));
    }

    #[test]
    fn quarter_months_and_lookup() {
        assert_eq!(Quarter::Q3.months(), [7, 8, 9]);
        assert_eq!(Quarter::of_date(d(2024, 12, 31)), Quarter::Q4);
        assert!(Quarter::Q1.contains_month(3));
        assert!(!Quarter::Q1.contains_month(4));
        assert_eq!(Quarter::from_number(5), None);
        assert_eq!(Quarter::of_date(d(2024, 4, 1)), Quarter::Q2);
    }

    #[test]
    fn period_key_labels() {
        assert_eq!(PeriodKey::Year(2010).to_string(), "2010");
        let q = PeriodKey::Quarter {
            year: 2024,
            quarter: Quarter::Q3,
        };
        assert_eq!(q.to_string(), "2024-Q3");
    }

    #[test]
    fn month_day_cutoff_is_calendar_based() {
        let cutoff = MonthDay::of(d(2024, 3, 15));
        assert!(cutoff.includes(d(2011, 3, 15)));
        assert!(cutoff.includes(d(2011, 1, 31)));
        assert!(!cutoff.includes(d(2011, 3, 16)));
        assert!(!cutoff.includes(d(2011, 4, 1)));
    }

    #[test]
    fn years_are_distinct_and_sorted() {
        let series = PriceSeries::from_prices(vec![
            (d(2021, 6, 1), 1.0),
            (d(2020, 6, 1), 1.0),
            (d(2021, 6, 2), 1.0),
        ]);
        assert_eq!(series.years(), vec![2020, 2021]);
    }
}
