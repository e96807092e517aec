//! Reporting utilities: chart inputs, history overview, and formatted terminal
//! output (`format`).

use chrono::{Datelike, NaiveDate};

use crate::analysis::{cumulative_path, extract, period_return_pct};
use crate::domain::{MonthDay, PeriodKey, PriceSeries, SimilarityResult};

pub mod format;

pub use format::*;

/// Number of most recent bars listed in the history overview.
pub const RECENT_BARS: usize = 10;

/// One line of the comparison chart: cumulative return (%) by trading day.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonCurve {
    pub label: String,
    pub is_reference: bool,
    /// `(ordinal trading day, cumulative return in %)`.
    pub points: Vec<(f64, f64)>,
}

/// Build the overlay: the reference period up to `cutoff`, then every match
/// over its full period (so the chart shows what happened afterwards).
pub fn comparison_curves(
    series: &PriceSeries,
    reference: PeriodKey,
    results: &[SimilarityResult],
    cutoff: Option<MonthDay>,
) -> Vec<ComparisonCurve> {
    let mut out = Vec::with_capacity(results.len() + 1);
    out.push(ComparisonCurve {
        label: format!("{reference} (reference)"),
        is_reference: true,
        points: curve_points(series, &reference, cutoff),
    });
    for r in results {
        out.push(ComparisonCurve {
            label: format!("{} (r={:.2})", r.period, r.correlation),
            is_reference: false,
            points: curve_points(series, &r.period, None),
        });
    }
    out
}

fn curve_points(series: &PriceSeries, key: &PeriodKey, cutoff: Option<MonthDay>) -> Vec<(f64, f64)> {
    let bars = extract(series, key, cutoff);
    cumulative_path(&bars)
        .into_iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i as f64, v * 100.0)))
        .collect()
}

/// A recent bar as shown in the history table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecentBar {
    pub date: NaiveDate,
    pub adjusted_close: f64,
    pub daily_return_pct: Option<f64>,
}

/// Overview of the loaded history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryOverview {
    pub first_year: i32,
    pub last_year: i32,
    pub trading_days: usize,
    pub last_price: f64,
    pub ytd_year: i32,
    /// Return of `ytd_year` so far; `None` when the year has no data.
    pub ytd_return_pct: Option<f64>,
    pub recent: Vec<RecentBar>,
}

impl HistoryOverview {
    /// `None` for an empty series.
    pub fn from_series(series: &PriceSeries, as_of: NaiveDate) -> Option<Self> {
        let first = series.first_date()?;
        let last = series.last()?;
        let ytd_year = as_of.year();
        let ytd_bars: Vec<_> = series
            .bars()
            .iter()
            .filter(|b| b.date.year() == ytd_year && b.date <= as_of)
            .copied()
            .collect();

        let recent = series
            .bars()
            .iter()
            .rev()
            .take(RECENT_BARS)
            .rev()
            .map(|b| RecentBar {
                date: b.date,
                adjusted_close: b.adjusted_close,
                daily_return_pct: b.daily_return.map(|r| r * 100.0),
            })
            .collect();

        Some(Self {
            first_year: first.year(),
            last_year: last.date.year(),
            trading_days: series.len(),
            last_price: last.adjusted_close,
            ytd_year,
            ytd_return_pct: period_return_pct(&ytd_bars),
            recent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::series_by_year;
    use crate::domain::Quarter;

    #[test]
    fn curves_start_at_zero_and_reference_respects_cutoff() {
        let series = series_by_year(&[(2020, None), (2021, None)], |_, i| 100.0 + i as f64);
        let results = [SimilarityResult {
            period: PeriodKey::Year(2020),
            correlation: 0.95,
            period_return_pct: None,
            window_return_pct: None,
        }];
        let cutoff = Some(MonthDay { month: 3, day: 31 });
        let curves = comparison_curves(&series, PeriodKey::Year(2021), &results, cutoff);

        assert_eq!(curves.len(), 2);
        assert!(curves[0].is_reference);
        assert_eq!(curves[0].label, "2021 (reference)");
        assert_eq!(curves[1].label, "2020 (r=0.95)");
        assert_eq!(curves[0].points[0], (0.0, 0.0));
        assert_eq!(curves[1].points[0], (0.0, 0.0));
        // Reference stops at the cutoff; the match runs the whole year.
        assert!(curves[0].points.len() < 70);
        assert!(curves[1].points.len() > 250);
    }

    #[test]
    fn quarter_curves_use_quarter_extracts() {
        let series = series_by_year(&[(2020, None)], |_, i| 100.0 + i as f64);
        let key = PeriodKey::Quarter {
            year: 2020,
            quarter: Quarter::Q2,
        };
        let curves = comparison_curves(&series, key, &[], None);
        assert_eq!(curves.len(), 1);
        assert!(curves[0].points.len() > 60 && curves[0].points.len() < 70);
    }

    #[test]
    fn history_overview_basic() {
        let series = series_by_year(&[(2022, None), (2023, Some(30))], |y, i| {
            if y == 2022 { 100.0 } else { 100.0 + i as f64 }
        });
        let as_of = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let overview = HistoryOverview::from_series(&series, as_of).unwrap();
        assert_eq!((overview.first_year, overview.last_year), (2022, 2023));
        assert_eq!(overview.trading_days, 260 + 30);
        assert_eq!(overview.last_price, 129.0);
        assert!((overview.ytd_return_pct.unwrap() - 29.0).abs() < 1e-9);
        assert_eq!(overview.recent.len(), RECENT_BARS);
        assert_eq!(overview.recent.last().unwrap().adjusted_close, 129.0);
    }

    #[test]
    fn history_overview_without_current_year() {
        let series = series_by_year(&[(2022, Some(5))], |_, _| 50.0);
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let overview = HistoryOverview::from_series(&series, as_of).unwrap();
        assert!(overview.ytd_return_pct.is_none());
        assert_eq!(overview.recent.len(), 5);
        assert!(HistoryOverview::from_series(&PriceSeries::default(), as_of).is_none());
    }
}
