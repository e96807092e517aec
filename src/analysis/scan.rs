//! Ranking scans: correlate a reference period against every other period.
//!
//! The year-level and quarter-level scans share one loop ([`scan`]) and differ
//! only in the [`PeriodStrategy`] they plug in: which periods exist, how a
//! period is extracted, and the minimum length for a comparison.

use std::cmp::Ordering;

use tracing::{debug, info};

use crate::analysis::correlate::{SkipReason, correlate, period_return_pct};
use crate::analysis::extract::{extract, extract_year};
use crate::domain::{
    AnalysisParams, MIN_QUARTER_OBSERVATIONS, MIN_YEAR_OBSERVATIONS, MonthDay, PeriodKey, PriceBar, PriceSeries,
    Quarter, SimilarityResult,
};

/// How periods are enumerated and extracted for one kind of scan.
pub trait PeriodStrategy {
    /// Minimum observations for a comparison to be defined.
    fn min_len(&self) -> usize;

    /// Every period of the series that may be compared, in scan order.
    fn candidates(&self, series: &PriceSeries) -> Vec<PeriodKey>;

    fn extract(&self, series: &PriceSeries, key: &PeriodKey) -> Vec<PriceBar>;
}

/// Whole years, each cut at the same calendar month/day.
#[derive(Debug, Clone, Copy)]
pub struct YearToDate {
    pub cutoff: MonthDay,
}

impl PeriodStrategy for YearToDate {
    fn min_len(&self) -> usize {
        MIN_YEAR_OBSERVATIONS
    }

    fn candidates(&self, series: &PriceSeries) -> Vec<PeriodKey> {
        series.years().into_iter().map(PeriodKey::Year).collect()
    }

    fn extract(&self, series: &PriceSeries, key: &PeriodKey) -> Vec<PriceBar> {
        extract(series, key, Some(self.cutoff))
    }
}

/// Calendar quarters, compared without a cutoff.
///
/// Every `(year, quarter)` in the series' year range is a candidate, including
/// quarters with no data (they are skipped as insufficient).
#[derive(Debug, Clone, Copy, Default)]
pub struct FullQuarter;

impl PeriodStrategy for FullQuarter {
    fn min_len(&self) -> usize {
        MIN_QUARTER_OBSERVATIONS
    }

    fn candidates(&self, series: &PriceSeries) -> Vec<PeriodKey> {
        let years = series.years();
        let (Some(&first), Some(&last)) = (years.first(), years.last()) else {
            return Vec::new();
        };
        (first..=last)
            .flat_map(|year| Quarter::ALL.into_iter().map(move |quarter| PeriodKey::Quarter { year, quarter }))
            .collect()
    }

    fn extract(&self, series: &PriceSeries, key: &PeriodKey) -> Vec<PriceBar> {
        extract(series, key, None)
    }
}

/// Raw result of a scan: ranked coefficients plus what was left out and why.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// `(period, coefficient)`, descending, at most `top_n` entries.
    pub ranked: Vec<(PeriodKey, f64)>,
    /// Candidates without a defined coefficient. If the reference itself is
    /// unusable this holds a single `(reference, EmptyReference)` entry.
    pub skipped: Vec<(PeriodKey, SkipReason)>,
    /// Candidates with a defined coefficient under the threshold.
    pub below_threshold: usize,
}

/// Correlate `reference` against every other candidate of `strategy`.
///
/// Candidates are kept when their coefficient is defined and at least
/// `min_correlation`. The sort is stable, so equal coefficients stay in scan
/// order. A failing candidate never aborts the scan.
pub fn scan<S: PeriodStrategy>(
    series: &PriceSeries,
    strategy: &S,
    reference: PeriodKey,
    min_correlation: f64,
    top_n: usize,
) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    if series.is_empty() {
        return outcome;
    }

    let reference_bars = strategy.extract(series, &reference);
    if reference_bars.len() < strategy.min_len() {
        debug!(
            %reference,
            len = reference_bars.len(),
            required = strategy.min_len(),
            "reference period too short"
        );
        outcome.skipped.push((reference, SkipReason::EmptyReference));
        return outcome;
    }

    for key in strategy.candidates(series) {
        if key == reference {
            continue;
        }
        let bars = strategy.extract(series, &key);
        match correlate(&reference_bars, &bars, strategy.min_len()) {
            Ok(r) if r >= min_correlation => outcome.ranked.push((key, r)),
            Ok(_) => outcome.below_threshold += 1,
            Err(reason) => {
                debug!(%reference, candidate = %key, %reason, "candidate skipped");
                outcome.skipped.push((key, reason));
            }
        }
    }

    outcome
        .ranked
        .sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    outcome.ranked.truncate(top_n);

    info!(
        %reference,
        matches = outcome.ranked.len(),
        below_threshold = outcome.below_threshold,
        skipped = outcome.skipped.len(),
        "scan finished"
    );
    outcome
}

/// Years whose year-to-date path most resembles `reference_year`'s.
///
/// Every year is cut at the month/day of `params.as_of`.
pub fn find_similar_years(series: &PriceSeries, reference_year: i32, params: &AnalysisParams) -> Vec<SimilarityResult> {
    let strategy = YearToDate {
        cutoff: params.cutoff(),
    };
    let outcome = scan(
        series,
        &strategy,
        PeriodKey::Year(reference_year),
        params.min_correlation,
        params.top_n,
    );

    outcome
        .ranked
        .into_iter()
        .map(|(key, correlation)| SimilarityResult {
            period: key,
            correlation,
            period_return_pct: period_return_pct(&extract_year(series, key.year(), None)),
            window_return_pct: period_return_pct(&strategy.extract(series, &key)),
        })
        .collect()
}

/// Quarters whose path most resembles the reference quarter's.
///
/// The window return of each match covers the same number of trading days as
/// the reference quarter has so far.
pub fn find_similar_quarters(
    series: &PriceSeries,
    reference_year: i32,
    reference_quarter: Quarter,
    params: &AnalysisParams,
) -> Vec<SimilarityResult> {
    let strategy = FullQuarter;
    let reference = PeriodKey::Quarter {
        year: reference_year,
        quarter: reference_quarter,
    };
    let outcome = scan(series, &strategy, reference, params.min_correlation, params.top_n);
    if outcome.ranked.is_empty() {
        return Vec::new();
    }

    let reference_len = strategy.extract(series, &reference).len();
    outcome
        .ranked
        .into_iter()
        .map(|(key, correlation)| {
            let bars = strategy.extract(series, &key);
            let window = &bars[..reference_len.min(bars.len())];
            SimilarityResult {
                period: key,
                correlation,
                period_return_pct: period_return_pct(&bars),
                window_return_pct: period_return_pct(window),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::{pattern_price, series_by_year, wave_price, weekdays};
    use crate::data::sample::generate_series;
    use chrono::{Datelike, NaiveDate};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn params(as_of: NaiveDate, min_correlation: f64, top_n: usize) -> AnalysisParams {
        AnalysisParams {
            min_correlation,
            top_n,
            as_of,
        }
    }

    fn replayed_series() -> PriceSeries {
        let years: Vec<(i32, Option<usize>)> = (2008..=2016).map(|y| (y, None)).collect();
        series_by_year(&years, |year, i| match year {
            2010 | 2015 => pattern_price(i),
            _ => wave_price(i),
        })
    }

    #[test]
    fn replayed_year_is_the_only_match() {
        let series = replayed_series();
        let p = params(d(2015, 12, 31), 0.9, 5);
        let results = find_similar_years(&series, 2015, &p);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].period, PeriodKey::Year(2010));
        assert!((results[0].correlation - 1.0).abs() < 1e-9);
        assert!(results[0].period_return_pct.unwrap() > 0.0);
        assert!(results[0].window_return_pct.is_some());
    }

    #[test]
    fn reference_never_matches_itself() {
        let series = replayed_series();
        let p = params(d(2015, 12, 31), -1.0, 100);
        let results = find_similar_years(&series, 2015, &p);
        assert!(results.iter().all(|r| r.period != PeriodKey::Year(2015)));
        // Every other year has a defined coefficient at threshold -1.
        assert_eq!(results.len(), 8);
    }

    #[test]
    fn short_reference_year_yields_nothing() {
        let years = [(2010, None), (2011, None), (2012, Some(10))];
        let series = series_by_year(&years, |_, i| pattern_price(i));
        let p = params(d(2012, 12, 31), 0.0, 5);
        assert!(find_similar_years(&series, 2012, &p).is_empty());

        let outcome = scan(
            &series,
            &YearToDate { cutoff: p.cutoff() },
            PeriodKey::Year(2012),
            0.0,
            5,
        );
        assert_eq!(outcome.skipped, vec![(PeriodKey::Year(2012), SkipReason::EmptyReference)]);
    }

    #[test]
    fn short_candidates_never_rank() {
        // 2011 has 12 trading days: below the 20-day minimum.
        let years = [(2010, None), (2011, Some(12)), (2012, None)];
        let series = series_by_year(&years, |_, i| pattern_price(i));
        for threshold in [-1.0, 0.0, 0.5, 0.99] {
            let p = params(d(2012, 12, 31), threshold, 10);
            let results = find_similar_years(&series, 2012, &p);
            assert!(results.iter().all(|r| r.period != PeriodKey::Year(2011)));
        }
    }

    #[test]
    fn year_minimum_is_twenty_observations() {
        let years = [
            (2009, None),
            (2010, Some(MIN_YEAR_OBSERVATIONS - 1)),
            (2011, Some(MIN_YEAR_OBSERVATIONS)),
            (2012, None),
        ];
        let series = series_by_year(&years, |_, i| pattern_price(i));
        let strategy = YearToDate {
            cutoff: MonthDay { month: 12, day: 31 },
        };
        let outcome = scan(&series, &strategy, PeriodKey::Year(2012), -1.0, 10);

        assert!(outcome.skipped.contains(&(
            PeriodKey::Year(2010),
            SkipReason::InsufficientData {
                len: MIN_YEAR_OBSERVATIONS - 1,
                required: MIN_YEAR_OBSERVATIONS,
            }
        )));
        let scored: Vec<PeriodKey> = outcome.ranked.iter().map(|(k, _)| *k).collect();
        assert!(scored.contains(&PeriodKey::Year(2011)));
        assert!(!scored.contains(&PeriodKey::Year(2010)));
    }

    #[test]
    fn quarter_minimum_is_fifteen_observations() {
        // 2020: a long Q1 reference, then Q2 one day short and Q3 exactly long enough.
        let segments = [
            (Quarter::Q1, 60),
            (Quarter::Q2, MIN_QUARTER_OBSERVATIONS - 1),
            (Quarter::Q3, MIN_QUARTER_OBSERVATIONS),
        ];
        let mut prices = Vec::new();
        for (quarter, n) in segments {
            let days = weekdays(2020, None)
                .into_iter()
                .filter(|day| quarter.contains_month(day.month()))
                .take(n);
            prices.extend(days.enumerate().map(|(i, day)| (day, pattern_price(i))));
        }
        let series = PriceSeries::from_prices(prices);
        let q = |quarter| PeriodKey::Quarter { year: 2020, quarter };
        let outcome = scan(&series, &FullQuarter, q(Quarter::Q1), -1.0, 10);

        assert_eq!(outcome.ranked.len(), 1);
        assert_eq!(outcome.ranked[0].0, q(Quarter::Q3));
        assert!(outcome.skipped.contains(&(
            q(Quarter::Q2),
            SkipReason::InsufficientData {
                len: MIN_QUARTER_OBSERVATIONS - 1,
                required: MIN_QUARTER_OBSERVATIONS,
            }
        )));
        assert!(outcome.skipped.contains(&(
            q(Quarter::Q4),
            SkipReason::InsufficientData {
                len: 0,
                required: MIN_QUARTER_OBSERVATIONS,
            }
        )));
    }

    #[test]
    fn flat_years_are_excluded_at_any_positive_threshold() {
        let years = [(2001, Some(30)), (2002, Some(30))];
        let series = series_by_year(&years, |year, _| if year == 2001 { 100.0 } else { 200.0 });
        let p = params(d(2002, 12, 31), 0.01, 5);
        assert!(find_similar_years(&series, 2002, &p).is_empty());

        let outcome = scan(&series, &YearToDate { cutoff: p.cutoff() }, PeriodKey::Year(2002), 0.01, 5);
        assert_eq!(outcome.skipped, vec![(PeriodKey::Year(2001), SkipReason::ZeroVariance)]);
    }

    #[test]
    fn empty_series_yields_nothing() {
        let series = PriceSeries::default();
        let p = params(d(2024, 6, 30), 0.7, 5);
        assert!(find_similar_years(&series, 2024, &p).is_empty());
        assert!(find_similar_quarters(&series, 2024, Quarter::Q2, &p).is_empty());
    }

    #[test]
    fn rankings_respect_threshold_order_and_top_n() {
        let series = generate_series(d(2006, 1, 1), d(2024, 8, 15), 7);
        for (threshold, top_n) in [(0.5, 3), (0.7, 5), (0.0, 10), (-1.0, 4)] {
            let p = params(d(2024, 8, 15), threshold, top_n);
            for results in [
                find_similar_years(&series, 2024, &p),
                find_similar_quarters(&series, 2024, Quarter::Q3, &p),
            ] {
                assert!(results.len() <= top_n);
                assert!(results.iter().all(|r| r.correlation >= threshold));
                assert!(results.windows(2).all(|w| w[0].correlation >= w[1].correlation));
            }
        }
    }

    #[test]
    fn quarter_scan_labels_are_distinct() {
        let series = generate_series(d(2006, 1, 1), d(2024, 12, 31), 11);
        let p = params(d(2024, 11, 20), 0.70, 5);
        let results = find_similar_quarters(&series, 2024, Quarter::Q4, &p);
        assert!(results.len() <= 5);
        let mut labels: Vec<String> = results.iter().map(|r| r.period.to_string()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), results.len());
        assert!(results.iter().all(|r| r.period.to_string() != "2024-Q4"));
    }

    #[test]
    fn replayed_quarter_is_found() {
        // Q1 of 2010 and 2015 share the same moves; everything else oscillates.
        let years: Vec<(i32, Option<usize>)> = (2009..=2016).map(|y| (y, None)).collect();
        let series = series_by_year(&years, |year, i| match (year, i < 60) {
            (2010 | 2015, true) => pattern_price(i),
            (2010 | 2015, false) => pattern_price(59),
            _ => wave_price(i),
        });
        let p = params(d(2015, 12, 31), 0.95, 5);
        let results = find_similar_quarters(&series, 2015, Quarter::Q1, &p);
        assert_eq!(results.first().map(|r| r.period), Some(PeriodKey::Quarter { year: 2010, quarter: Quarter::Q1 }));
    }

    #[test]
    fn quarter_window_return_uses_reference_length() {
        let years = [(2020, None), (2021, Some(70))];
        let series = series_by_year(&years, |_, i| 100.0 + i as f64);
        let p = params(d(2021, 4, 9), -1.0, 10);
        // 2021-Q2 only has a handful of days: too short to be a reference.
        assert!(find_similar_quarters(&series, 2021, Quarter::Q2, &p).is_empty());

        let results = find_similar_quarters(&series, 2021, Quarter::Q1, &p);
        assert!(!results.is_empty());
        for r in &results {
            let full = r.period_return_pct.unwrap();
            let window = r.window_return_pct.unwrap();
            assert!(window <= full + 1e-9);
        }
    }

    #[test]
    fn equal_coefficients_keep_scan_order() {
        // Four identical years: every candidate correlates at exactly 1.0.
        let years: Vec<(i32, Option<usize>)> = [2011, 2012, 2013, 2014].iter().map(|&y| (y, Some(60))).collect();
        let series = series_by_year(&years, |_, i| pattern_price(i));
        let outcome = scan(
            &series,
            &YearToDate {
                cutoff: MonthDay { month: 12, day: 31 },
            },
            PeriodKey::Year(2014),
            0.5,
            10,
        );
        let order: Vec<i32> = outcome.ranked.iter().map(|(k, _)| k.year()).collect();
        // 2011 is the first year of the series and loses its first row, so its
        // path is shifted by one day; it still ranks, but below the exact copies.
        assert_eq!(&order[..2], &[2012, 2013]);
        assert_eq!(order.len(), 3);
    }
}
