//! Summary statistics over a ranking (what the dashboard shows under a table).

use crate::domain::SimilarityResult;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MatchSummary {
    pub count: usize,
    pub mean_correlation: Option<f64>,
    /// Mean full-period return over matches where it is defined.
    pub mean_return_pct: Option<f64>,
    /// Matches whose full-period return is strictly positive.
    pub positive_count: usize,
}

impl MatchSummary {
    pub fn from_results(results: &[SimilarityResult]) -> Self {
        let returns: Vec<f64> = results.iter().filter_map(|r| r.period_return_pct).collect();
        Self {
            count: results.len(),
            mean_correlation: mean(results.iter().map(|r| r.correlation)),
            mean_return_pct: mean(returns.iter().copied()),
            positive_count: returns.iter().filter(|&&r| r > 0.0).count(),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PeriodKey;

    fn result(year: i32, correlation: f64, ret: Option<f64>) -> SimilarityResult {
        SimilarityResult {
            period: PeriodKey::Year(year),
            correlation,
            period_return_pct: ret,
            window_return_pct: None,
        }
    }

    #[test]
    fn summary_basic() {
        let results = [
            result(2010, 0.9, Some(10.0)),
            result(2012, 0.8, Some(-4.0)),
            result(2013, 0.7, None),
        ];
        let s = MatchSummary::from_results(&results);
        assert_eq!(s.count, 3);
        assert!((s.mean_correlation.unwrap() - 0.8).abs() < 1e-12);
        assert!((s.mean_return_pct.unwrap() - 3.0).abs() < 1e-12);
        assert_eq!(s.positive_count, 1);
    }

    #[test]
    fn summary_empty() {
        let s = MatchSummary::from_results(&[]);
        assert_eq!(s, MatchSummary::default());
    }
}
