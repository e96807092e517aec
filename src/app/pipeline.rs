//! Shared "analysis pipeline" logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load prices -> year scan + quarter scan (in parallel) -> summaries -> overview
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use tracing::info;

use crate::analysis::{MatchSummary, find_similar_quarters, find_similar_years};
use crate::data::PriceLoader;
use crate::domain::{AnalysisConfig, PeriodKey, PriceSeries, Quarter, SimilarityResult};
use crate::error::AppError;
use crate::report::{ComparisonCurve, HistoryOverview, comparison_curves};

/// All computed outputs of a single analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub series: PriceSeries,
    pub reference_year: i32,
    pub reference_quarter: Quarter,
    pub years: Vec<SimilarityResult>,
    pub quarters: Vec<SimilarityResult>,
    pub year_summary: MatchSummary,
    pub quarter_summary: MatchSummary,
    /// `None` only for an empty series.
    pub overview: Option<HistoryOverview>,
}

impl AnalysisOutput {
    /// Overlay of the reference year-to-date and the matched years.
    pub fn year_curves(&self, config: &AnalysisConfig) -> Vec<ComparisonCurve> {
        comparison_curves(
            &self.series,
            PeriodKey::Year(self.reference_year),
            &self.years,
            Some(config.params.cutoff()),
        )
    }

    /// Overlay of the reference quarter and the matched quarters.
    pub fn quarter_curves(&self) -> Vec<ComparisonCurve> {
        comparison_curves(
            &self.series,
            PeriodKey::Quarter {
                year: self.reference_year,
                quarter: self.reference_quarter,
            },
            &self.quarters,
            None,
        )
    }
}

/// Load prices for `config` and run the analysis.
pub fn run_analysis(loader: &mut PriceLoader, config: &AnalysisConfig) -> Result<AnalysisOutput, AppError> {
    let series = loader.load(config)?;
    Ok(analyze_series(series, config))
}

/// Run both scans on an already loaded series.
///
/// The TUI uses this to re-rank after a settings change without re-fetching.
pub fn analyze_series(series: PriceSeries, config: &AnalysisConfig) -> AnalysisOutput {
    let reference_year = config.reference_year();
    let reference_quarter = config.reference_quarter();
    let params = config.params;

    let (years, quarters) = rayon::join(
        || find_similar_years(&series, reference_year, &params),
        || find_similar_quarters(&series, reference_year, reference_quarter, &params),
    );
    info!(
        years = years.len(),
        quarters = quarters.len(),
        reference = reference_year,
        "analysis complete"
    );

    AnalysisOutput {
        year_summary: MatchSummary::from_results(&years),
        quarter_summary: MatchSummary::from_results(&quarters),
        overview: HistoryOverview::from_series(&series, params.as_of),
        series,
        reference_year,
        reference_quarter,
        years,
        quarters,
    }
}
