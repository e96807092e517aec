//! Formatted terminal output: match tables, summaries and the history overview.
//!
//! Formatting lives in one place so:
//! - the analysis code stays free of presentation concerns
//! - output changes are localized (important for future snapshot tests)

use crate::analysis::MatchSummary;
use crate::domain::{AnalysisConfig, PeriodKey, SimilarityResult};
use crate::report::HistoryOverview;

/// Which kind of ranking a table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Years,
    Quarters,
}

impl MatchKind {
    fn noun(self) -> &'static str {
        match self {
            MatchKind::Years => "years",
            MatchKind::Quarters => "quarters",
        }
    }
}

/// Run header: instrument, reference periods and parameters.
pub fn format_run_header(config: &AnalysisConfig, n_days: usize) -> String {
    let mut out = String::new();
    out.push_str("=== analogs - Historical Pattern Matching ===\n");
    out.push_str(&format!(
        "Ticker: {} ({}) | source: {} | days: {n_days}\n",
        config.ticker.to_uppercase(),
        config.exchange.code(),
        format!("{:?}", config.source).to_lowercase(),
    ));
    out.push_str(&format!(
        "As-of: {} | reference: {} / {} | min corr: {:.2} | top: {}\n",
        config.params.as_of,
        PeriodKey::Year(config.reference_year()),
        PeriodKey::Quarter {
            year: config.reference_year(),
            quarter: config.reference_quarter(),
        },
        config.params.min_correlation,
        config.params.top_n,
    ));
    out
}

/// Year-match table followed by the summary line.
pub fn format_year_matches(results: &[SimilarityResult], min_correlation: f64) -> String {
    if results.is_empty() {
        return no_matches(MatchKind::Years, min_correlation);
    }

    let mut out = String::new();
    out.push_str(&header_row(&["year", "corr", "year return", "ytd at point"]));
    for r in results {
        out.push_str(&row(&[
            r.period.to_string(),
            format!("{:.3}", r.correlation),
            fmt_pct(r.period_return_pct),
            fmt_pct(r.window_return_pct),
        ]));
    }
    out.push_str(&format_summary(&MatchSummary::from_results(results), MatchKind::Years));
    out
}

/// Quarter-match table followed by the summary line.
pub fn format_quarter_matches(results: &[SimilarityResult], min_correlation: f64) -> String {
    if results.is_empty() {
        return no_matches(MatchKind::Quarters, min_correlation);
    }

    let mut out = String::new();
    out.push_str(&header_row(&["quarter", "corr", "qtr return", "qtd at point"]));
    for r in results {
        out.push_str(&row(&[
            r.period.to_string(),
            format!("{:.3}", r.correlation),
            fmt_pct(r.period_return_pct),
            fmt_pct(r.window_return_pct),
        ]));
    }
    out.push_str(&format_summary(&MatchSummary::from_results(results), MatchKind::Quarters));
    out
}

/// `mean corr=0.842 | mean return=6.3% | positive years: 4/5`
pub fn format_summary(summary: &MatchSummary, kind: MatchKind) -> String {
    let mean_corr = summary
        .mean_correlation
        .map(|v| format!("{v:.3}"))
        .unwrap_or_else(|| "N/A".to_string());
    let mean_ret = summary
        .mean_return_pct
        .map(|v| format!("{v:.1}%"))
        .unwrap_or_else(|| "N/A".to_string());
    format!(
        "mean corr={mean_corr} | mean return={mean_ret} | positive {}: {}/{}\n",
        kind.noun(),
        summary.positive_count,
        summary.count
    )
}

/// History overview plus the most recent bars.
pub fn format_history(overview: &HistoryOverview) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Period: {}-{} | trading days: {} | last price: {:.2} | YTD {}: {}\n",
        overview.first_year,
        overview.last_year,
        overview.trading_days,
        overview.last_price,
        overview.ytd_year,
        fmt_pct(overview.ytd_return_pct),
    ));
    out.push('\n');
    out.push_str(&format!("Last {} days:\n", overview.recent.len()));
    out.push_str(&header_row(&["date", "adj close", "daily return"]));
    for b in &overview.recent {
        out.push_str(&row(&[
            b.date.to_string(),
            format!("{:.2}", b.adjusted_close),
            fmt_pct(b.daily_return_pct),
        ]));
    }
    out
}

fn no_matches(kind: MatchKind, min_correlation: f64) -> String {
    format!("No {} found with correlation >= {min_correlation:.2}\n", kind.noun())
}

fn header_row(cols: &[&str]) -> String {
    let cols: Vec<String> = cols.iter().map(|c| c.to_string()).collect();
    let mut out = row(&cols);
    let rule: Vec<String> = cols
        .iter()
        .enumerate()
        .map(|(i, _)| if i == 0 { "-".repeat(12) } else { "-".repeat(14) })
        .collect();
    out.push_str(&rule.join(" "));
    out.push('\n');
    out
}

fn row(cols: &[String]) -> String {
    let mut out = String::new();
    for (i, c) in cols.iter().enumerate() {
        if i == 0 {
            out.push_str(&format!("{c:<12}"));
        } else {
            out.push_str(&format!(" {c:>14}"));
        }
    }
    let mut out = out.trim_end().to_string();
    out.push('\n');
    out
}

fn fmt_pct(v: Option<f64>) -> String {
    match v {
        Some(v) if v.is_finite() => format!("{v:.2}%"),
        _ => "N/A".to_string(),
    }
}
