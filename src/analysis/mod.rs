//! Pattern-matching engine.
//!
//! - period extraction (`extract`)
//! - cumulative-return paths and correlation (`correlate`)
//! - ranking scans over all historical periods (`scan`)
//! - summary statistics of a ranking (`summary`)
//!
//! Everything here is a pure function of its inputs: no I/O, no clock, no
//! shared state. Per-candidate problems are reported as [`SkipReason`]s and
//! never abort a scan.

pub mod correlate;
pub mod extract;
pub mod scan;
pub mod summary;

pub use correlate::{SkipReason, correlate, cumulative_path, pearson, period_return_pct};
pub use extract::{extract, extract_quarter, extract_year};
pub use scan::{
    FullQuarter, PeriodStrategy, ScanOutcome, YearToDate, find_similar_quarters, find_similar_years, scan,
};
pub use summary::MatchSummary;
