//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the immutable price input (`PriceBar`, `PriceSeries`)
//! - period identities (`Quarter`, `PeriodKey`, `MonthDay`)
//! - analysis parameters and ranked outputs (`AnalysisParams`, `SimilarityResult`)
//! - data-source configuration enums (`DataSource`, `Exchange`)

pub mod types;

pub use types::*;
