//! Input helpers.
//!
//! - CSV price-history ingest + validation (`ingest`)

pub mod ingest;

pub use ingest::*;
