//! `period-analogs` library crate.
//!
//! The binary (`analogs`) is a thin wrapper around this library so that:
//!
//! - the analysis core is testable without spawning processes or touching the network
//! - the CLI and the TUI share one pipeline
//! - code stays easy to navigate as the project grows

pub mod analysis;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod plot;
pub mod report;
pub mod tui;
