//! Command-line parsing for the historical analog finder.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the analysis code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::domain::{DataSource, Exchange};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "analogs",
    version,
    about = "Find historical years and quarters whose price path resembles the current one"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run both scans, print the tables and (optionally) the overlay plot.
    Analyze(AnalyzeArgs),
    /// Year-to-date matches only.
    Years(AnalyzeArgs),
    /// Quarter matches only.
    Quarters(AnalyzeArgs),
    /// Overview of the loaded history and the most recent bars.
    History(AnalyzeArgs),
    /// Launch the interactive dashboard.
    ///
    /// Uses the same loader and analysis as `analogs analyze`, rendered with
    /// Ratatui.
    Tui(AnalyzeArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Parser, Clone)]
pub struct AnalyzeArgs {
    /// Ticker symbol (e.g. SPY, AAPL, BTC-USD).
    #[arg(short = 't', long, default_value = "SPY")]
    pub ticker: String,

    /// Exchange code used to build the provider symbol.
    #[arg(short = 'e', long, value_enum, default_value_t = Exchange::Us)]
    pub exchange: Exchange,

    /// First date of history to request (YYYY-MM-DD).
    #[arg(long, default_value = "2006-01-01")]
    pub start: NaiveDate,

    /// Minimum Pearson correlation for a period to be reported.
    #[arg(long = "min-corr", default_value_t = 0.70, allow_negative_numbers = true)]
    pub min_corr: f64,

    /// Maximum number of matches per table.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Analysis date (defaults to today). Sets the year-to-date cutoff.
    #[arg(long = "as-of")]
    pub as_of: Option<NaiveDate>,

    /// Reference year (defaults to the as-of year).
    #[arg(long)]
    pub year: Option<i32>,

    /// Reference quarter 1-4 (defaults to the as-of quarter).
    #[arg(long)]
    pub quarter: Option<u32>,

    /// Where prices come from.
    #[arg(long, value_enum, default_value_t = DataSource::Auto)]
    pub source: DataSource,

    /// Price CSV for `--source csv`.
    #[arg(long, value_name = "CSV")]
    pub csv: Option<PathBuf>,

    /// Random seed for `--source synthetic`.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Disable the terminal overlay plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 22)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let cli = Cli::parse_from(["analogs", "analyze"]);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.ticker, "SPY");
        assert_eq!(args.exchange, Exchange::Us);
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2006, 1, 1).unwrap());
        assert_eq!(args.min_corr, 0.70);
        assert_eq!(args.top, 5);
        assert_eq!(args.source, DataSource::Auto);
        assert!(args.as_of.is_none());
        assert!(!args.no_plot);
    }

    #[test]
    fn flags_parse() {
        let cli = Cli::parse_from([
            "analogs", "quarters", "-t", "btc-usd", "-e", "cc", "--min-corr", "0.8", "--top", "3",
            "--as-of", "2024-05-10", "--quarter", "2", "--source", "synthetic",
        ]);
        let Command::Quarters(args) = cli.command else {
            panic!("expected quarters");
        };
        assert_eq!(args.ticker, "btc-usd");
        assert_eq!(args.exchange, Exchange::Cc);
        assert_eq!(args.min_corr, 0.8);
        assert_eq!(args.as_of, NaiveDate::from_ymd_opt(2024, 5, 10));
        assert_eq!(args.quarter, Some(2));
        assert_eq!(args.source, DataSource::Synthetic);
    }
}
