//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - validates them into an `AnalysisConfig`
//! - loads prices and runs the scans
//! - prints reports/plots

use chrono::Local;
use clap::Parser;
use tracing::warn;

use crate::cli::{AnalyzeArgs, Command};
use crate::data::PriceLoader;
use crate::domain::{AnalysisConfig, AnalysisParams, DataSource, Quarter};
use crate::error::AppError;

pub mod pipeline;

/// Range the dashboard offers for the correlation threshold.
pub const MIN_CORR_RANGE: (f64, f64) = (0.50, 0.95);
/// Range the dashboard offers for the number of matches.
pub const TOP_N_RANGE: (usize, usize) = (3, 10);

/// Entry point for the `analogs` binary.
pub fn run() -> Result<(), AppError> {
    // We want `analogs` and `analogs -t QQQ` to behave like `analogs tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    crate::logging::init(matches!(cli.command, Command::Tui(_)));

    match cli.command {
        Command::Analyze(args) => handle_analyze(args, OutputMode::Full),
        Command::Years(args) => handle_analyze(args, OutputMode::Years),
        Command::Quarters(args) => handle_analyze(args, OutputMode::Quarters),
        Command::History(args) => handle_history(args),
        Command::Tui(args) => handle_tui(args),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Full,
    Years,
    Quarters,
}

fn handle_analyze(args: AnalyzeArgs, mode: OutputMode) -> Result<(), AppError> {
    let config = config_from_args(&args)?;
    let mut loader = PriceLoader::from_env();
    let run = pipeline::run_analysis(&mut loader, &config)?;

    println!("{}", crate::report::format_run_header(&config, run.series.len()));

    if mode != OutputMode::Quarters {
        println!(
            "Years most similar to {} YTD (through {}):",
            run.reference_year,
            config.params.cutoff()
        );
        println!(
            "{}",
            crate::report::format_year_matches(&run.years, config.params.min_correlation)
        );
        if config.plot && !run.years.is_empty() {
            let plot = crate::plot::render_overlay(&run.year_curves(&config), config.plot_width, config.plot_height);
            println!("{plot}");
        }
    }

    if mode != OutputMode::Years {
        println!(
            "Quarters most similar to {}-{}:",
            run.reference_year, run.reference_quarter
        );
        println!(
            "{}",
            crate::report::format_quarter_matches(&run.quarters, config.params.min_correlation)
        );
        if config.plot && !run.quarters.is_empty() {
            let plot = crate::plot::render_overlay(&run.quarter_curves(), config.plot_width, config.plot_height);
            println!("{plot}");
        }
    }

    Ok(())
}

fn handle_history(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = config_from_args(&args)?;
    let mut loader = PriceLoader::from_env();
    let series = loader.load(&config)?;
    let overview = crate::report::HistoryOverview::from_series(&series, config.params.as_of)
        .ok_or_else(|| AppError::no_data(format!("No price data available for {}.", config.ticker)))?;

    println!("{}", crate::report::format_run_header(&config, series.len()));
    println!("{}", crate::report::format_history(&overview));
    Ok(())
}

fn handle_tui(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = config_from_args(&args)?;
    crate::tui::run(config)
}

/// Validate CLI flags into a run configuration.
///
/// Hard errors (exit code 2) for values the analysis cannot work with; values
/// that are merely outside the usual range only produce a warning.
pub fn config_from_args(args: &AnalyzeArgs) -> Result<AnalysisConfig, AppError> {
    if !args.min_corr.is_finite() || !(-1.0..=1.0).contains(&args.min_corr) {
        return Err(AppError::usage(format!(
            "--min-corr must be within [-1, 1] (got {}).",
            args.min_corr
        )));
    }
    if args.top == 0 {
        return Err(AppError::usage("--top must be at least 1."));
    }
    let reference_quarter = args
        .quarter
        .map(|q| {
            Quarter::from_number(q)
                .ok_or_else(|| AppError::usage(format!("--quarter must be 1-4 (got {q}).")))
        })
        .transpose()?;
    if args.source == DataSource::Csv && args.csv.is_none() {
        return Err(AppError::usage("--source csv requires --csv <path>."));
    }
    if args.ticker.trim().is_empty() {
        return Err(AppError::usage("--ticker must not be empty."));
    }

    if args.min_corr < MIN_CORR_RANGE.0 || args.min_corr > MIN_CORR_RANGE.1 {
        warn!(
            min_corr = args.min_corr,
            "correlation threshold outside the usual {:.2}-{:.2} range",
            MIN_CORR_RANGE.0,
            MIN_CORR_RANGE.1
        );
    }
    if args.top < TOP_N_RANGE.0 || args.top > TOP_N_RANGE.1 {
        warn!(
            top = args.top,
            "match count outside the usual {}-{} range", TOP_N_RANGE.0, TOP_N_RANGE.1
        );
    }

    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
    let params = AnalysisParams {
        min_correlation: args.min_corr,
        top_n: args.top,
        as_of,
    };

    Ok(AnalysisConfig {
        ticker: args.ticker.trim().to_string(),
        exchange: args.exchange,
        start_date: args.start,
        source: args.source,
        csv_path: args.csv.clone(),
        seed: args.seed,
        params,
        reference_year: args.year,
        reference_quarter,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
    })
}

/// Rewrite argv so `analogs` defaults to `analogs tui`.
///
/// Rules:
/// - `analogs`                      -> `analogs tui`
/// - `analogs -t QQQ ...`           -> `analogs tui -t QQQ ...`
/// - `analogs --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(
        arg1.as_str(),
        "analyze" | "years" | "quarters" | "history" | "tui"
    );
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}
