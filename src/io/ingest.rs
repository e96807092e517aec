//! CSV price-history ingest.
//!
//! This module turns a heterogeneous daily-price CSV into a clean
//! `PriceSeries`.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Separation of concerns**: no analysis logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::PriceSeries;
use crate::error::AppError;

/// Accepted price columns, in order of preference.
const PRICE_COLUMNS: [&str; 4] = ["adjusted_close", "adj_close", "adj close", "close"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the series plus what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedPrices {
    pub series: PriceSeries,
    /// Column the prices were read from.
    pub price_column: String,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a price CSV with a `date` column and an adjusted-close (or close) column.
pub fn load_price_csv(path: &Path) -> Result<IngestedPrices, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::usage(format!("Failed to open CSV '{}': {e}", path.display())))?;
    let ingested = read_price_csv(file)?;
    info!(
        path = %path.display(),
        rows = ingested.rows_read,
        used = ingested.series.len(),
        errors = ingested.row_errors.len(),
        "loaded price CSV"
    );
    Ok(ingested)
}

/// Parse price CSV content from any reader.
pub fn read_price_csv<R: Read>(reader: R) -> Result<IngestedPrices, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::usage(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let date_idx = *header_map
        .get("date")
        .ok_or_else(|| AppError::usage("Missing required column: `date`"))?;
    let (price_column, price_idx) = PRICE_COLUMNS
        .iter()
        .find_map(|name| header_map.get(*name).map(|idx| (name.to_string(), *idx)))
        .ok_or_else(|| {
            AppError::usage(
                "Missing price column: expected one of `adjusted_close`, `adj_close`, `adj close`, `close`.",
            )
        })?;

    let mut prices = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header, and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, date_idx, price_idx) {
            Ok(row) => prices.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        warn!(count = row_errors.len(), "skipped invalid CSV rows");
    }
    if prices.is_empty() {
        return Err(AppError::no_data("No valid price rows found in CSV."));
    }

    Ok(IngestedPrices {
        series: PriceSeries::from_prices(prices),
        price_column,
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(record: &StringRecord, date_idx: usize, price_idx: usize) -> Result<(NaiveDate, f64), String> {
    let date = record
        .get(date_idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "Missing required value: `date`".to_string())
        .and_then(parse_date)?;
    let raw = record
        .get(price_idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "Missing price value.".to_string())?;
    let price = raw
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("Invalid price '{raw}'."))?;
    if price <= 0.0 {
        return Err(format!("Non-positive price '{raw}'."));
    }
    Ok((date, price))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // ISO first; a few common export formats are accepted as well. Timestamps
    // like `2024-01-02 00:00:00` are cut to their date part.
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
    let s = s.split_whitespace().next().unwrap_or(s);
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, DD/MM/YYYY, DD-MM-YYYY, YYYY/MM/DD."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_adjusted_close_and_reports_bad_rows() {
        let csv = "\u{feff}Date,Open,Close,Adjusted_Close\n\
                   2024-01-03,1,10,9.9\n\
                   2024-01-02,1,10,9.8\n\
                   not-a-date,1,10,9.7\n\
                   2024-01-04,1,10,\n\
                   2024-01-05 00:00:00,1,10,10.1\n";
        let out = read_price_csv(csv.as_bytes()).unwrap();
        assert_eq!(out.price_column, "adjusted_close");
        assert_eq!(out.rows_read, 5);
        assert_eq!(out.series.len(), 3);
        assert_eq!(out.row_errors.len(), 2);
        assert_eq!(out.row_errors[0].line, 4);
        // Sorted ascending regardless of file order.
        assert_eq!(out.series.first_date(), NaiveDate::from_ymd_opt(2024, 1, 2));
    }

    #[test]
    fn falls_back_to_close_column() {
        let csv = "date,close\n02/01/2024,100\n03/01/2024,101\n";
        let out = read_price_csv(csv.as_bytes()).unwrap();
        assert_eq!(out.price_column, "close");
        assert_eq!(out.series.len(), 2);
    }

    #[test]
    fn missing_columns_are_schema_errors() {
        let err = read_price_csv("day,close\n2024-01-02,1\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let err = read_price_csv("date,volume\n2024-01-02,1\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn no_valid_rows_is_no_data() {
        let err = read_price_csv("date,close\nx,y\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn zero_price_mid_year_is_a_row_error_and_never_reads_as_total_loss() {
        use crate::analysis::{cumulative_path, extract_year};

        let csv = "date,adjusted_close
                   2023-01-03,100
                   2023-01-04,101
                   2023-01-05,0
                   2023-01-06,102
                   2023-01-09,-3
                   2023-01-10,104
";
        let out = read_price_csv(csv.as_bytes()).unwrap();
        assert_eq!(out.series.len(), 4);
        assert_eq!(out.row_errors.len(), 2);
        assert_eq!(out.row_errors[0].line, 4);
        assert!(out.row_errors[0].message.contains("Non-positive"));

        let bars = extract_year(&out.series, 2023, None);
        let path = cumulative_path(&bars);
        assert!(!path.is_empty());
        assert!(path.iter().flatten().all(|v| *v > -1.0));
        // Measured from the first extracted bar (101).
        let last = path.last().copied().flatten().unwrap();
        assert!((last - 104.0 / 101.0 + 1.0).abs() < 1e-12);
    }
}
