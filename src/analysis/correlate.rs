//! Cumulative-return paths and their correlation.
//!
//! Correlating cumulative (not daily) returns rewards similarity of the overall
//! trajectory and is insensitive to amplitude: a path and a scaled copy of it
//! correlate at 1.0.

use thiserror::Error;

use crate::domain::PriceBar;

/// Why a candidate period did not produce a correlation coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("insufficient data: {len} observations, {required} required")]
    InsufficientData { len: usize, required: usize },
    #[error("insufficient valid pairs: {valid} valid positions, {required} required")]
    InsufficientPairs { valid: usize, required: usize },
    #[error("zero variance in cumulative-return path")]
    ZeroVariance,
    #[error("non-finite correlation")]
    NonFinite,
    #[error("reference period has too little data")]
    EmptyReference,
}

/// Cumulative return at each position, measured from the first bar.
///
/// Position 0 is exactly `0.0`; position `i` compounds the daily returns of
/// bars `1..=i`. Anything accumulated before the first bar is ignored.
/// Positions whose value is not finite (or whose daily return is missing)
/// are `None`.
pub fn cumulative_path(bars: &[PriceBar]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(bars.len());
    let mut growth = Some(1.0_f64);
    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            growth = match (growth, bar.daily_return) {
                (Some(g), Some(r)) => Some(g * (1.0 + r)),
                _ => None,
            };
        }
        out.push(growth.map(|g| g - 1.0).filter(|v| v.is_finite()));
    }
    out
}

/// Pearson correlation coefficient.
///
/// `None` on length mismatch, fewer than two points, zero variance or a
/// non-finite result.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    pearson_checked(x, y).ok()
}

fn pearson_checked(x: &[f64], y: &[f64]) -> Result<f64, SkipReason> {
    if x.len() != y.len() || x.len() < 2 {
        return Err(SkipReason::InsufficientPairs {
            valid: x.len().min(y.len()),
            required: 2,
        });
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if !(var_x.is_finite() && var_y.is_finite() && cov.is_finite()) {
        return Err(SkipReason::NonFinite);
    }
    if var_x <= f64::EPSILON * f64::EPSILON || var_y <= f64::EPSILON * f64::EPSILON {
        return Err(SkipReason::ZeroVariance);
    }

    let r = cov / (var_x * var_y).sqrt();
    if !r.is_finite() {
        return Err(SkipReason::NonFinite);
    }
    Ok(r.clamp(-1.0, 1.0))
}

/// Correlate two periods' cumulative-return paths by ordinal alignment.
///
/// Both extracts are truncated to the shorter length `n`; `n` and the number
/// of positions where both paths are defined must each reach `min_len`.
pub fn correlate(a: &[PriceBar], b: &[PriceBar], min_len: usize) -> Result<f64, SkipReason> {
    let n = a.len().min(b.len());
    if n < min_len {
        return Err(SkipReason::InsufficientData { len: n, required: min_len });
    }

    let path_a = cumulative_path(&a[..n]);
    let path_b = cumulative_path(&b[..n]);

    let (xs, ys): (Vec<f64>, Vec<f64>) = path_a
        .into_iter()
        .zip(path_b)
        .filter_map(|pair| match pair {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        })
        .unzip();

    if xs.len() < min_len {
        return Err(SkipReason::InsufficientPairs {
            valid: xs.len(),
            required: min_len,
        });
    }

    pearson_checked(&xs, &ys)
}

/// `(last / first - 1) * 100`, or `None` with fewer than two usable bars.
pub fn period_return_pct(bars: &[PriceBar]) -> Option<f64> {
    if bars.len() < 2 {
        return None;
    }
    let first = bars.first()?.adjusted_close;
    let last = bars.last()?.adjusted_close;
    if !(first.is_finite() && last.is_finite()) || first <= 0.0 {
        return None;
    }
    Some((last / first - 1.0) * 100.0)
}
