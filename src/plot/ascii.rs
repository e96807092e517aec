//! ASCII overlay chart for terminal output.
//!
//! Fixed-size grid, deterministic output. Plot elements:
//! - reference period: `*`
//! - matches: `1`..`9` in ranking order (`+` past the ninth)
//!
//! The reference is drawn first and matches only fill blank cells, so the
//! reference line is never hidden.

use crate::report::ComparisonCurve;

/// Render the overlay of cumulative-return curves plus a legend.
pub fn render_overlay(curves: &[ComparisonCurve], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some((x_min, x_max, y_min, y_max)) = ranges(curves) else {
        return "Plot: no data\n".to_string();
    };
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    let mut match_idx = 0usize;
    let mut legend = Vec::with_capacity(curves.len());
    for curve in curves.iter().filter(|c| c.is_reference) {
        draw_curve(&mut grid, &curve.points, (x_min, x_max), (y_min, y_max), '*');
        legend.push(format!("  * {}", curve.label));
    }
    for curve in curves.iter().filter(|c| !c.is_reference) {
        match_idx += 1;
        let ch = marker(match_idx);
        draw_curve(&mut grid, &curve.points, (x_min, x_max), (y_min, y_max), ch);
        legend.push(format!("  {ch} {}", curve.label));
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: day=[{x_min:.0}, {x_max:.0}] | cumulative return=[{y_min:.2}, {y_max:.2}]%\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    for line in legend {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn marker(idx: usize) -> char {
    match idx {
        1..=9 => char::from_digit(idx as u32, 10).unwrap_or('+'),
        _ => '+',
    }
}

fn ranges(curves: &[ComparisonCurve]) -> Option<(f64, f64, f64, f64)> {
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for &(x, y) in curves.iter().flat_map(|c| c.points.iter()) {
        if !(x.is_finite() && y.is_finite()) {
            continue;
        }
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !x_max.is_finite() {
        return None;
    }
    // Curves all start at day 0; a single-point chart still needs a span.
    let x_max = if x_max > 0.0 { x_max } else { 1.0 };
    let (y_min, y_max) = if y_max > y_min { (y_min, y_max) } else { (y_min - 1.0, y_max + 1.0) };
    Some((0.0, x_max, y_min, y_max))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], points: &[(f64, f64)], xr: (f64, f64), yr: (f64, f64), ch: char) {
    let height = grid.len();
    let width = grid.first().map_or(0, Vec::len);
    if width == 0 {
        return;
    }

    let mut prev = None;
    for &(x, y) in points.iter().filter(|(x, y)| x.is_finite() && y.is_finite()) {
        let col = map_x(x, xr.0, xr.1, width);
        let row = map_y(y, yr.0, yr.1, height);
        match prev {
            Some((c0, r0)) => draw_line(grid, c0, r0, col, row, ch),
            None => {
                if grid[row][col] == ' ' {
                    grid[row][col] = ch;
                }
            }
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham); only blank cells are written.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
