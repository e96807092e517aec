//! Plotters-powered overlay chart widget for Ratatui.
//!
//! Plotters gives nicer axis rendering than Ratatui's built-in `Chart` and
//! draws one `LineSeries` per curve without any manual line rasterizing.
//!
//! Output goes into the Ratatui buffer through `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::report::ComparisonCurve;

/// High-contrast line colors for matches, in ranking order.
pub const MATCH_PALETTE: [Color; 6] = [
    Color::Cyan,
    Color::Green,
    Color::Magenta,
    Color::LightBlue,
    Color::LightRed,
    Color::LightGreen,
];

/// Color used for the reference period.
pub const REFERENCE_COLOR: Color = Color::Yellow;

/// Ratatui color of the `idx`-th curve (the reference is not counted).
pub fn curve_color(curve: &ComparisonCurve, match_idx: usize) -> Color {
    if curve.is_reference {
        REFERENCE_COLOR
    } else {
        MATCH_PALETTE[match_idx % MATCH_PALETTE.len()]
    }
}

/// A render-only overlay description; bounds are computed outside `render()`.
pub struct OverlayChart<'a> {
    pub curves: &'a [ComparisonCurve],
    /// X bounds (trading day).
    pub x_bounds: [f64; 2],
    /// Y bounds (cumulative return, %).
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: &'a str,
}

impl<'a> OverlayChart<'a> {
    pub fn new(curves: &'a [ComparisonCurve]) -> Self {
        let (x_bounds, y_bounds) = chart_bounds(curves);
        Self {
            curves,
            x_bounds,
            y_bounds,
            x_label: "trading day",
            y_label: "cum. return %",
        }
    }
}

/// X/Y bounds covering every finite point, padded vertically by 5%.
pub fn chart_bounds(curves: &[ComparisonCurve]) -> ([f64; 2], [f64; 2]) {
    let mut x_max = 1.0_f64;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for &(x, y) in curves.iter().flat_map(|c| c.points.iter()) {
        if x.is_finite() && y.is_finite() {
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
    }
    if !(y_min.is_finite() && y_max.is_finite()) {
        return ([0.0, x_max], [-1.0, 1.0]);
    }
    let pad = ((y_max - y_min) * 0.05).max(0.5);
    ([0.0, x_max], [y_min - pad, y_max + pad])
}

fn to_rgb(color: Color) -> RGBColor {
    match color {
        Color::Yellow => RGBColor(255, 255, 0),
        Color::Cyan => RGBColor(0, 255, 255),
        Color::Green => RGBColor(0, 255, 0),
        Color::Magenta => RGBColor(255, 0, 255),
        Color::LightBlue => RGBColor(100, 150, 255),
        Color::LightRed => RGBColor(255, 110, 110),
        Color::LightGreen => RGBColor(150, 255, 150),
        _ => RGBColor(255, 255, 255),
    }
}

impl<'a> Widget for OverlayChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to build a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            // Mesh lines are clutter at terminal resolution; axes and labels suffice.
            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| format!("{v:.0}"))
                .y_label_formatter(&|v| format!("{v:.0}"))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            // Zero line so gains and losses read at a glance.
            chart.draw_series(LineSeries::new([(x0, 0.0), (x1, 0.0)], &RGBColor(90, 90, 90)))?;

            // Matches first so the reference stays on top.
            let mut match_idx = 0usize;
            for curve in self.curves.iter().filter(|c| !c.is_reference) {
                let color = to_rgb(curve_color(curve, match_idx));
                match_idx += 1;
                chart.draw_series(LineSeries::new(curve.points.iter().copied(), &color))?;
            }
            for curve in self.curves.iter().filter(|c| c.is_reference) {
                let color = to_rgb(curve_color(curve, 0));
                chart.draw_series(LineSeries::new(curve.points.iter().copied(), &color))?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}
