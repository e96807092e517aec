//! Ratatui-based terminal UI.
//!
//! The dashboard has a settings panel (ticker, exchange, correlation threshold,
//! match count) and three tabs: matched years, matched quarters and the price
//! history overview. Re-ranking after a threshold change reuses the loaded
//! series; ticker/exchange changes go through the loader cache; `r` re-fetches.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Tabs},
};
use tracing::warn;

use crate::analysis::MatchSummary;
use crate::app::pipeline::{AnalysisOutput, analyze_series};
use crate::app::{MIN_CORR_RANGE, TOP_N_RANGE};
use crate::data::PriceLoader;
use crate::domain::{AnalysisConfig, DataSource, SimilarityResult};
use crate::error::AppError;
use crate::report::{ComparisonCurve, MatchKind};

mod plotters_chart;

use plotters_chart::{MATCH_PALETTE, OverlayChart};

/// Step of the correlation threshold per key press.
const MIN_CORR_STEP: f64 = 0.05;

/// Start the TUI.
pub fn run(config: AnalysisConfig) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::runtime(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(config, PriceLoader::from_env());
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::runtime(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::runtime(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Years,
    Quarters,
    History,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Years, Tab::Quarters, Tab::History];

    fn title(self) -> &'static str {
        match self {
            Tab::Years => "Years",
            Tab::Quarters => "Quarters",
            Tab::History => "History",
        }
    }

    fn index(self) -> usize {
        match self {
            Tab::Years => 0,
            Tab::Quarters => 1,
            Tab::History => 2,
        }
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Settings rows, top to bottom.
const FIELD_TICKER: usize = 0;
const FIELD_EXCHANGE: usize = 1;
const FIELD_MIN_CORR: usize = 2;
const FIELD_TOP_N: usize = 3;
const FIELD_COUNT: usize = 4;

struct App {
    config: AnalysisConfig,
    loader: PriceLoader,
    tab: Tab,
    selected_field: usize,
    editing_ticker: bool,
    ticker_input: String,
    status: String,
    run: Option<AnalysisOutput>,
}

impl App {
    fn new(config: AnalysisConfig, loader: PriceLoader) -> Self {
        let mut app = Self {
            ticker_input: config.ticker.clone(),
            config,
            loader,
            tab: Tab::Years,
            selected_field: FIELD_TICKER,
            editing_ticker: false,
            status: String::new(),
            run: None,
        };
        app.load(false);
        app
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::runtime(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::runtime(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::runtime(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.editing_ticker {
            self.handle_ticker_edit(code);
            return false;
        }

        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab => self.tab = self.tab.next(),
            KeyCode::BackTab => self.tab = self.tab.prev(),
            KeyCode::Up => self.selected_field = self.selected_field.saturating_sub(1),
            KeyCode::Down => {
                if self.selected_field + 1 < FIELD_COUNT {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Enter => {
                if self.selected_field == FIELD_TICKER {
                    self.editing_ticker = true;
                    self.ticker_input = self.config.ticker.clone();
                    self.status = "Editing ticker. Enter to apply, Esc to cancel.".to_string();
                }
            }
            KeyCode::Char('r') => self.load(true),
            _ => {}
        }
        false
    }

    fn handle_ticker_edit(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.editing_ticker = false;
                self.ticker_input = self.config.ticker.clone();
                self.status = "Ticker edit canceled.".to_string();
            }
            KeyCode::Enter => {
                self.editing_ticker = false;
                let ticker = self.ticker_input.trim().to_uppercase();
                if ticker.is_empty() {
                    self.status = "Ticker must not be empty.".to_string();
                    self.ticker_input = self.config.ticker.clone();
                } else if ticker != self.config.ticker {
                    self.config.ticker = ticker;
                    self.load(false);
                }
            }
            KeyCode::Backspace => {
                self.ticker_input.pop();
            }
            KeyCode::Char(c) => {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '^' | '=') {
                    self.ticker_input.push(c);
                }
            }
            _ => {}
        }
    }

    fn adjust_field(&mut self, delta: i32) {
        match self.selected_field {
            FIELD_EXCHANGE => {
                self.config.exchange = if delta >= 0 {
                    self.config.exchange.next()
                } else {
                    self.config.exchange.prev()
                };
                self.load(false);
            }
            FIELD_MIN_CORR => {
                self.config.params.min_correlation = step_min_corr(self.config.params.min_correlation, delta);
                self.reanalyze();
                self.status = format!("min corr: {:.2}", self.config.params.min_correlation);
            }
            FIELD_TOP_N => {
                self.config.params.top_n = step_top_n(self.config.params.top_n, delta);
                self.reanalyze();
                self.status = format!("top: {}", self.config.params.top_n);
            }
            _ => {}
        }
    }

    /// Load prices (through the cache unless `force`) and re-run the analysis.
    ///
    /// Failures stay in the status line; the previous results are dropped so
    /// the screen never shows data for a different instrument.
    fn load(&mut self, force: bool) {
        let result = if force {
            self.loader.reload(&self.config)
        } else {
            self.loader.load(&self.config)
        };
        match result {
            Ok(series) => {
                let run = analyze_series(series, &self.config);
                self.status = format!(
                    "{} {}: {} days loaded{}",
                    self.config.ticker,
                    self.config.exchange.code(),
                    run.series.len(),
                    if force { " (refreshed)" } else { "" }
                );
                self.run = Some(run);
            }
            Err(err) => {
                warn!(error = %err, ticker = %self.config.ticker, "load failed");
                self.status = err.message().to_string();
                self.run = None;
            }
        }
    }

    fn reanalyze(&mut self) {
        if let Some(run) = self.run.take() {
            self.run = Some(analyze_series(run.series, &self.config));
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_tabs(frame, chunks[1]);
        self.draw_body(frame, chunks[2]);
        self.draw_footer(frame, chunks[3]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("analogs", Style::default().fg(Color::Cyan)),
            Span::raw(" - historical pattern matching"),
            Span::styled(
                format!("  [{}]", source_label(self.config.source, self.loader.has_eodhd_key())),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

        let params = &self.config.params;
        let days = self.run.as_ref().map(|r| r.series.len()).unwrap_or(0);
        lines.push(Line::from(Span::styled(
            format!(
                "{} ({}) | as-of {} | reference {} YTD through {} / {}-{} | days={days}",
                self.config.ticker,
                self.config.exchange.code(),
                params.as_of,
                self.config.reference_year(),
                params.cutoff(),
                self.config.reference_year(),
                self.config.reference_quarter(),
            ),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_tabs(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let titles: Vec<&str> = Tab::ALL.iter().map(|t| t.title()).collect();
        let tabs = Tabs::new(titles)
            .select(self.tab.index())
            .block(Block::default().borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
        frame.render_widget(tabs, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(10)])
            .split(area);
        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(chunks[1]);

        match self.tab {
            Tab::Years | Tab::Quarters => {
                self.draw_chart(frame, chunks[0]);
                self.draw_matches(frame, bottom[0]);
            }
            Tab::History => {
                self.draw_history(frame, chunks[0]);
                self.draw_recent(frame, bottom[0]);
            }
        }
        self.draw_settings(frame, bottom[1]);
    }

    fn current(&self) -> Option<(&[SimilarityResult], MatchSummary, Vec<ComparisonCurve>)> {
        let run = self.run.as_ref()?;
        Some(match self.tab {
            Tab::Quarters => (&run.quarters[..], run.quarter_summary, run.quarter_curves()),
            _ => (&run.years[..], run.year_summary, run.year_curves(&self.config)),
        })
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = match self.tab {
            Tab::Quarters => "Cumulative return by trading day (quarters)",
            _ => "Cumulative return by trading day (years)",
        };
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some((_, _, curves)) = self.current() else {
            let msg = Paragraph::new("No data loaded.")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default());
            frame.render_widget(msg, inner);
            return;
        };

        let (chart_rect, insets) = chart_layout(inner);
        let widget = OverlayChart::new(&curves);
        let (x_bounds, y_bounds) = (widget.x_bounds, widget.y_bounds);
        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, x_bounds, y_bounds);
        }
    }

    fn draw_matches(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let kind = match self.tab {
            Tab::Quarters => MatchKind::Quarters,
            _ => MatchKind::Years,
        };
        let block = Block::default().title("Matches").borders(Borders::ALL);
        let Some((results, summary, _)) = self.current() else {
            frame.render_widget(Paragraph::new("-").block(block), area);
            return;
        };

        if results.is_empty() {
            let msg = match kind {
                MatchKind::Years => crate::report::format_year_matches(results, self.config.params.min_correlation),
                MatchKind::Quarters => {
                    crate::report::format_quarter_matches(results, self.config.params.min_correlation)
                }
            };
            let p = Paragraph::new(msg.trim_end().to_string())
                .style(Style::default().fg(Color::Yellow))
                .block(block);
            frame.render_widget(p, area);
            return;
        }

        let inner = block.inner(area);
        frame.render_widget(block, area);
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(inner);

        let rows: Vec<Row> = results
            .iter()
            .enumerate()
            .map(|(i, r)| {
                // Same order as the chart's line colors.
                let color = MATCH_PALETTE[i % MATCH_PALETTE.len()];
                Row::new(vec![
                    Cell::from(r.period.to_string()),
                    Cell::from(format!("{:.3}", r.correlation)),
                    Cell::from(fmt_pct(r.period_return_pct)),
                    Cell::from(fmt_pct(r.window_return_pct)),
                ])
                .style(Style::default().fg(color))
            })
            .collect();
        let header = Row::new(vec!["period", "corr", "full", "at point"])
            .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
        let table = Table::new(
            rows,
            [
                Constraint::Length(9),
                Constraint::Length(7),
                Constraint::Length(10),
                Constraint::Length(10),
            ],
        )
        .header(header);
        frame.render_widget(table, parts[0]);

        let summary_line = crate::report::format_summary(&summary, kind);
        frame.render_widget(
            Paragraph::new(summary_line.trim_end().to_string()).style(Style::default().fg(Color::Gray)),
            parts[1],
        );
    }

    fn draw_history(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("History").borders(Borders::ALL);
        let text = match self.run.as_ref().and_then(|r| r.overview.as_ref()) {
            Some(o) => vec![
                Line::from(format!("Period: {}-{}", o.first_year, o.last_year)),
                Line::from(format!("Trading days: {}", o.trading_days)),
                Line::from(format!("Last price: {:.2}", o.last_price)),
                Line::from(format!("YTD {}: {}", o.ytd_year, fmt_pct(o.ytd_return_pct))),
            ],
            None => vec![Line::from("No data loaded.")],
        };
        frame.render_widget(Paragraph::new(Text::from(text)).block(block), area);
    }

    fn draw_recent(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Recent days").borders(Borders::ALL);
        let Some(overview) = self.run.as_ref().and_then(|r| r.overview.as_ref()) else {
            frame.render_widget(Paragraph::new("-").block(block), area);
            return;
        };
        let rows: Vec<Row> = overview
            .recent
            .iter()
            .rev()
            .map(|b| {
                let color = match b.daily_return_pct {
                    Some(r) if r > 0.0 => Color::Green,
                    Some(r) if r < 0.0 => Color::Red,
                    _ => Color::Gray,
                };
                Row::new(vec![
                    Cell::from(b.date.to_string()),
                    Cell::from(format!("{:.2}", b.adjusted_close)),
                    Cell::from(fmt_pct(b.daily_return_pct)).style(Style::default().fg(color)),
                ])
            })
            .collect();
        let header = Row::new(vec!["date", "adj close", "return"])
            .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
        let table = Table::new(
            rows,
            [Constraint::Length(11), Constraint::Length(11), Constraint::Length(9)],
        )
        .header(header)
        .block(block);
        frame.render_widget(table, area);
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let ticker = if self.editing_ticker {
            format!("{}_", self.ticker_input)
        } else {
            self.config.ticker.clone()
        };

        let items = vec![
            ListItem::new(format!("Ticker: {ticker}")),
            ListItem::new(format!("Exchange: {}", self.config.exchange.code())),
            ListItem::new(format!("Min corr: {:.2}", self.config.params.min_correlation)),
            ListItem::new(format!("Top N: {}", self.config.params.top_n)),
        ];

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);

        if self.editing_ticker {
            let hint = Paragraph::new("Editing ticker…")
                .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
            let rect = Rect {
                x: area.x + 2,
                y: area.y + area.height.saturating_sub(2),
                width: area.width.saturating_sub(4),
                height: 1,
            };
            frame.render_widget(hint, rect);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "Tab switch view  ↑/↓ select  ←/→ adjust  Enter edit ticker  r refresh  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Next correlation threshold, kept on the 0.05 grid inside the usual range.
fn step_min_corr(current: f64, delta: i32) -> f64 {
    let next = current + MIN_CORR_STEP * f64::from(delta.signum());
    let next = (next * 100.0).round() / 100.0;
    next.clamp(MIN_CORR_RANGE.0, MIN_CORR_RANGE.1)
}

fn step_top_n(current: usize, delta: i32) -> usize {
    let next = if delta >= 0 {
        current.saturating_add(1)
    } else {
        current.saturating_sub(1)
    };
    next.clamp(TOP_N_RANGE.0, TOP_N_RANGE.1)
}

fn fmt_pct(v: Option<f64>) -> String {
    v.filter(|v| v.is_finite())
        .map(|v| format!("{v:.2}%"))
        .unwrap_or_else(|| "N/A".to_string())
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = format!("{x_val:.0}");
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        let width = label.len() as u16;
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = format!("{y_val:.1}%");
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        let width = label.len() as u16;
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("trading day")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }
}

/// `auto, EODHD key: yes`. The key only matters for the remote sources.
fn source_label(source: DataSource, has_eodhd_key: bool) -> String {
    let name = format!("{source:?}").to_lowercase();
    match source {
        DataSource::Auto | DataSource::Eodhd => {
            format!("{name}, EODHD key: {}", if has_eodhd_key { "yes" } else { "no" })
        }
        _ => name,
    }
}
