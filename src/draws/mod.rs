//! Module for visualizing backtest results.
//!
//! The equity curve can always be rendered as a character grid with [`render_equity_curve`].
//! With the `draws` feature, [`Draw`] also writes SVG and PNG charts through `plotters`.

#[cfg(feature = "draws")]
mod chart;

use crate::engine::{BacktestResult, Candle, EquityPoint};
use crate::errors::Result;

/// Glyph plotted for each sampled equity point.
pub const GLYPH: char = '█';
/// Share of the equity range added above and below the curve.
const PADDING: f64 = 0.05;

/// Renders the equity curve of `result` on a `width` × `height` character grid.
///
/// Row 0 is the top of the chart (highest equity). The curve is sampled every
/// `max(1, points / width)` points and each sampled column gets one [`GLYPH`].
/// Rows are joined with `\n` and every row is exactly `width` characters long.
///
/// ### Arguments
/// * `result` - A finished backtest.
/// * `width` - Number of columns.
/// * `height` - Number of rows.
///
/// ### Returns
/// The rendered grid; empty when either dimension is zero, blank when the curve is empty.
pub fn render_equity_curve(result: &BacktestResult, width: usize, height: usize) -> String {
    render_points(&result.equity_curve, width, height)
}

/// Renders raw equity points, see [`render_equity_curve`].
pub fn render_points(curve: &[EquityPoint], width: usize, height: usize) -> String {
    if width == 0 || height == 0 {
        return String::new();
    }

    let mut grid = vec![vec![' '; width]; height];

    if !curve.is_empty() {
        let min = curve.iter().map(|p| p.equity).fold(f64::INFINITY, f64::min);
        let max = curve.iter().map(|p| p.equity).fold(f64::NEG_INFINITY, f64::max);
        let range = if max - min == 0.0 { 1.0 } else { max - min };
        let low = min - range * PADDING;
        let span = range * (1.0 + 2.0 * PADDING);
        let step = (curve.len() / width).max(1);
        let last_row = height - 1;

        for (column, point) in curve.iter().step_by(step).take(width).enumerate() {
            let scaled = ((point.equity - low) / span * last_row as f64).round() as usize;
            let row = last_row.saturating_sub(scaled);
            grid[row][column] = GLYPH;
        }
    }

    grid.into_iter()
        .map(|row| row.into_iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Output formats for the generated charts with output filename.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DrawOutput {
    /// Save to the output SVG file.
    #[cfg(feature = "draws")]
    Svg(String),
    /// Save to the output PNG file.
    #[cfg(feature = "draws")]
    Png(String),
    /// Return the character grid.
    #[default]
    Inner,
}

/// Configuration options for chart generation.
#[derive(Debug, Clone)]
pub struct DrawOptions {
    /// Chart title.
    title: Option<String>,
    /// Output format and path.
    output: DrawOutput,
    /// Grid size of the text output.
    width: usize,
    height: usize,
    /// Whether to show the volume chart.
    #[cfg(feature = "draws")]
    show_volume: bool,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            title: None,
            output: DrawOutput::default(),
            width: 60,
            height: 15,
            #[cfg(feature = "draws")]
            show_volume: false,
        }
    }
}

impl DrawOptions {
    /// Sets the chart title.
    pub fn title(mut self, title: impl ToString) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Sets the output format and path.
    pub fn draw_output(mut self, output: DrawOutput) -> Self {
        self.output = output;
        self
    }

    /// Sets the grid size of the text output.
    pub fn size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enables or disables the volume chart. Only used with candles.
    #[cfg(feature = "draws")]
    pub fn show_volume(mut self, show: bool) -> Self {
        self.show_volume = show;
        self
    }
}

/// Chart drawing utility for backtest visualization.
///
/// ### Example
/// ```rust
/// use btsim::prelude::*;
/// use chrono::{DateTime, Duration};
///
/// let start = DateTime::default();
/// let config = BacktestConfig::builder()
///     .symbol("AAPL")
///     .start(start)
///     .end(start + Duration::days(1))
///     .initial_capital(1_000.0)
///     .build()
///     .unwrap();
/// let result = BacktestResult {
///     config,
///     equity_curve: vec![],
///     trades: vec![],
///     metrics: Metrics::default(),
/// };
///
/// let text = Draw::with_result(&result)
///     .with_options(DrawOptions::default().title("AAPL").size(10, 3))
///     .plot()
///     .unwrap()
///     .unwrap();
/// assert_eq!(text.lines().count(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct Draw<'d> {
    /// Reference to the backtest result.
    result: &'d BacktestResult,
    /// Candles the result was computed on, for the price panel.
    candles: Option<&'d [Candle]>,
    /// Drawing options.
    options: DrawOptions,
}

impl<'d> Draw<'d> {
    /// Creates a new `Draw` instance with the given result.
    pub fn with_result(result: &'d BacktestResult) -> Self {
        Self {
            result,
            candles: None,
            options: DrawOptions::default(),
        }
    }

    /// Adds the candles of the run; charts then include a price panel.
    pub fn with_candles(mut self, candles: &'d [Candle]) -> Self {
        self.candles = Some(candles);
        self
    }

    /// Sets the drawing options.
    pub fn with_options(mut self, options: DrawOptions) -> Self {
        self.options = options;
        self
    }

    /// Generates the chart based on the configured options.
    ///
    /// ### Returns
    /// The text chart for [`DrawOutput::Inner`], `None` once a file has been written.
    pub fn plot(&self) -> Result<Option<String>> {
        match &self.options.output {
            #[cfg(feature = "draws")]
            DrawOutput::Svg(path) => self.plot_svg(path).map(|_| None),
            #[cfg(feature = "draws")]
            DrawOutput::Png(path) => self.plot_png(path).map(|_| None),
            DrawOutput::Inner => Ok(Some(self.plot_inner())),
        }
    }

    fn plot_inner(&self) -> String {
        let grid = render_equity_curve(self.result, self.options.width, self.options.height);
        match &self.options.title {
            Some(title) => format!("{title}\n{grid}"),
            None => grid,
        }
    }
}
