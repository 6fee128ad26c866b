//! SVG and PNG charts through `plotters`.

use chrono::{DateTime, Utc};
use plotters::backend::{BitMapBackend, DrawingBackend, SVGBackend};
use plotters::coord::Shift;
use plotters::prelude::*;

use super::Draw;
use crate::engine::Candle;
use crate::errors::{Error, Result};

/// Aspect ratio for the generated charts.
const ASPECT_RATIO: f64 = 0.5625;
/// Size of the X-axis labels.
const X_LABEL_SIZE: i32 = 20;
/// Size of the Y-axis labels.
const Y_LABEL_SIZE: i32 = 20;

fn plotters_err(e: impl std::fmt::Display) -> Error {
    Error::Plotters(e.to_string())
}

impl Draw<'_> {
    fn dimensions(&self) -> (u32, u32) {
        let mut height_factor = 1.0;
        if self.candles.is_some() {
            height_factor += 0.6;
        }
        if self.candles.is_some() && self.options.show_volume {
            height_factor += 0.3;
        }

        let points = self.result.equity_curve.len() as u32;
        let width = 1280.max(10 * points);
        let height = ((width as f64 * ASPECT_RATIO * height_factor) as u32).min(1200);
        (width, height)
    }

    fn title(&self) -> String {
        self.options
            .title
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.result.config.symbol, self.result.config.strategy))
    }

    /// Saves the chart as an SVG file.
    pub(super) fn plot_svg(&self, path: &str) -> Result<()> {
        let root = SVGBackend::new(path, self.dimensions()).into_drawing_area();
        root.fill(&WHITE).map_err(plotters_err)?;
        self.draw_chart(&root)
    }

    /// Saves the chart as a PNG file.
    pub(super) fn plot_png(&self, path: &str) -> Result<()> {
        let root = BitMapBackend::new(path, self.dimensions()).into_drawing_area();
        root.fill(&WHITE).map_err(plotters_err)?;
        self.draw_chart(&root)
    }

    /// Draws the equity panel, with the price and volume panels above it when candles are set.
    fn draw_chart<DB: DrawingBackend>(&self, drawing_area: &DrawingArea<DB, Shift>) -> Result<()> {
        if self.result.equity_curve.is_empty() {
            return Err(Error::InsufficientData { required: 1, got: 0 });
        }

        let title = self.title();
        match self.candles {
            Some(candles) => {
                let total_height = drawing_area.dim_in_pixel().1 as f64;
                let (price_area, rest_area) = drawing_area.split_vertically((total_height * 0.5) as u32);
                self.draw_price_chart(&price_area, candles, &title)?;

                if self.options.show_volume {
                    let (volume_area, equity_area) = rest_area.split_vertically((total_height * 0.15) as u32);
                    self.draw_volume_chart(&volume_area, candles)?;
                    self.draw_equity_chart(&equity_area, None)?;
                } else {
                    self.draw_equity_chart(&rest_area, None)?;
                }
            }
            None => self.draw_equity_chart(drawing_area, Some(&title))?,
        }

        drawing_area.present().map_err(plotters_err)
    }

    /// Time span of the chart: the simulated bars only, at least one bar wide.
    fn time_range(&self) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let curve = &self.result.equity_curve;
        match (curve.first(), curve.last()) {
            (Some(first), Some(last)) if first.timestamp < last.timestamp => Ok((first.timestamp, last.timestamp)),
            (Some(first), Some(_)) => Ok((first.timestamp, first.timestamp + self.result.config.timeframe.duration())),
            _ => Err(Error::InsufficientData { required: 1, got: 0 }),
        }
    }

    /// Draws the price chart (candlesticks) with the trade entries and exits.
    fn draw_price_chart<DB: DrawingBackend>(
        &self,
        drawing_area: &DrawingArea<DB, Shift>,
        candles: &[Candle],
        title: &str,
    ) -> Result<()> {
        let (first_time, last_time) = self.time_range()?;
        let candles = candles
            .iter()
            .filter(|c| c.timestamp() >= first_time && c.timestamp() <= last_time)
            .collect::<Vec<_>>();
        if candles.is_empty() {
            return Err(Error::InsufficientData { required: 1, got: 0 });
        }
        let min_price = candles.iter().map(|c| c.low()).fold(f64::INFINITY, f64::min);
        let max_price = candles.iter().map(|c| c.high()).fold(f64::NEG_INFINITY, f64::max);
        let price_padding = (max_price - min_price).max(1.0) * 0.1;

        let drawing_area = drawing_area.margin(10, 0, 70, 70);
        let mut chart = ChartBuilder::on(&drawing_area)
            .caption(title, ("sans-serif", 30).into_font())
            .y_label_area_size(Y_LABEL_SIZE)
            .build_cartesian_2d(
                first_time..last_time,
                min_price - price_padding..max_price + price_padding,
            )
            .map_err(plotters_err)?;

        chart
            .configure_mesh()
            .y_desc("Price")
            .y_label_style(("sans-serif", Y_LABEL_SIZE))
            .y_labels(5)
            .disable_x_axis()
            .draw()
            .map_err(plotters_err)?;

        let candle_width = {
            let total_width = drawing_area.dim_in_pixel().0 as f64;
            let available_width = total_width - (X_LABEL_SIZE * 2) as f64;
            (available_width / candles.len().max(1) as f64).max(5.0) as u32
        };

        chart
            .draw_series(candles.iter().map(|c| {
                let color = if c.close() >= c.open() { GREEN.filled() } else { RED.filled() };
                CandleStick::new(c.timestamp(), c.open(), c.high(), c.low(), c.close(), color, color, candle_width)
            }))
            .map_err(plotters_err)?;

        let entries = self
            .result
            .trades
            .iter()
            .map(|t| Circle::new((t.entry_time, t.entry_price), 4, BLUE.filled()));
        let exits = self
            .result
            .trades
            .iter()
            .map(|t| Circle::new((t.exit_time, t.exit_price), 4, RED.filled()));
        chart.draw_series(entries).map_err(plotters_err)?;
        chart.draw_series(exits).map_err(plotters_err)?;

        Ok(())
    }

    /// Draws the volume chart.
    fn draw_volume_chart<DB: DrawingBackend>(
        &self,
        drawing_area: &DrawingArea<DB, Shift>,
        candles: &[Candle],
    ) -> Result<()> {
        let (first_time, last_time) = self.time_range()?;
        let bar = self.result.config.timeframe.duration();
        let candles = candles
            .iter()
            .filter(|c| c.timestamp() >= first_time && c.timestamp() <= last_time)
            .collect::<Vec<_>>();
        let max_volume = candles.iter().map(|c| c.volume()).fold(0.0, f64::max);
        let volume_padding = max_volume.max(1.0) * 0.1;
        let drawing_area = drawing_area.margin(0, 0, 70, 70);

        let mut chart = ChartBuilder::on(&drawing_area)
            .y_label_area_size(Y_LABEL_SIZE)
            .build_cartesian_2d(first_time..last_time, 0.0..max_volume + volume_padding)
            .map_err(plotters_err)?;

        chart
            .configure_mesh()
            .y_desc("Volume")
            .y_label_style(("sans-serif", Y_LABEL_SIZE))
            .y_labels(3)
            .disable_x_axis()
            .draw()
            .map_err(plotters_err)?;

        chart
            .draw_series(candles.iter().map(|c| {
                let color = if c.close() >= c.open() { GREEN.mix(0.3) } else { RED.mix(0.3) };
                Rectangle::new([(c.timestamp(), 0.0), (c.timestamp() + bar, c.volume())], color.filled())
            }))
            .map(|_| ())
            .map_err(plotters_err)
    }

    /// Draws the equity curve, blue above the initial capital and red below.
    fn draw_equity_chart<DB: DrawingBackend>(
        &self,
        drawing_area: &DrawingArea<DB, Shift>,
        title: Option<&str>,
    ) -> Result<()> {
        let (first_time, last_time) = self.time_range()?;
        let curve = &self.result.equity_curve;
        let initial_capital = self.result.config.initial_capital;
        let min_equity = curve.iter().map(|p| p.equity).fold(initial_capital, f64::min);
        let max_equity = curve.iter().map(|p| p.equity).fold(initial_capital, f64::max);
        let padding = (max_equity - min_equity).max(1.0) * 0.05;
        let x_labels = (curve.len() / 15).max(2);

        let drawing_area = drawing_area.margin(10, 10, 70, 70);
        let mut builder = ChartBuilder::on(&drawing_area);
        if let Some(title) = title {
            builder.caption(title, ("sans-serif", 30).into_font());
        }
        let mut chart = builder
            .x_label_area_size(X_LABEL_SIZE)
            .y_label_area_size(Y_LABEL_SIZE)
            .build_cartesian_2d(first_time..last_time, min_equity - padding..max_equity + padding)
            .map_err(plotters_err)?;

        chart
            .configure_mesh()
            .x_desc("Time")
            .y_desc("Equity")
            .x_label_style(("sans-serif", X_LABEL_SIZE))
            .y_label_style(("sans-serif", Y_LABEL_SIZE))
            .x_labels(x_labels)
            .y_labels(5)
            .draw()
            .map_err(plotters_err)?;

        chart
            .draw_series(LineSeries::new(
                [(first_time, initial_capital), (last_time, initial_capital)],
                BLACK.mix(0.3),
            ))
            .map_err(plotters_err)?;

        let above = curve
            .iter()
            .filter(|p| p.equity >= initial_capital)
            .map(|p| Circle::new((p.timestamp, p.equity), 2, BLUE.filled()));
        let below = curve
            .iter()
            .filter(|p| p.equity < initial_capital)
            .map(|p| Circle::new((p.timestamp, p.equity), 2, RED.filled()));

        chart
            .draw_series(LineSeries::new(curve.iter().map(|p| (p.timestamp, p.equity)), BLUE.mix(0.5)))
            .map_err(plotters_err)?;
        chart.draw_series(above).map_err(plotters_err)?;
        chart.draw_series(below).map_err(plotters_err)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::draws::{Draw, DrawOptions, DrawOutput};
    use crate::engine::BacktestResult;
    use crate::errors::Error;
    use crate::prelude::*;

    use chrono::{DateTime, Duration};

    fn result(points: usize) -> BacktestResult {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let config = BacktestConfig::builder()
            .symbol("AAPL")
            .start(start)
            .end(start + Duration::days(365))
            .initial_capital(10_000.0)
            .build()
            .unwrap();
        BacktestResult {
            config,
            equity_curve: (0..points)
                .map(|i| EquityPoint {
                    timestamp: start + Duration::days(i as i64),
                    equity: 10_000.0 + (i as f64).sin() * 100.0,
                })
                .collect(),
            trades: vec![],
            metrics: Metrics::default(),
        }
    }

    #[test]
    fn svg_chart_is_written() {
        let path = std::env::temp_dir().join(format!("btsim-chart-{}.svg", std::process::id()));
        let path = path.to_string_lossy().to_string();
        let result = result(30);
        let output = Draw::with_result(&result)
            .with_options(DrawOptions::default().draw_output(DrawOutput::Svg(path.clone())))
            .plot()
            .unwrap();
        assert!(output.is_none());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn single_bar_run_is_charted() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let candles = (0..21)
            .map(|i| {
                CandleBuilder::builder()
                    .open(100.0)
                    .high(101.0)
                    .low(99.0)
                    .close(100.0)
                    .volume(500.0)
                    .timestamp(start + Duration::days(i))
                    .build()
                    .unwrap()
            })
            .collect::<Vec<_>>();
        let config = BacktestConfig::builder()
            .symbol("AAPL")
            .start(start)
            .end(start + Duration::days(30))
            .initial_capital(10_000.0)
            .build()
            .unwrap();
        let result = Backtest::new(config, candles.clone().into()).unwrap().run().unwrap();
        assert_eq!(result.equity_curve.len(), 1);

        let path = std::env::temp_dir().join(format!("btsim-single-bar-{}.svg", std::process::id()));
        let path = path.to_string_lossy().to_string();
        let output = Draw::with_result(&result)
            .with_candles(&candles)
            .with_options(
                DrawOptions::default()
                    .draw_output(DrawOutput::Svg(path.clone()))
                    .show_volume(true),
            )
            .plot()
            .unwrap();
        assert!(output.is_none());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn candles_outside_the_curve_are_rejected() {
        let result = result(5);
        let candle = CandleBuilder::builder()
            .open(1.0)
            .high(1.0)
            .low(1.0)
            .close(1.0)
            .timestamp(DateTime::from_timestamp(0, 0).unwrap())
            .build()
            .unwrap();
        let path = std::env::temp_dir().join("btsim-stray-candles.svg").to_string_lossy().to_string();
        let output = Draw::with_result(&result)
            .with_candles(std::slice::from_ref(&candle))
            .with_options(DrawOptions::default().draw_output(DrawOutput::Svg(path)))
            .plot();
        assert!(matches!(output, Err(Error::InsufficientData { .. })));
    }

    #[test]
    fn empty_curve_is_rejected() {
        let result = result(0);
        let path = std::env::temp_dir().join("btsim-empty-chart.svg").to_string_lossy().to_string();
        let output = Draw::with_result(&result)
            .with_options(DrawOptions::default().draw_output(DrawOutput::Svg(path)))
            .plot();
        assert!(matches!(output, Err(Error::InsufficientData { .. })));
    }
}
