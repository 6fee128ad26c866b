//! # btsim
//!
//! **btsim** is a deterministic, bar-by-bar backtesting engine for long-only trading strategies.
//! It replays historical candles through a strategy, simulates fills with slippage and
//! commission, and reports the equity curve, the completed trades and the usual performance
//! metrics.
//!
//! ## Key Features
//! - **Built-in Strategies**: Moving average crossover, RSI mean reversion and MACD momentum.
//! - **Realistic Fills**: Slippage on every execution and commission on every fill's notional.
//! - **No Look-Ahead**: A signal only ever sees the candles up to its own bar.
//! - **Deterministic**: The same configuration and candles always give the same result.
//! - **Parallel**: Compare strategies or sweep parameters on every core.
//!
//! ## Core Components
//! | Component   | Description                                                                                     |
//! |-------------|-------------------------------------------------------------------------------------------------|
//! | **`Candle`** | Represents OHLCV (Open, High, Low, Close, Volume) data for a single time period.               |
//! | **`BacktestConfig`** | Symbol, date range, capital, strategy, slippage and commission.                         |
//! | **`Strategy`** | Typed strategy with its parameters, producing one `Signal` per bar.                          |
//! | **`SimulationState`** | Flat/long position and capital state machine.                                         |
//! | **`Metrics`** | Calculates performance metrics: returns, drawdown, Sharpe ratio, win rate, and more.         |
//! | **`Optimizer`** | Runs strategies and parameter sweeps in parallel.                                          |
//! | **`Backtest`** | The engine that simulates strategy execution over historical data.                          |
//!
//! ## Simulation Rules
//! | Signal | Flat | Long |
//! |--------|------|------|
//! | **BUY** | Buy `floor(95% of capital / price)` units at close + slippage | Ignored |
//! | **SELL** | Ignored | Sell everything at close − slippage |
//! | **HOLD** | Ignored | Ignored |
//!
//! The first 20 bars are a warm-up and produce no signal. A position still open at the last
//! bar is closed there.
//!
//! ## Getting Started
//! ```rust
//! use btsim::prelude::*;
//! use chrono::{DateTime, Duration};
//!
//! fn main() -> Result<()> {
//!     let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
//!     let candles = (0..120)
//!         .map(|i| {
//!             let close = 100.0 + (i as f64 / 8.0).sin() * 10.0;
//!             CandleBuilder::builder()
//!                 .open(close)
//!                 .high(close * 1.01)
//!                 .low(close * 0.99)
//!                 .close(close)
//!                 .volume(1_000.0)
//!                 .timestamp(start + Duration::days(i))
//!                 .build()
//!         })
//!         .collect::<Result<Vec<_>>>()?;
//!
//!     let source = MemorySource::new().with_series("AAPL", Timeframe::Day, candles);
//!     let config = BacktestConfig::builder()
//!         .symbol("AAPL")
//!         .start(start)
//!         .end(start + Duration::days(120))
//!         .initial_capital(10_000.0)
//!         .strategy(Strategy::MovingAverageCrossover(MaCrossover::new(5, 15)?))
//!         .build()?;
//!
//!     let result = run(config, &source)?;
//!     assert_eq!(result.equity_curve.len(), 100);
//!     println!("{}", result.metrics);
//!     println!("{}", render_equity_curve(&result, 60, 10));
//!     Ok(())
//! }
//! ```
//!
//! ## Integrations
//! | Crate          | Purpose                                                                                     |
//! |----------------|---------------------------------------------------------------------------------------------|
//! | [`rayon`](https://crates.io/crates/rayon) | Parallel processing for optimization.                                           |
//! | [`serde`](https://crates.io/crates/serde) | Serialize/deserialize configurations and backtest results.                      |
//! | [`plotters`](https://crates.io/crates/plotters) | SVG and PNG charts of the equity curve and candles.                       |
//! | [`tracing`](https://crates.io/crates/tracing) | Run and trade events; install any subscriber to see them.                   |
//!
//! ## Error Handling
//! Configuration errors are reported before any data is fetched, data errors are reported
//! before the first bar, and a run either completes or returns an error with no partial result.
//!
//! ## License
//! MIT
#![warn(missing_docs)]

/// Core simulation components: candles, configuration, state machine and backtest loop.
pub mod engine;

/// Error types for the library.
pub mod errors;

/// Trading strategies and their indicators.
pub mod strategy;

/// Performance metrics: returns, drawdown, Sharpe ratio, win rate, etc.
pub mod metrics;

/// Historical candle sources.
pub mod data;

/// Ranking of several strategies' results.
pub mod comparison;

/// Text rendering of the equity curve, and png/svg charts with the `draws` feature.
pub mod draws;

/// Parallel runs and strategy parameter optimization.
#[cfg(feature = "optimizer")]
pub mod optimizer;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use super::*;
    pub use crate::comparison::*;
    pub use crate::data::*;
    pub use crate::draws::*;
    pub use crate::engine::*;
    pub use crate::errors::*;
    pub use crate::metrics::*;
    pub use crate::strategy::*;

    #[cfg(feature = "optimizer")]
    pub use crate::optimizer::*;
}

use std::ops::{Div, Mul, Sub};

/// Trait for performing percentage-based calculations.
pub trait PercentCalculus<Rhs = Self> {
    /// Calculates the percentage change between two values.
    ///
    /// ### Arguments
    /// * `new` - The new value to compare with.
    ///
    /// ### Returns
    /// The percentage change from the original value to the new value.
    fn change(self, new: Rhs) -> Self;
}

impl PercentCalculus for f64 {
    fn change(self, new: Self) -> Self {
        new.sub(self).div(self).mul(100.0)
    }
}

#[cfg(test)]
mod percent {
    use super::*;

    #[test]
    fn change() {
        assert_eq!(10.0, 100.0.change(110.0));
        assert_eq!(-50.0, 100.0.change(50.0));
    }
}
