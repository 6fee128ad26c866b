//! Core simulation components.
//!
//! This module provides the fundamental types for backtesting:
//! - `Candle`: OHLCV data for backtesting.
//! - `BacktestConfig`: symbol, dates, capital, strategy and friction costs.
//! - `SimulationState`: the flat/long position and capital state machine.
//! - `BacktestTrade` and `EquityPoint`: what a run emits.
//! - `Backtest`: the bar-by-bar run loop.

mod candle;
mod config;
mod position;
mod state;
mod trade;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::data::CandleSource;
use crate::errors::{Error, Result};
use crate::metrics::Metrics;
use crate::strategy::SignalGenerator;

pub use candle::*;
pub use config::*;
pub use position::*;
pub use state::*;
pub use trade::*;

/// Bars skipped before the first signal is evaluated. Also the minimum candle count.
pub const WARMUP_BARS: usize = 20;

/// Cooperative cancellation flag, checked once per simulated bar.
///
/// Clones share the same flag, so one handle can stop several runs.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates a flag that is not raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once the flag has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of a finished run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    /// Configuration the run used.
    pub config: BacktestConfig,
    /// One point per simulated bar, after the warm-up.
    pub equity_curve: Vec<EquityPoint>,
    /// Completed trades in closing order.
    pub trades: Vec<BacktestTrade>,
    /// Aggregate performance statistics.
    pub metrics: Metrics,
}

impl BacktestResult {
    /// Returns the equity after the last bar, or the initial capital for an empty curve.
    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.config.initial_capital)
    }
}

/// Backtesting engine for a single strategy over a single symbol.
#[derive(Debug, Clone)]
pub struct Backtest {
    config: BacktestConfig,
    data: Arc<[Candle]>,
}

impl Backtest {
    /// Creates a new backtest from already loaded candles.
    ///
    /// ### Arguments
    /// * `config` - Run configuration, validated first.
    /// * `data` - Candles ordered by ascending time; at least [`WARMUP_BARS`] of them.
    ///
    /// ### Returns
    /// The new backtest instance or an error.
    ///
    /// ### Example
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use btsim::prelude::*;
    /// use chrono::{DateTime, Duration};
    ///
    /// let start = DateTime::default();
    /// let candles = (0..60)
    ///     .map(|i| {
    ///         let close = 100.0 + (i as f64 * 0.3).sin() * 5.0;
    ///         CandleBuilder::builder()
    ///             .open(close)
    ///             .high(close + 1.0)
    ///             .low(close - 1.0)
    ///             .close(close)
    ///             .volume(1_000.0)
    ///             .timestamp(start + Duration::days(i))
    ///             .build()
    ///             .unwrap()
    ///     })
    ///     .collect::<Vec<_>>();
    ///
    /// let config = BacktestConfig::builder()
    ///     .symbol("AAPL")
    ///     .start(start)
    ///     .end(start + Duration::days(60))
    ///     .initial_capital(10_000.0)
    ///     .build()
    ///     .unwrap();
    ///
    /// let result = Backtest::new(config, Arc::from(candles)).unwrap().run().unwrap();
    /// assert_eq!(result.equity_curve.len(), 60 - WARMUP_BARS);
    /// ```
    pub fn new(config: BacktestConfig, data: Arc<[Candle]>) -> Result<Self> {
        config.validate()?;

        if data.len() < WARMUP_BARS {
            return Err(Error::InsufficientData {
                required: WARMUP_BARS,
                got: data.len(),
            });
        }

        Ok(Self { config, data })
    }

    /// Validates the configuration, then fetches the candles from `source`.
    ///
    /// A fetch failure is returned as [`Error::Data`] and never retried.
    pub fn from_source<S: CandleSource + ?Sized>(config: BacktestConfig, source: &S) -> Result<Self> {
        config.validate()?;

        let candles = source
            .get_candles(&config.symbol, config.timeframe, config.start, config.end)
            .map_err(|err| Error::Data {
                symbol: config.symbol.clone(),
                source: err,
            })?;

        Self::new(config, Arc::from(candles))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Returns an iterator over the data.
    pub fn candles(&self) -> std::slice::Iter<'_, Candle> {
        self.data.iter()
    }

    /// Runs the simulation to completion.
    pub fn run(&self) -> Result<BacktestResult> {
        self.run_with_cancel(&CancelFlag::new())
    }

    /// Runs the simulation, checking `cancel` once per bar.
    ///
    /// A cancelled run returns [`Error::Cancelled`] and no partial result.
    pub fn run_with_cancel(&self, cancel: &CancelFlag) -> Result<BacktestResult> {
        let config = &self.config;
        let strategy = &config.strategy;
        let friction = Friction {
            slippage: config.slippage,
            commission: config.commission,
        };
        let candles = &self.data[..];
        let last = candles.len() - 1;

        info!(
            symbol = %config.symbol,
            strategy = %strategy,
            bars = candles.len(),
            capital = config.initial_capital,
            "starting backtest"
        );

        let mut state = SimulationState::new(config.initial_capital)?;
        let mut equity_curve = Vec::with_capacity(candles.len() - WARMUP_BARS);
        let mut trades = Vec::new();
        let signals = strategy.signals(candles);

        for (index, candle) in candles.iter().enumerate().skip(WARMUP_BARS) {
            if cancel.is_cancelled() {
                warn!(symbol = %config.symbol, bar = index, "backtest cancelled");
                return Err(Error::Cancelled { bar: index });
            }

            let (next, trade) = state.apply(signals[index].action, candle, index, &config.symbol, &friction);
            state = next;
            trades.extend(trade);

            if index == last {
                let (next, trade) =
                    state.close_long(candle, index, &config.symbol, ExitReason::EndOfBacktest, &friction);
                state = next;
                trades.extend(trade);
            }

            let (next, equity) = state.mark_to_market(candle.close());
            state = next;
            equity_curve.push(EquityPoint {
                timestamp: candle.timestamp(),
                equity,
            });
        }

        let metrics = Metrics::compute(
            &trades,
            &equity_curve,
            config.initial_capital,
            state.max_drawdown(),
            state.fees_paid(),
        );

        info!(
            symbol = %config.symbol,
            trades = trades.len(),
            final_equity = state.capital(),
            total_return = metrics.total_return,
            "backtest finished"
        );

        Ok(BacktestResult {
            config: config.clone(),
            equity_curve,
            trades,
            metrics,
        })
    }
}

/// Validates `config`, fetches its candles from `source` and runs the backtest.
pub fn run<S: CandleSource + ?Sized>(config: BacktestConfig, source: &S) -> Result<BacktestResult> {
    Backtest::from_source(config, source)?.run()
}
