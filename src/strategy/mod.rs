//! Trading signal generation.
//!
//! A strategy maps the candles visible up to a bar (no look-ahead) to a [`Signal`].
//! Three strategies are built in, each with its own typed parameter struct:
//!
//! | Strategy | Parameters (defaults) | Confidence |
//! |----------|-----------------------|------------|
//! | [`MaCrossover`] | short = 10, long = 20 | 70 |
//! | [`RsiReversion`] | period = 14, oversold = 30, overbought = 70 | 65 |
//! | [`MacdCrossover`] | fast = 12, slow = 26, signal = 9 | 75 |
//!
//! Generators hold no mutable state, so the same strategy can be evaluated from several
//! threads at once.

pub mod indicators;
mod ma_crossover;
mod macd;
mod rsi;

use std::collections::BTreeMap;
use std::fmt;

use crate::engine::Candle;
use crate::errors::ConfigError;

pub use ma_crossover::*;
pub use macd::*;
pub use rsi::*;

/// Action requested by a strategy for the current bar.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Open a long position.
    Buy,
    /// Close the long position.
    Sell,
    /// Do nothing.
    #[default]
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
            Self::Hold => write!(f, "HOLD"),
        }
    }
}

/// A trading signal with a confidence in `[0, 100]`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signal {
    /// Requested action.
    pub action: Action,
    /// Confidence, 0 for [`Action::Hold`].
    pub confidence: u8,
}

impl Signal {
    /// Builds a signal, clamping the confidence to 100.
    pub fn new(action: Action, confidence: u8) -> Self {
        Self {
            action,
            confidence: confidence.min(100),
        }
    }

    /// The neutral signal: hold with zero confidence.
    pub fn hold() -> Self {
        Self::default()
    }
}

/// Capability shared by every strategy.
pub trait SignalGenerator: Send + Sync {
    /// Short name of the strategy.
    fn name(&self) -> &'static str;

    /// Minimum bar index at which a signal can be produced.
    fn lookback(&self) -> usize;

    /// Computes the signal at `index`.
    ///
    /// `window` holds the candles up to and including `index`; anything after `index` is
    /// ignored. Returns [`Signal::hold`] while the history is shorter than the lookback.
    fn signal(&self, window: &[Candle], index: usize) -> Signal;

    /// Computes the signal of every bar of `candles`.
    ///
    /// Entry `i` equals `self.signal(&candles[..=i], i)`. Generators whose indicators carry over
    /// from bar to bar override this to walk the history once.
    fn signals(&self, candles: &[Candle]) -> Vec<Signal> {
        (0..candles.len())
            .map(|index| self.signal(&candles[..=index], index))
            .collect()
    }
}

/// The last `tail` closes of `window[..=index]`, or `None` when `index` is out of range or
/// below `lookback`.
fn visible_closes(window: &[Candle], index: usize, lookback: usize, tail: usize) -> Option<Vec<f64>> {
    if index >= window.len() || index < lookback {
        return None;
    }
    let first = (index + 1).saturating_sub(tail);
    Some(window[first..=index].iter().map(Candle::close).collect())
}

/// Reads an integer period from a loosely typed parameter map.
fn period_param(params: &BTreeMap<String, f64>, key: &str, default: usize) -> Result<usize, ConfigError> {
    match params.get(key) {
        None => Ok(default),
        Some(&value) if value.is_finite() && value >= 1.0 && value.fract() == 0.0 => Ok(value as usize),
        Some(&value) => Err(ConfigError::InvalidStrategyParams(format!(
            "`{key}` must be a positive integer (got: {value})"
        ))),
    }
}

/// Reads a level from a loosely typed parameter map.
fn level_param(params: &BTreeMap<String, f64>, key: &str, default: f64) -> Result<f64, ConfigError> {
    match params.get(key) {
        None => Ok(default),
        Some(&value) if value.is_finite() => Ok(value),
        Some(&value) => Err(ConfigError::InvalidStrategyParams(format!(
            "`{key}` must be finite (got: {value})"
        ))),
    }
}

/// A built-in strategy with its parameters.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    /// Short/long simple moving average crossover.
    #[cfg_attr(feature = "serde", serde(rename = "ma_crossover"))]
    MovingAverageCrossover(MaCrossover),
    /// Oversold/overbought oscillator mean reversion.
    #[cfg_attr(feature = "serde", serde(rename = "rsi"))]
    MeanReversion(RsiReversion),
    /// Fast/slow exponential spread against its signal line.
    #[cfg_attr(feature = "serde", serde(rename = "macd"))]
    TrendMomentum(MacdCrossover),
}

impl Default for Strategy {
    fn default() -> Self {
        Self::MovingAverageCrossover(MaCrossover::default())
    }
}

impl Strategy {
    /// Builds a strategy from its name and an optional parameter map.
    ///
    /// Missing parameters take their defaults. The map is read once; the returned strategy is
    /// fully validated.
    ///
    /// ### Example
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use btsim::prelude::*;
    ///
    /// let params = BTreeMap::from([("short".to_string(), 5.0)]);
    /// let strategy = Strategy::from_params("ma_crossover", &params).unwrap();
    /// assert_eq!(strategy, Strategy::MovingAverageCrossover(MaCrossover::new(5, 20).unwrap()));
    /// ```
    pub fn from_params(name: &str, params: &BTreeMap<String, f64>) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ma_crossover" | "sma_crossover" | "moving_average_crossover" => {
                let defaults = MaCrossover::default();
                let short = period_param(params, "short", defaults.short())?;
                let long = period_param(params, "long", defaults.long())?;
                Ok(Self::MovingAverageCrossover(MaCrossover::new(short, long)?))
            }
            "rsi" | "mean_reversion" | "rsi_reversion" => {
                let defaults = RsiReversion::default();
                let period = period_param(params, "period", defaults.period())?;
                let oversold = level_param(params, "oversold", defaults.oversold())?;
                let overbought = level_param(params, "overbought", defaults.overbought())?;
                Ok(Self::MeanReversion(RsiReversion::new(period, oversold, overbought)?))
            }
            "macd" | "trend_momentum" | "macd_crossover" => {
                let defaults = MacdCrossover::default();
                let fast = period_param(params, "fast", defaults.fast())?;
                let slow = period_param(params, "slow", defaults.slow())?;
                let signal = period_param(params, "signal", defaults.signal_period())?;
                Ok(Self::TrendMomentum(MacdCrossover::new(fast, slow, signal)?))
            }
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }

    /// Re-checks the parameters, e.g. after deserialization.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::MovingAverageCrossover(s) => s.validate(),
            Self::MeanReversion(s) => s.validate(),
            Self::TrendMomentum(s) => s.validate(),
        }
    }

    fn generator(&self) -> &dyn SignalGenerator {
        match self {
            Self::MovingAverageCrossover(s) => s,
            Self::MeanReversion(s) => s,
            Self::TrendMomentum(s) => s,
        }
    }
}

impl SignalGenerator for Strategy {
    fn name(&self) -> &'static str {
        self.generator().name()
    }

    fn lookback(&self) -> usize {
        self.generator().lookback()
    }

    fn signal(&self, window: &[Candle], index: usize) -> Signal {
        self.generator().signal(window, index)
    }

    fn signals(&self, candles: &[Candle]) -> Vec<Signal> {
        self.generator().signals(candles)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MovingAverageCrossover(s) => write!(f, "ma_crossover({}, {})", s.short(), s.long()),
            Self::MeanReversion(s) => write!(f, "rsi({}, {}, {})", s.period(), s.oversold(), s.overbought()),
            Self::TrendMomentum(s) => write!(f, "macd({}, {}, {})", s.fast(), s.slow(), s.signal_period()),
        }
    }
}
