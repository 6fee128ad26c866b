use crate::engine::Candle;
use crate::errors::ConfigError;

use super::indicators::rsi;
use super::{Action, Signal, SignalGenerator, visible_closes};

const CONFIDENCE: u8 = 65;

/// Oscillator mean reversion.
///
/// Buys when the oscillator leaves the oversold zone (crosses above `oversold`) and sells when
/// it leaves the overbought zone (crosses below `overbought`).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiReversion {
    period: usize,
    oversold: f64,
    overbought: f64,
}

impl Default for RsiReversion {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

impl RsiReversion {
    /// Creates the strategy; levels must satisfy `0 < oversold < overbought < 100`.
    pub fn new(period: usize, oversold: f64, overbought: f64) -> Result<Self, ConfigError> {
        let strategy = Self {
            period,
            oversold,
            overbought,
        };
        strategy.validate()?;
        Ok(strategy)
    }

    /// Returns the oscillator period.
    pub fn period(&self) -> usize {
        self.period
    }

    /// Returns the oversold level.
    pub fn oversold(&self) -> f64 {
        self.oversold
    }

    /// Returns the overbought level.
    pub fn overbought(&self) -> f64 {
        self.overbought
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.period == 0 {
            return Err(ConfigError::InvalidStrategyParams(
                "rsi requires a period of at least 1".to_string(),
            ));
        }
        let levels_ok = self.oversold > 0.0 && self.oversold < self.overbought && self.overbought < 100.0;
        if !levels_ok {
            return Err(ConfigError::InvalidStrategyParams(format!(
                "rsi requires 0 < oversold < overbought < 100 (got: oversold={}, overbought={})",
                self.oversold, self.overbought
            )));
        }
        Ok(())
    }
}

impl SignalGenerator for RsiReversion {
    fn name(&self) -> &'static str {
        "rsi"
    }

    fn lookback(&self) -> usize {
        self.period + 1
    }

    fn signal(&self, window: &[Candle], index: usize) -> Signal {
        let Some(closes) = visible_closes(window, index, self.lookback(), self.period + 2) else {
            return Signal::hold();
        };
        let previous = &closes[..closes.len() - 1];

        let (Some(current), Some(previous)) = (rsi(&closes, self.period), rsi(previous, self.period)) else {
            return Signal::hold();
        };

        if previous <= self.oversold && current > self.oversold {
            Signal::new(Action::Buy, CONFIDENCE)
        } else if previous >= self.overbought && current < self.overbought {
            Signal::new(Action::Sell, CONFIDENCE)
        } else {
            Signal::hold()
        }
    }
}
