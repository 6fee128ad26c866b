use crate::engine::Candle;
use crate::errors::ConfigError;

use super::indicators::ema_series;
use super::{Action, Signal, SignalGenerator, visible_closes};

const CONFIDENCE: u8 = 75;

/// Trend momentum: the fast-minus-slow exponential spread against its own smoothed signal line.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacdCrossover {
    fast: usize,
    slow: usize,
    signal: usize,
}

impl Default for MacdCrossover {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

impl MacdCrossover {
    /// Creates the strategy; `fast` must be below `slow` and every period at least 1.
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, ConfigError> {
        let strategy = Self { fast, slow, signal };
        strategy.validate()?;
        Ok(strategy)
    }

    /// Returns the fast period.
    pub fn fast(&self) -> usize {
        self.fast
    }

    /// Returns the slow period.
    pub fn slow(&self) -> usize {
        self.slow
    }

    /// Returns the signal line period.
    pub fn signal_period(&self) -> usize {
        self.signal
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.fast == 0 || self.signal == 0 || self.fast >= self.slow {
            return Err(ConfigError::InvalidStrategyParams(format!(
                "macd requires 1 <= fast < slow and signal >= 1 (got: fast={}, slow={}, signal={})",
                self.fast, self.slow, self.signal
            )));
        }
        Ok(())
    }

    /// Spread and signal line over `closes`.
    fn lines(&self, closes: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let fast = ema_series(closes, self.fast);
        let slow = ema_series(closes, self.slow);
        let spread = fast.iter().zip(slow.iter()).map(|(f, s)| f - s).collect::<Vec<_>>();
        let signal = ema_series(&spread, self.signal);
        (spread, signal)
    }

    /// Compares the spread with its signal line at bar `i` and the bar before it.
    fn crossing(spread: &[f64], signal: &[f64], i: usize) -> Signal {
        let (spread_cur, spread_prev) = (spread[i], spread[i - 1]);
        let (signal_cur, signal_prev) = (signal[i], signal[i - 1]);

        if spread_prev <= signal_prev && spread_cur > signal_cur {
            Signal::new(Action::Buy, CONFIDENCE)
        } else if spread_prev >= signal_prev && spread_cur < signal_cur {
            Signal::new(Action::Sell, CONFIDENCE)
        } else {
            Signal::hold()
        }
    }
}

impl SignalGenerator for MacdCrossover {
    fn name(&self) -> &'static str {
        "macd"
    }

    fn lookback(&self) -> usize {
        self.slow + self.signal
    }

    fn signal(&self, window: &[Candle], index: usize) -> Signal {
        // the exponential averages are seeded on the first bar, so the whole history counts
        let Some(closes) = visible_closes(window, index, self.lookback(), usize::MAX) else {
            return Signal::hold();
        };
        let (spread, signal) = self.lines(&closes);
        Self::crossing(&spread, &signal, spread.len() - 1)
    }

    fn signals(&self, candles: &[Candle]) -> Vec<Signal> {
        let closes = candles.iter().map(Candle::close).collect::<Vec<_>>();
        let (spread, signal) = self.lines(&closes);
        (0..candles.len())
            .map(|index| {
                if index < self.lookback() {
                    Signal::hold()
                } else {
                    Self::crossing(&spread, &signal, index)
                }
            })
            .collect()
    }
}
