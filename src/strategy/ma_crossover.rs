use crate::engine::Candle;
use crate::errors::ConfigError;

use super::indicators::sma;
use super::{Action, Signal, SignalGenerator, visible_closes};

const CONFIDENCE: u8 = 70;

/// Simple moving average crossover.
///
/// Buys when the short average crosses above the long one and sells on the opposite crossing.
/// A continuation without a crossing holds.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaCrossover {
    short: usize,
    long: usize,
}

impl Default for MaCrossover {
    fn default() -> Self {
        Self { short: 10, long: 20 }
    }
}

impl MaCrossover {
    /// Creates the strategy; `short` must be at least 1 and below `long`.
    pub fn new(short: usize, long: usize) -> Result<Self, ConfigError> {
        let strategy = Self { short, long };
        strategy.validate()?;
        Ok(strategy)
    }

    /// Returns the short period.
    pub fn short(&self) -> usize {
        self.short
    }

    /// Returns the long period.
    pub fn long(&self) -> usize {
        self.long
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.short == 0 || self.short >= self.long {
            return Err(ConfigError::InvalidStrategyParams(format!(
                "ma_crossover requires 1 <= short < long (got: short={}, long={})",
                self.short, self.long
            )));
        }
        Ok(())
    }
}

impl SignalGenerator for MaCrossover {
    fn name(&self) -> &'static str {
        "ma_crossover"
    }

    fn lookback(&self) -> usize {
        // previous bar needs a full long window
        self.long
    }

    fn signal(&self, window: &[Candle], index: usize) -> Signal {
        let Some(closes) = visible_closes(window, index, self.lookback(), self.long + 1) else {
            return Signal::hold();
        };
        let previous = &closes[..closes.len() - 1];

        let averages = (
            sma(&closes, self.short),
            sma(&closes, self.long),
            sma(previous, self.short),
            sma(previous, self.long),
        );
        let (Some(short_cur), Some(long_cur), Some(short_prev), Some(long_prev)) = averages else {
            return Signal::hold();
        };

        if short_prev <= long_prev && short_cur > long_cur {
            Signal::new(Action::Buy, CONFIDENCE)
        } else if short_prev >= long_prev && short_cur < long_cur {
            Signal::new(Action::Sell, CONFIDENCE)
        } else {
            Signal::hold()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::tests::candles_from_closes;

    #[test]
    fn rejects_inverted_periods() {
        assert!(MaCrossover::new(20, 10).is_err());
        assert!(MaCrossover::new(10, 10).is_err());
        assert!(MaCrossover::new(0, 10).is_err());
        assert!(MaCrossover::new(3, 10).is_ok());
    }

    #[test]
    fn insufficient_history_holds() {
        let candles = candles_from_closes(&[100.0; 20]);
        let strategy = MaCrossover::default();
        assert_eq!(strategy.signal(&candles, 19), Signal::hold());
    }

    #[test]
    fn crossing_up_buys_once() {
        let mut closes = vec![100.0; 25];
        closes.extend((1..=10).map(|i| 100.0 + i as f64));
        let candles = candles_from_closes(&closes);
        let strategy = MaCrossover::default();

        let signals = (0..candles.len())
            .map(|i| (i, strategy.signal(&candles, i)))
            .filter(|(_, s)| s.action != Action::Hold)
            .collect::<Vec<_>>();

        assert_eq!(signals, vec![(25, Signal::new(Action::Buy, 70))]);
    }

    #[test]
    fn crossing_down_sells() {
        let mut closes = vec![100.0; 25];
        closes.push(90.0);
        let candles = candles_from_closes(&closes);
        let strategy = MaCrossover::default();
        assert_eq!(strategy.signal(&candles, 25), Signal::new(Action::Sell, 70));
    }

    #[test]
    fn ignores_candles_after_index() {
        let mut closes = vec![100.0; 25];
        closes.push(120.0);
        let candles = candles_from_closes(&closes);
        let strategy = MaCrossover::default();
        assert_eq!(strategy.signal(&candles, 24), Signal::hold());
        assert_eq!(strategy.signal(&candles, 25).action, Action::Buy);
    }
}
