use chrono::{DateTime, Utc};

use crate::errors::{Error, Result};

/// A single OHLCV bar.
///
/// Candles are immutable once built. Build them with [`CandleBuilder`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl Candle {
    /// Returns the open time of the bar.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the open price.
    pub fn open(&self) -> f64 {
        self.open
    }

    /// Returns the highest price.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Returns the lowest price.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Returns the close price.
    pub fn close(&self) -> f64 {
        self.close
    }

    /// Returns the traded volume.
    pub fn volume(&self) -> f64 {
        self.volume
    }
}

/// Builder for [`Candle`].
///
/// ### Example
/// ```rust
/// use btsim::prelude::*;
/// use chrono::DateTime;
///
/// let candle = CandleBuilder::builder()
///     .open(100.0)
///     .high(110.0)
///     .low(95.0)
///     .close(105.0)
///     .volume(1.0)
///     .timestamp(DateTime::default())
///     .build()
///     .unwrap();
/// assert_eq!(candle.close(), 105.0);
/// ```
#[derive(Debug, Default)]
pub struct CandleBuilder {
    timestamp: Option<DateTime<Utc>>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

impl CandleBuilder {
    /// Starts a new builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets the open time.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the open price.
    pub fn open(mut self, open: f64) -> Self {
        self.open = Some(open);
        self
    }

    /// Sets the highest price.
    pub fn high(mut self, high: f64) -> Self {
        self.high = Some(high);
        self
    }

    /// Sets the lowest price.
    pub fn low(mut self, low: f64) -> Self {
        self.low = Some(low);
        self
    }

    /// Sets the close price.
    pub fn close(mut self, close: f64) -> Self {
        self.close = Some(close);
        self
    }

    /// Sets the volume. Defaults to `0.0`.
    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Validates the fields and builds the candle.
    pub fn build(self) -> Result<Candle> {
        let timestamp = self
            .timestamp
            .ok_or_else(|| Error::InvalidCandle("missing timestamp".to_string()))?;
        let open = self.open.ok_or_else(|| Error::InvalidCandle("missing open".to_string()))?;
        let high = self.high.ok_or_else(|| Error::InvalidCandle("missing high".to_string()))?;
        let low = self.low.ok_or_else(|| Error::InvalidCandle("missing low".to_string()))?;
        let close = self.close.ok_or_else(|| Error::InvalidCandle("missing close".to_string()))?;
        let volume = self.volume.unwrap_or(0.0);

        for (name, price) in [("open", open), ("high", high), ("low", low), ("close", close)] {
            if price <= 0.0 || !price.is_finite() {
                return Err(Error::InvalidCandle(format!("{name} must be positive (got: {price})")));
            }
        }
        if high < low {
            return Err(Error::InvalidCandle(format!("high ({high}) is below low ({low})")));
        }
        if volume < 0.0 || !volume.is_finite() {
            return Err(Error::InvalidCandle(format!("volume must be non-negative (got: {volume})")));
        }

        Ok(Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> CandleBuilder {
        CandleBuilder::builder()
            .open(100.0)
            .high(110.0)
            .low(95.0)
            .close(105.0)
            .volume(1.0)
            .timestamp(DateTime::default())
    }

    #[test]
    fn build_valid_candle() {
        let candle = builder().build().unwrap();
        assert_eq!(candle.open(), 100.0);
        assert_eq!(candle.high(), 110.0);
        assert_eq!(candle.low(), 95.0);
        assert_eq!(candle.close(), 105.0);
        assert_eq!(candle.volume(), 1.0);
    }

    #[test]
    fn volume_defaults_to_zero() {
        let candle = CandleBuilder::builder()
            .open(1.0)
            .high(1.0)
            .low(1.0)
            .close(1.0)
            .timestamp(DateTime::default())
            .build()
            .unwrap();
        assert_eq!(candle.volume(), 0.0);
    }

    #[test]
    fn missing_field() {
        let result = CandleBuilder::builder().open(1.0).timestamp(DateTime::default()).build();
        assert!(matches!(result, Err(Error::InvalidCandle(_))));
    }

    #[test]
    fn non_positive_price() {
        assert!(matches!(builder().close(0.0).build(), Err(Error::InvalidCandle(_))));
        assert!(matches!(builder().open(f64::NAN).build(), Err(Error::InvalidCandle(_))));
    }

    #[test]
    fn high_below_low() {
        assert!(matches!(builder().high(90.0).build(), Err(Error::InvalidCandle(_))));
    }

    #[test]
    fn negative_volume() {
        assert!(matches!(builder().volume(-1.0).build(), Err(Error::InvalidCandle(_))));
    }
}
