//! Candle sources.
//!
//! The engine never fetches prices itself: it asks a [`CandleSource`] once, before the run,
//! and fails the run if the source fails.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::engine::{Candle, Timeframe};
use crate::errors::DataError;

/// Provider of historical candles.
pub trait CandleSource {
    /// Returns the candles of `symbol` between `start` and `end` (inclusive), oldest first.
    fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, DataError>;
}

/// Candles kept in memory, keyed by symbol and timeframe.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    series: BTreeMap<(String, String), Vec<Candle>>,
}

impl MemorySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the series of `symbol` at `timeframe`. Candles are sorted by time.
    pub fn with_series(mut self, symbol: impl ToString, timeframe: Timeframe, mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp());
        self.series.insert((symbol.to_string(), timeframe.to_string()), candles);
        self
    }
}

impl CandleSource for MemorySource {
    fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, DataError> {
        let series = self
            .series
            .get(&(symbol.to_string(), timeframe.to_string()))
            .ok_or_else(|| DataError::Unavailable(format!("no {timeframe} series for {symbol}")))?;

        Ok(series
            .iter()
            .filter(|c| c.timestamp() >= start && c.timestamp() <= end)
            .copied()
            .collect())
    }
}

#[cfg(feature = "serde")]
pub use json::*;

#[cfg(feature = "serde")]
mod json {
    use std::fs::File;
    use std::io::BufReader;
    use std::path::PathBuf;

    use chrono::{DateTime, Utc};
    use chrono::serde::ts_milliseconds;
    use serde::Deserialize;

    use super::CandleSource;
    use crate::engine::{Candle, CandleBuilder, Timeframe};
    use crate::errors::DataError;

    // "open_time": 1759813200000,
    // "open_price": 124499.99,
    // "high_price": 124640.76,
    // "low_price": 124240.37,
    // "close_price": 124414.17,
    // "volume": 424.20697,
    // "close_time": 1759816799999,
    #[derive(Debug, Clone, Deserialize)]
    struct Kline {
        #[serde(with = "ts_milliseconds")]
        open_time: DateTime<Utc>,
        #[serde(alias = "open_price")]
        open: f64,
        #[serde(alias = "high_price")]
        high: f64,
        #[serde(alias = "low_price")]
        low: f64,
        #[serde(alias = "close_price")]
        close: f64,
        #[serde(default)]
        volume: f64,
    }

    impl TryFrom<Kline> for Candle {
        type Error = DataError;

        fn try_from(kline: Kline) -> Result<Self, Self::Error> {
            CandleBuilder::builder()
                .timestamp(kline.open_time)
                .open(kline.open)
                .high(kline.high)
                .low(kline.low)
                .close(kline.close)
                .volume(kline.volume)
                .build()
                .map_err(|e| DataError::Unavailable(e.to_string()))
        }
    }

    /// Reads klines from JSON files laid out as `<dir>/<symbol>_<timeframe>.json`.
    ///
    /// Each file holds an array of objects with a millisecond `open_time` and the
    /// `open`/`high`/`low`/`close` prices (`*_price` names are accepted too).
    #[derive(Debug, Clone)]
    pub struct JsonFileSource {
        dir: PathBuf,
    }

    impl JsonFileSource {
        /// Creates a source rooted at `dir`.
        pub fn new(dir: impl Into<PathBuf>) -> Self {
            Self { dir: dir.into() }
        }

        /// Path of the file holding `symbol` at `timeframe`.
        pub fn path(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
            self.dir.join(format!("{}_{}.json", symbol.to_lowercase(), timeframe))
        }
    }

    /// Reads every kline from `filepath` and returns the candles sorted by time.
    pub fn get_data_from_file(filepath: PathBuf) -> Result<Vec<Candle>, DataError> {
        let file = File::open(filepath)?;
        let reader = BufReader::new(file);
        let klines: Vec<Kline> = serde_json::from_reader(reader)?;
        let mut candles = klines.into_iter().map(Candle::try_from).collect::<Result<Vec<_>, _>>()?;
        candles.sort_by_key(|c| c.timestamp());
        Ok(candles)
    }

    impl CandleSource for JsonFileSource {
        fn get_candles(
            &self,
            symbol: &str,
            timeframe: Timeframe,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<Candle>, DataError> {
            let candles = get_data_from_file(self.path(symbol, timeframe))?;
            Ok(candles
                .into_iter()
                .filter(|c| c.timestamp() >= start && c.timestamp() <= end)
                .collect())
        }
    }
}
