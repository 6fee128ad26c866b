use chrono::{DateTime, Utc};

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the backtesting engine.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The configuration was rejected before any data was fetched.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The candle source failed. Never retried by the engine.
    #[error("Data unavailable for {symbol}: {source}")]
    Data {
        /// Symbol the data was requested for.
        symbol: String,
        /// Underlying source error.
        #[source]
        source: DataError,
    },

    /// Fewer candles than the warm-up period were supplied.
    #[error("Insufficient data: backtesting requires at least {required} candles (got: {got})")]
    InsufficientData {
        /// Minimum number of candles.
        required: usize,
        /// Number of candles received.
        got: usize,
    },

    /// A candle failed validation at construction.
    #[error("Invalid candle: {0}")]
    InvalidCandle(String),

    /// The run was aborted through its cancel flag. No result is produced.
    #[error("Backtest cancelled at bar {bar}")]
    Cancelled {
        /// Index of the bar at which the flag was observed.
        bar: usize,
    },

    /// Chart backend error.
    #[cfg(feature = "draws")]
    #[error("Plotters error: {0}")]
    Plotters(String),
}

/// Configuration errors, raised before any simulation starts.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The symbol is empty.
    #[error("symbol must not be empty")]
    EmptySymbol,

    /// The end date is not after the start date.
    #[error("end date ({end}) must be after start date ({start})")]
    InvertedDates {
        /// Requested start.
        start: DateTime<Utc>,
        /// Requested end.
        end: DateTime<Utc>,
    },

    /// The initial capital is not a positive finite number.
    #[error("initial capital must be positive (got: {0})")]
    NegZeroCapital(f64),

    /// The slippage fraction is outside `[0, 1)`.
    #[error("slippage must be within [0, 1) (got: {0})")]
    InvalidSlippage(f64),

    /// The commission fraction is outside `[0, 0.05]`.
    #[error("commission must be within [0, 0.05] (got: {0})")]
    InvalidCommission(f64),

    /// The strategy name is not one of the built-in strategies.
    #[error("unknown strategy `{0}`")]
    UnknownStrategy(String),

    /// The strategy parameters are inconsistent.
    #[error("invalid strategy parameters: {0}")]
    InvalidStrategyParams(String),

    /// The timeframe label is not recognised.
    #[error("unknown timeframe `{0}`")]
    UnknownTimeframe(String),

    /// The configuration document could not be parsed.
    #[error("malformed configuration: {0}")]
    Malformed(String),
}

/// Errors returned by a [`CandleSource`](crate::data::CandleSource).
#[derive(thiserror::Error, Debug)]
pub enum DataError {
    /// The source has no data for the request, or the upstream fetch failed.
    #[error("{0}")]
    Unavailable(String),

    /// I/O error while reading candles.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization error.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
