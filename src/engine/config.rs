use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};

use crate::errors::ConfigError;
use crate::strategy::Strategy;

/// Default adverse price adjustment per fill (0.1%).
pub const DEFAULT_SLIPPAGE: f64 = 0.001;
/// Default commission charged on each fill's notional (0.1%).
pub const DEFAULT_COMMISSION: f64 = 0.001;
/// Largest accepted commission fraction.
pub const MAX_COMMISSION: f64 = 0.05;

/// Bar resolution requested from the candle source.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Timeframe {
    /// One minute bars.
    #[cfg_attr(feature = "serde", serde(rename = "1m"))]
    Minute,
    /// One hour bars.
    #[cfg_attr(feature = "serde", serde(rename = "1h"))]
    Hour,
    /// Four hour bars.
    #[cfg_attr(feature = "serde", serde(rename = "4h"))]
    FourHours,
    /// Daily bars.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "1d"))]
    Day,
    /// Weekly bars.
    #[cfg_attr(feature = "serde", serde(rename = "1w"))]
    Week,
}

impl Timeframe {
    /// Returns the duration of one bar.
    pub fn duration(&self) -> Duration {
        match self {
            Self::Minute => Duration::minutes(1),
            Self::Hour => Duration::hours(1),
            Self::FourHours => Duration::hours(4),
            Self::Day => Duration::days(1),
            Self::Week => Duration::weeks(1),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Minute => "1m",
            Self::Hour => "1h",
            Self::FourHours => "4h",
            Self::Day => "1d",
            Self::Week => "1w",
        };
        write!(f, "{label}")
    }
}

impl FromStr for Timeframe {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Self::Minute),
            "1h" => Ok(Self::Hour),
            "4h" => Ok(Self::FourHours),
            "1d" => Ok(Self::Day),
            "1w" => Ok(Self::Week),
            other => Err(ConfigError::UnknownTimeframe(other.to_string())),
        }
    }
}

/// Parameters of a single backtest run.
///
/// Build it with [`BacktestConfig::builder`]; it is validated once before the run starts.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    /// Traded symbol.
    pub symbol: String,
    /// Bar resolution.
    #[cfg_attr(feature = "serde", serde(default))]
    pub timeframe: Timeframe,
    /// First requested bar time.
    pub start: DateTime<Utc>,
    /// Last requested bar time, strictly after `start`.
    pub end: DateTime<Utc>,
    /// Starting cash.
    pub initial_capital: f64,
    /// Strategy and its parameters.
    #[cfg_attr(feature = "serde", serde(default))]
    pub strategy: Strategy,
    /// Adverse price adjustment per fill, as a fraction.
    #[cfg_attr(feature = "serde", serde(default = "default_slippage"))]
    pub slippage: f64,
    /// Commission per fill on the notional, as a fraction.
    #[cfg_attr(feature = "serde", serde(default = "default_commission"))]
    pub commission: f64,
}

#[cfg(feature = "serde")]
fn default_slippage() -> f64 {
    DEFAULT_SLIPPAGE
}

#[cfg(feature = "serde")]
fn default_commission() -> f64 {
    DEFAULT_COMMISSION
}

impl BacktestConfig {
    /// Starts a builder with default slippage, commission and strategy.
    ///
    /// ### Example
    /// ```rust
    /// use btsim::prelude::*;
    /// use chrono::{DateTime, Duration};
    ///
    /// let start = DateTime::default();
    /// let config = BacktestConfig::builder()
    ///     .symbol("AAPL")
    ///     .start(start)
    ///     .end(start + Duration::days(365))
    ///     .initial_capital(100_000.0)
    ///     .strategy(Strategy::TrendMomentum(MacdCrossover::default()))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.slippage, 0.001);
    /// ```
    pub fn builder() -> BacktestConfigBuilder {
        BacktestConfigBuilder::default()
    }

    /// Checks every field. Called before any data is fetched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        if self.end <= self.start {
            return Err(ConfigError::InvertedDates {
                start: self.start,
                end: self.end,
            });
        }
        if self.initial_capital <= 0.0 || !self.initial_capital.is_finite() {
            return Err(ConfigError::NegZeroCapital(self.initial_capital));
        }
        if !(0.0..1.0).contains(&self.slippage) {
            return Err(ConfigError::InvalidSlippage(self.slippage));
        }
        if !(0.0..=MAX_COMMISSION).contains(&self.commission) {
            return Err(ConfigError::InvalidCommission(self.commission));
        }
        self.strategy.validate()
    }

    /// Parses a JSON configuration and validates it.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> crate::errors::Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Builder for [`BacktestConfig`].
#[derive(Debug, Default)]
pub struct BacktestConfigBuilder {
    symbol: Option<String>,
    timeframe: Timeframe,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    initial_capital: Option<f64>,
    strategy: Strategy,
    slippage: Option<f64>,
    commission: Option<f64>,
}

impl BacktestConfigBuilder {
    /// Sets the symbol.
    pub fn symbol(mut self, symbol: impl ToString) -> Self {
        self.symbol = Some(symbol.to_string());
        self
    }

    /// Sets the timeframe. Defaults to daily bars.
    pub fn timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }

    /// Sets the start date.
    pub fn start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Sets the end date.
    pub fn end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Sets the starting cash.
    pub fn initial_capital(mut self, capital: f64) -> Self {
        self.initial_capital = Some(capital);
        self
    }

    /// Sets the strategy. Defaults to the moving average crossover.
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the slippage fraction.
    pub fn slippage(mut self, slippage: f64) -> Self {
        self.slippage = Some(slippage);
        self
    }

    /// Sets the commission fraction.
    pub fn commission(mut self, commission: f64) -> Self {
        self.commission = Some(commission);
        self
    }

    /// Validates and builds the configuration.
    ///
    /// A missing date is reported as [`ConfigError::InvertedDates`] at the Unix epoch.
    pub fn build(self) -> Result<BacktestConfig, ConfigError> {
        let start = self.start.unwrap_or_default();
        let end = self.end.unwrap_or_default();
        let config = BacktestConfig {
            symbol: self.symbol.unwrap_or_default(),
            timeframe: self.timeframe,
            start,
            end,
            initial_capital: self.initial_capital.unwrap_or(0.0),
            strategy: self.strategy,
            slippage: self.slippage.unwrap_or(DEFAULT_SLIPPAGE),
            commission: self.commission.unwrap_or(DEFAULT_COMMISSION),
        };
        config.validate()?;
        Ok(config)
    }
}
