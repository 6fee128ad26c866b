use std::fmt;

use chrono::{DateTime, Utc};

use super::PositionSide;

/// Why a position was closed.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// A sell signal arrived while long.
    SignalReversal,
    /// The position was still open at the final bar.
    EndOfBacktest,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignalReversal => write!(f, "signal_reversal"),
            Self::EndOfBacktest => write!(f, "end_of_backtest"),
        }
    }
}

/// A completed round trip. Created once when a position closes, never mutated.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestTrade {
    /// Time of the entry bar.
    pub entry_time: DateTime<Utc>,
    /// Time of the exit bar.
    pub exit_time: DateTime<Utc>,
    /// Traded symbol.
    pub symbol: String,
    /// Position side.
    pub side: PositionSide,
    /// Entry fill price, slippage included.
    pub entry_price: f64,
    /// Exit fill price, slippage included.
    pub exit_price: f64,
    /// Units traded, always positive.
    pub quantity: f64,
    /// Commission charged on the exit notional.
    pub commission: f64,
    /// Realized profit/loss: `quantity * (exit - entry) - commission`.
    pub pnl: f64,
    /// Price change between entry and exit, in percent.
    pub pnl_percent: f64,
    /// Why the position was closed.
    pub exit_reason: ExitReason,
    /// Number of bars between entry and exit.
    pub bars_held: usize,
}

impl BacktestTrade {
    /// Returns `true` when the trade made money.
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    /// Returns `true` when the trade lost money.
    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }
}

/// Mark-to-market equity at the close of a simulated bar.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    /// Bar time.
    pub timestamp: DateTime<Utc>,
    /// Cash plus the open position valued at the bar close.
    pub equity: f64,
}
