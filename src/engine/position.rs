use std::fmt;

use chrono::{DateTime, Utc};

/// Side of a position.
///
/// The engine only ever opens long positions; a sell signal while flat is ignored.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionSide {
    /// Bought, profits when the price rises.
    #[default]
    Long,
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
        }
    }
}

/// An open position.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    side: PositionSide,
    quantity: f64,
    entry_price: f64,
    entry_time: DateTime<Utc>,
    entry_index: usize,
}

impl Position {
    pub(crate) fn long(quantity: f64, entry_price: f64, entry_time: DateTime<Utc>, entry_index: usize) -> Self {
        Self {
            side: PositionSide::Long,
            quantity,
            entry_price,
            entry_time,
            entry_index,
        }
    }

    /// Returns the side.
    pub fn side(&self) -> PositionSide {
        self.side
    }

    /// Returns the number of units held.
    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    /// Returns the fill price at entry, slippage included.
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    /// Returns the time of the entry bar.
    pub fn entry_time(&self) -> DateTime<Utc> {
        self.entry_time
    }

    /// Returns the index of the entry bar.
    pub fn entry_index(&self) -> usize {
        self.entry_index
    }

    /// Returns the notional paid at entry (price * quantity).
    pub fn cost(&self) -> f64 {
        self.entry_price * self.quantity
    }

    /// Estimates the profit/loss of the position at `price`, fees excluded.
    pub fn estimate_pnl(&self, price: f64) -> f64 {
        match self.side {
            PositionSide::Long => self.quantity * (price - self.entry_price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_position_pnl() {
        let position = Position::long(10.0, 100.0, DateTime::default(), 0);
        assert_eq!(position.cost(), 1000.0);
        assert_eq!(position.estimate_pnl(110.0), 100.0);
        assert_eq!(position.estimate_pnl(90.0), -100.0);
    }

    #[test]
    fn side_label() {
        assert_eq!(PositionSide::Long.to_string(), "long");
    }
}
