use tracing::{debug, warn};

use crate::PercentCalculus;
use crate::errors::{ConfigError, Result};
use crate::strategy::Action;

use super::{BacktestTrade, Candle, ExitReason, Position};

/// Share of the available capital committed to a new position.
pub const POSITION_SIZING: f64 = 0.95;

/// Fill costs applied to every execution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Friction {
    /// Adverse price adjustment, as a fraction of the close.
    pub slippage: f64,
    /// Commission, as a fraction of the fill notional.
    pub commission: f64,
}

impl Friction {
    /// Fill price of a buy at `close`.
    pub fn buy_price(&self, close: f64) -> f64 {
        close * (1.0 + self.slippage)
    }

    /// Fill price of a sell at `close`.
    pub fn sell_price(&self, close: f64) -> f64 {
        close * (1.0 - self.slippage)
    }

    /// Commission due on `price * quantity`.
    pub fn commission_on(&self, price: f64, quantity: f64) -> f64 {
        price * quantity * self.commission
    }
}

/// Position and capital state machine of a single run.
///
/// The state is either flat (no position) or long. Transitions consume the state and return
/// the next one, so a run owns exactly one value at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    // Cash not tied up in the open position
    capital: f64,
    position: Option<Position>,
    // Highest mark-to-market equity seen so far
    peak_equity: f64,
    // Largest drawdown seen so far, as a fraction
    max_drawdown: f64,
    // Cumulative commissions
    fees: f64,
}

impl SimulationState {
    /// Creates a flat state with the given capital.
    /// Non-positive capital is rejected.
    pub fn new(initial_capital: f64) -> Result<Self> {
        if initial_capital <= 0.0 || !initial_capital.is_finite() {
            return Err(ConfigError::NegZeroCapital(initial_capital).into());
        }

        Ok(Self {
            capital: initial_capital,
            position: None,
            peak_equity: initial_capital,
            max_drawdown: 0.0,
            fees: 0.0,
        })
    }

    /// Returns the available cash.
    pub fn capital(&self) -> f64 {
        self.capital
    }

    /// Returns the open position, if any.
    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Returns the signed position size; never negative.
    pub fn position_size(&self) -> f64 {
        self.position.map(|p| p.quantity()).unwrap_or(0.0)
    }

    /// Returns `true` when no position is open.
    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    /// Returns the running peak equity.
    pub fn peak_equity(&self) -> f64 {
        self.peak_equity
    }

    /// Returns the running maximum drawdown, as a fraction.
    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }

    /// Returns the commissions paid so far.
    pub fn fees_paid(&self) -> f64 {
        self.fees
    }

    /// Mark-to-market equity at `close`: cash plus the open position valued at the close.
    pub fn equity(&self, close: f64) -> f64 {
        match &self.position {
            Some(position) => self.capital + position.cost() + position.estimate_pnl(close),
            None => self.capital,
        }
    }

    /// Applies a signal for the bar at `index`.
    ///
    /// | State | Buy | Sell | Hold |
    /// |-------|-----|------|------|
    /// | flat  | open long | no-op | no-op |
    /// | long  | no-op | close (`signal_reversal`) | no-op |
    pub fn apply(
        self,
        action: Action,
        candle: &Candle,
        index: usize,
        symbol: &str,
        friction: &Friction,
    ) -> (Self, Option<BacktestTrade>) {
        match (action, self.is_flat()) {
            (Action::Buy, true) => (self.open_long(candle, index, friction), None),
            (Action::Sell, false) => self.close_long(candle, index, symbol, ExitReason::SignalReversal, friction),
            _ => (self, None),
        }
    }

    /// Opens a long position at the candle close plus slippage.
    ///
    /// Buys as many whole units as [`POSITION_SIZING`] of the capital affords; stays flat when
    /// that is zero. Does nothing when a position is already open.
    pub fn open_long(mut self, candle: &Candle, index: usize, friction: &Friction) -> Self {
        if !self.is_flat() {
            return self;
        }

        let price = friction.buy_price(candle.close());
        let quantity = (POSITION_SIZING * self.capital / price).floor();
        if quantity <= 0.0 || !quantity.is_finite() {
            warn!(capital = self.capital, price, "buy signal ignored: cannot afford a single unit");
            return self;
        }

        let position = Position::long(quantity, price, candle.timestamp(), index);
        let commission = friction.commission_on(price, quantity);
        self.capital -= position.cost() + commission;
        self.fees += commission;
        self.position = Some(position);

        debug!(bar = index, price, quantity, commission, "opened long position");
        self
    }

    /// Closes the long position at the candle close minus slippage.
    ///
    /// Returns the completed trade, or `None` when already flat.
    pub fn close_long(
        mut self,
        candle: &Candle,
        index: usize,
        symbol: &str,
        reason: ExitReason,
        friction: &Friction,
    ) -> (Self, Option<BacktestTrade>) {
        let Some(position) = self.position.take() else {
            return (self, None);
        };

        let quantity = position.quantity();
        let entry_price = position.entry_price();
        let exit_price = friction.sell_price(candle.close());
        let commission = friction.commission_on(exit_price, quantity);
        let pnl = quantity * (exit_price - entry_price) - commission;

        self.capital += pnl + position.cost();
        self.fees += commission;

        let trade = BacktestTrade {
            entry_time: position.entry_time(),
            exit_time: candle.timestamp(),
            symbol: symbol.to_string(),
            side: position.side(),
            entry_price,
            exit_price,
            quantity,
            commission,
            pnl,
            pnl_percent: entry_price.change(exit_price),
            exit_reason: reason,
            bars_held: index.saturating_sub(position.entry_index()),
        };

        debug!(bar = index, exit_price, pnl, reason = %reason, "closed long position");
        (self, Some(trade))
    }

    /// Values the state at `close`, updating the peak and the maximum drawdown.
    ///
    /// Returns the new state and the mark-to-market equity.
    pub fn mark_to_market(mut self, close: f64) -> (Self, f64) {
        let equity = self.equity(close);
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        if self.peak_equity > 0.0 {
            let drawdown = (self.peak_equity - equity) / self.peak_equity;
            if drawdown > self.max_drawdown {
                self.max_drawdown = drawdown;
            }
        }
        (self, equity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CandleBuilder;
    use crate::errors::Error;

    use chrono::{DateTime, Duration};

    const FRICTION: Friction = Friction {
        slippage: 0.001,
        commission: 0.001,
    };

    fn candle(day: i64, close: f64) -> Candle {
        CandleBuilder::builder()
            .open(close)
            .high(close)
            .low(close)
            .close(close)
            .timestamp(DateTime::default() + Duration::days(day))
            .build()
            .unwrap()
    }

    #[test]
    fn new_state_valid_capital() {
        let state = SimulationState::new(1000.0).unwrap();
        assert_eq!(state.capital(), 1000.0);
        assert_eq!(state.peak_equity(), 1000.0);
        assert_eq!(state.position_size(), 0.0);
        assert!(state.is_flat());
    }

    #[test]
    fn new_state_invalid_capital() {
        assert!(matches!(
            SimulationState::new(0.0),
            Err(Error::Config(ConfigError::NegZeroCapital(_)))
        ));
        assert!(matches!(SimulationState::new(-10.0), Err(Error::Config(_))));
    }

    #[test]
    fn buy_while_flat_opens() {
        let state = SimulationState::new(10_000.0).unwrap();
        let (state, trade) = state.apply(Action::Buy, &candle(0, 100.0), 20, "AAPL", &FRICTION);
        assert!(trade.is_none());

        let price: f64 = 100.0 * 1.001;
        let quantity = (0.95 * 10_000.0 / price).floor();
        let position = state.position().unwrap();
        assert_eq!(position.entry_price(), price);
        assert_eq!(position.quantity(), quantity);
        assert_eq!(position.entry_index(), 20);

        let commission = price * quantity * 0.001;
        assert_eq!(state.capital(), 10_000.0 - (price * quantity + commission));
        assert_eq!(state.fees_paid(), commission);
    }

    #[test]
    fn buy_unaffordable_stays_flat() {
        let state = SimulationState::new(50.0).unwrap();
        let (state, trade) = state.apply(Action::Buy, &candle(0, 100.0), 20, "AAPL", &FRICTION);
        assert!(trade.is_none());
        assert!(state.is_flat());
        assert_eq!(state.capital(), 50.0);
    }

    #[test]
    fn buy_while_long_is_noop() {
        let state = SimulationState::new(10_000.0).unwrap();
        let (state, _) = state.apply(Action::Buy, &candle(0, 100.0), 20, "AAPL", &FRICTION);
        let before = state.clone();
        let (state, trade) = state.apply(Action::Buy, &candle(1, 90.0), 21, "AAPL", &FRICTION);
        assert!(trade.is_none());
        assert_eq!(state, before);
    }

    #[test]
    fn sell_while_flat_is_noop() {
        let state = SimulationState::new(10_000.0).unwrap();
        let (state, trade) = state.apply(Action::Sell, &candle(0, 100.0), 20, "AAPL", &FRICTION);
        assert!(trade.is_none());
        assert_eq!(state, SimulationState::new(10_000.0).unwrap());
    }

    #[test]
    fn hold_is_noop() {
        let state = SimulationState::new(10_000.0).unwrap();
        let (state, _) = state.apply(Action::Buy, &candle(0, 100.0), 20, "AAPL", &FRICTION);
        let before = state.clone();
        let (state, trade) = state.apply(Action::Hold, &candle(1, 150.0), 21, "AAPL", &FRICTION);
        assert!(trade.is_none());
        assert_eq!(state, before);
    }

    #[test]
    fn sell_while_long_closes() {
        let state = SimulationState::new(10_000.0).unwrap();
        let (state, _) = state.apply(Action::Buy, &candle(0, 100.0), 20, "AAPL", &FRICTION);
        let (state, trade) = state.apply(Action::Sell, &candle(3, 110.0), 23, "AAPL", &FRICTION);
        let trade = trade.unwrap();

        assert!(state.is_flat());
        assert_eq!(trade.symbol, "AAPL");
        assert_eq!(trade.exit_reason, ExitReason::SignalReversal);
        assert_eq!(trade.exit_price, 110.0 * 0.999);
        assert_eq!(trade.bars_held, 3);
        assert_eq!(trade.commission, trade.exit_price * trade.quantity * 0.001);
        assert_eq!(
            trade.pnl,
            trade.quantity * (trade.exit_price - trade.entry_price) - trade.commission
        );
        assert!(trade.is_win());
    }

    #[test]
    fn round_trip_capital_accounting() {
        let initial = 10_000.0;
        let state = SimulationState::new(initial).unwrap();
        let (state, _) = state.apply(Action::Buy, &candle(0, 100.0), 20, "AAPL", &FRICTION);
        let entry_fees = state.fees_paid();
        let (state, trade) = state.close_long(&candle(1, 95.0), 21, "AAPL", ExitReason::EndOfBacktest, &FRICTION);
        let trade = trade.unwrap();

        let expected = initial - entry_fees + trade.pnl;
        assert!((state.capital() - expected).abs() < 1e-9);
        assert!(trade.is_loss());
        assert_eq!(trade.exit_reason, ExitReason::EndOfBacktest);
    }

    #[test]
    fn close_while_flat_returns_nothing() {
        let state = SimulationState::new(10_000.0).unwrap();
        let (_, trade) = state.close_long(&candle(0, 100.0), 20, "AAPL", ExitReason::EndOfBacktest, &FRICTION);
        assert!(trade.is_none());
    }

    #[test]
    fn equity_marks_open_position() {
        let state = SimulationState::new(10_000.0).unwrap();
        let (state, _) = state.apply(Action::Buy, &candle(0, 100.0), 20, "AAPL", &FRICTION);
        let quantity = state.position_size();
        let entry = state.position().unwrap().entry_price();
        let expected = state.capital() + quantity * entry + quantity * (120.0 - entry);
        assert_eq!(state.equity(120.0), expected);
    }

    #[test]
    fn drawdown_tracks_peak() {
        let state = SimulationState::new(10_000.0).unwrap();
        let (state, _) = state.apply(Action::Buy, &candle(0, 100.0), 20, "AAPL", &FRICTION);

        let (state, up) = state.mark_to_market(120.0);
        assert_eq!(state.peak_equity(), up);

        let (state, down) = state.mark_to_market(90.0);
        let expected = (up - down) / up;
        assert!((state.max_drawdown() - expected).abs() < 1e-12);

        // a partial recovery never shrinks the maximum drawdown
        let (state, _) = state.mark_to_market(110.0);
        assert!((state.max_drawdown() - expected).abs() < 1e-12);
    }
}
