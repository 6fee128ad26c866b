//! Performance metrics for backtesting.
//!
//! This module provides tools to calculate:
//! - Total and annualized return
//! - Max drawdown
//! - Profit factor
//! - Sharpe and Sortino ratios
//! - Win rate
//!
//! Metrics are computed once, from the trades and the equity curve of a finished run.
//! Every value is finite: degenerate inputs (no trades, flat curve, a single point) give zeros.

use std::fmt;

use crate::engine::{BacktestTrade, EquityPoint};

/// Annual risk-free rate used by the Sharpe and Sortino ratios.
pub const RISK_FREE_RATE: f64 = 0.05;
/// Trading periods per year used to annualize the ratios.
pub const TRADING_DAYS: f64 = 252.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// A collection of trading metrics calculated from a finished run.
///
/// Percentages are expressed in percent (`12.5` means 12.5%).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Metrics {
    /// Equity change over the run, in percent of the initial capital.
    pub total_return: f64,
    /// Compounded yearly return over the span of the equity curve, in percent.
    pub annualized_return: f64,
    /// Share of trades with a positive P&L, in percent.
    pub win_rate: f64,
    /// Mean P&L of the winning trades.
    pub avg_win: f64,
    /// Mean P&L of the losing trades (negative or zero).
    pub avg_loss: f64,
    /// Gross profit over gross loss; zero when nothing was lost.
    pub profit_factor: f64,
    /// Largest peak-to-trough equity decline, in percent.
    pub max_drawdown: f64,
    /// Annualized Sharpe ratio of the per-bar returns.
    pub sharpe_ratio: f64,
    /// Annualized Sortino ratio of the per-bar returns.
    pub sortino_ratio: f64,
    /// Number of completed trades.
    pub total_trades: usize,
    /// Number of trades with a positive P&L.
    pub winning_trades: usize,
    /// Number of trades with a negative P&L.
    pub losing_trades: usize,
    /// Equity at the last bar, or the initial capital when nothing was simulated.
    pub final_equity: f64,
    /// Commissions paid on every fill.
    pub total_fees: f64,
    /// Best trade P&L, zero without winners.
    pub largest_win: f64,
    /// Worst trade P&L, zero without losers.
    pub largest_loss: f64,
    /// Mean number of bars a position stayed open.
    pub avg_bars_held: f64,
}

impl Metrics {
    /// Computes the metrics of a finished run.
    ///
    /// ### Arguments
    /// * `trades` - Completed trades.
    /// * `equity_curve` - One point per simulated bar.
    /// * `initial_capital` - Starting cash, strictly positive.
    /// * `max_drawdown` - Running maximum drawdown of the run, as a fraction.
    /// * `fees` - Commissions paid during the run.
    ///
    /// ### Returns
    /// The computed metrics.
    pub fn compute(
        trades: &[BacktestTrade],
        equity_curve: &[EquityPoint],
        initial_capital: f64,
        max_drawdown: f64,
        fees: f64,
    ) -> Self {
        let final_equity = equity_curve.last().map(|p| p.equity).unwrap_or(initial_capital);

        let wins = trades.iter().filter(|t| t.is_win()).map(|t| t.pnl).collect::<Vec<_>>();
        let losses = trades.iter().filter(|t| t.is_loss()).map(|t| t.pnl).collect::<Vec<_>>();
        let gross_profit = wins.iter().sum::<f64>();
        let gross_loss = losses.iter().sum::<f64>().abs();

        let returns = bar_returns(equity_curve);
        let bar_risk_free = RISK_FREE_RATE / TRADING_DAYS;

        Self {
            total_return: (final_equity - initial_capital) / initial_capital * 100.0,
            annualized_return: annualized_return(equity_curve, initial_capital, final_equity),
            win_rate: ratio(wins.len() as f64, trades.len() as f64) * 100.0,
            avg_win: mean(&wins),
            avg_loss: mean(&losses),
            profit_factor: ratio(gross_profit, gross_loss),
            max_drawdown: max_drawdown * 100.0,
            sharpe_ratio: sharpe_ratio(&returns, bar_risk_free),
            sortino_ratio: sortino_ratio(&returns, bar_risk_free),
            total_trades: trades.len(),
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            final_equity,
            total_fees: fees,
            largest_win: wins.iter().copied().fold(0.0, f64::max),
            largest_loss: losses.iter().copied().fold(0.0, f64::min),
            avg_bars_held: mean(&trades.iter().map(|t| t.bars_held as f64).collect::<Vec<_>>()),
        }
    }
}

/// Fractional change between consecutive equity points.
pub fn bar_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|pair| ratio(pair[1].equity - pair[0].equity, pair[0].equity))
        .collect()
}

/// Annualized Sharpe ratio of per-bar `returns` against the per-bar risk-free rate.
///
/// Uses the population standard deviation. Zero when all returns are equal or there are none.
pub fn sharpe_ratio(returns: &[f64], risk_free: f64) -> f64 {
    if returns.is_empty() || returns.iter().all(|r| *r == returns[0]) {
        return 0.0;
    }

    let mean_return = mean(returns);
    let std_dev = (returns.iter().map(|r| (r - mean_return).powi(2)).sum::<f64>() / returns.len() as f64).sqrt();
    if std_dev == 0.0 {
        return 0.0;
    }

    (mean_return - risk_free) / std_dev * TRADING_DAYS.sqrt()
}

/// Annualized Sortino ratio: like [`sharpe_ratio`] but only returns below `risk_free` count as risk.
///
/// Zero when all returns are equal, there are none, or none falls below `risk_free`.
pub fn sortino_ratio(returns: &[f64], risk_free: f64) -> f64 {
    if returns.is_empty() || returns.iter().all(|r| *r == returns[0]) {
        return 0.0;
    }

    let downside = returns.iter().map(|r| (r - risk_free).min(0.0).powi(2)).sum::<f64>() / returns.len() as f64;
    let downside_dev = downside.sqrt();
    if downside_dev == 0.0 {
        return 0.0;
    }

    (mean(returns) - risk_free) / downside_dev * TRADING_DAYS.sqrt()
}

fn annualized_return(equity_curve: &[EquityPoint], initial_capital: f64, final_equity: f64) -> f64 {
    let (Some(first), Some(last)) = (equity_curve.first(), equity_curve.last()) else {
        return 0.0;
    };

    let days = (last.timestamp - first.timestamp).num_seconds() as f64 / SECONDS_PER_DAY;
    if days <= 0.0 {
        return 0.0;
    }
    if final_equity <= 0.0 {
        return -100.0;
    }

    let annualized = ((final_equity / initial_capital).powf(365.0 / days) - 1.0) * 100.0;
    if annualized.is_finite() { annualized } else { f64::MAX }
}

fn mean(values: &[f64]) -> f64 {
    ratio(values.iter().sum(), values.len() as f64)
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 { 0.0 } else { numerator / denominator }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Backtest Metrics ===")?;
        writeln!(f, "Final Equity: {:.2}", self.final_equity)?;
        writeln!(f, "Total Return: {:.2}%", self.total_return)?;
        writeln!(f, "Annualized Return: {:.2}%", self.annualized_return)?;
        writeln!(f, "Fees paid: {:.2}", self.total_fees)?;
        writeln!(f)?;
        writeln!(
            f,
            "Trades: {} ({} won, {} lost)",
            self.total_trades, self.winning_trades, self.losing_trades
        )?;
        writeln!(f, "Win Rate: {:.2}%", self.win_rate)?;
        writeln!(f, "Average Win: {:.2}", self.avg_win)?;
        writeln!(f, "Average Loss: {:.2}", self.avg_loss)?;
        writeln!(f, "Largest Win: {:.2}", self.largest_win)?;
        writeln!(f, "Largest Loss: {:.2}", self.largest_loss)?;
        writeln!(f, "Average Bars Held: {:.1}", self.avg_bars_held)?;
        writeln!(f, "Profit Factor: {:.2}", self.profit_factor)?;
        writeln!(f)?;
        writeln!(f, "Max Drawdown: {:.2}%", self.max_drawdown)?;
        writeln!(f, "Sharpe Ratio (risk-free rate = {RISK_FREE_RATE}): {:.2}", self.sharpe_ratio)?;
        write!(f, "Sortino Ratio (risk-free rate = {RISK_FREE_RATE}): {:.2}", self.sortino_ratio)
    }
}
