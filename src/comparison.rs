//! Side-by-side comparison of finished runs.

use std::fmt;

use crate::engine::BacktestResult;

/// Headline numbers of one strategy's run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct StrategySummary {
    /// Name the run was submitted under.
    pub name: String,
    /// Total return, in percent.
    pub total_return: f64,
    /// Annualized return, in percent.
    pub annualized_return: f64,
    /// Win rate, in percent.
    pub win_rate: f64,
    /// Maximum drawdown, in percent.
    pub max_drawdown: f64,
    /// Annualized Sharpe ratio.
    pub sharpe_ratio: f64,
    /// Number of completed trades.
    pub total_trades: usize,
    /// Gross profit over gross loss.
    pub profit_factor: f64,
}

impl StrategySummary {
    /// Summarizes `result` under `name`.
    pub fn new(name: impl ToString, result: &BacktestResult) -> Self {
        let metrics = &result.metrics;
        Self {
            name: name.to_string(),
            total_return: metrics.total_return,
            annualized_return: metrics.annualized_return,
            win_rate: metrics.win_rate,
            max_drawdown: metrics.max_drawdown,
            sharpe_ratio: metrics.sharpe_ratio,
            total_trades: metrics.total_trades,
            profit_factor: metrics.profit_factor,
        }
    }
}

/// Summarizes each named result, best Sharpe ratio first.
///
/// The sort is stable: strategies with equal Sharpe ratios keep their input order.
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
///     .end(start + Duration::days(1))
///     .initial_capital(1_000.0)
///     .build()
///     .unwrap();
/// let result = |sharpe_ratio| BacktestResult {
///     config: config.clone(),
///     equity_curve: vec![],
///     trades: vec![],
///     metrics: Metrics { sharpe_ratio, ..Metrics::default() },
/// };
/// let (low, high) = (result(0.2), result(1.1));
///
/// let summaries = compare_strategies([("low", &low), ("high", &high)]);
/// assert_eq!(summaries[0].name, "high");
/// ```
pub fn compare_strategies<'r, N, I>(results: I) -> Vec<StrategySummary>
where
    N: ToString,
    I: IntoIterator<Item = (N, &'r BacktestResult)>,
{
    let mut summaries = results
        .into_iter()
        .map(|(name, result)| StrategySummary::new(name, result))
        .collect::<Vec<_>>();
    summaries.sort_by(|a, b| b.sharpe_ratio.total_cmp(&a.sharpe_ratio));
    summaries
}

/// Formats `summaries` as a fixed-width table, one row per strategy.
pub fn comparison_table(summaries: &[StrategySummary]) -> String {
    let width = summaries.iter().map(|s| s.name.len()).max().unwrap_or(0).max(8);
    let mut table = format!(
        "{:<width$} {:>10} {:>10} {:>8} {:>9} {:>7} {:>7} {:>7}",
        "Strategy", "Return%", "Annual%", "Win%", "MaxDD%", "Sharpe", "Trades", "PF"
    );
    for summary in summaries {
        table.push('\n');
        table.push_str(&format!("{summary:width$}"));
    }
    table
}

impl fmt::Display for StrategySummary {
    /// A table row; the formatter width pads the name column.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = f.width().unwrap_or(self.name.len());
        write!(
            f,
            "{:<width$} {:>10.2} {:>10.2} {:>8.2} {:>9.2} {:>7.2} {:>7} {:>7.2}",
            self.name,
            self.total_return,
            self.annualized_return,
            self.win_rate,
            self.max_drawdown,
            self.sharpe_ratio,
            self.total_trades,
            self.profit_factor
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BacktestConfig;
    use crate::metrics::Metrics;

    use chrono::{DateTime, Duration};

    fn result(sharpe_ratio: f64) -> BacktestResult {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let config = BacktestConfig::builder()
            .symbol("AAPL")
            .start(start)
            .end(start + Duration::days(30))
            .initial_capital(10_000.0)
            .build()
            .unwrap();
        BacktestResult {
            config,
            equity_curve: vec![],
            trades: vec![],
            metrics: Metrics {
                sharpe_ratio,
                total_trades: 3,
                ..Metrics::default()
            },
        }
    }

    #[test]
    fn sorted_by_sharpe_descending() {
        let (a, b, c) = (result(0.5), result(1.8), result(-0.2));
        let summaries = compare_strategies([("ma", &a), ("rsi", &b), ("macd", &c)]);
        let sharpes = summaries.iter().map(|s| s.sharpe_ratio).collect::<Vec<_>>();
        assert_eq!(sharpes, vec![1.8, 0.5, -0.2]);
        assert_eq!(summaries[0].name, "rsi");
        assert_eq!(summaries[0].total_trades, 3);
    }

    #[test]
    fn ties_keep_input_order() {
        let (a, b, c) = (result(1.0), result(2.0), result(1.0));
        let names = compare_strategies([("first", &a), ("best", &b), ("second", &c)])
            .into_iter()
            .map(|s| s.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["best", "first", "second"]);
    }

    #[test]
    fn empty_input() {
        assert!(compare_strategies(Vec::<(String, &BacktestResult)>::new()).is_empty());
        assert_eq!(comparison_table(&[]).lines().count(), 1);
    }

    #[test]
    fn table_rows() {
        let (a, b) = (result(0.5), result(1.5));
        let table = comparison_table(&compare_strategies([("moving_average", &a), ("rsi", &b)]));
        let lines = table.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Strategy"));
        assert!(lines[1].starts_with("rsi "));
        assert!(lines[2].starts_with("moving_average"));
        assert_eq!(lines[1].len(), lines[2].len());
        assert!(lines[1].contains("1.50"));
    }
}
