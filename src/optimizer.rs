//! Parallel runs and strategy parameter optimization.
//!
//! This module runs many backtests over the same candles at once. Each run owns its own
//! simulation state; only the candles and the cancel flag are shared.
//! The `Optimizer` struct handles the execution of backtests for each strategy or parameter
//! combination, while the `ParameterCombination` trait defines how to generate parameter sets.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::info;

use crate::engine::{Backtest, BacktestConfig, BacktestResult, CancelFlag, Candle};
use crate::errors::Result;
use crate::strategy::Strategy;

/// Trait defining how to generate parameter combinations for optimization.
///
/// Implement this trait for your parameter types to define how combinations should be generated.
/// The associated type `Output` represents a single parameter combination (e.g., a tuple of values).
pub trait ParameterCombination: Sync {
    /// Type representing a single parameter combination (e.g., `(usize, usize)`).
    type Output: Clone + Send + Sync;

    /// Generates all possible parameter combinations to test.
    ///
    /// ### Returns
    /// A vector containing all parameter combinations.
    fn generate() -> Vec<Self::Output>;
}

/// Runs backtests in parallel over one candle series.
#[derive(Debug, Clone)]
pub struct Optimizer {
    data: Arc<[Candle]>,
    config: BacktestConfig,
    cancel: CancelFlag,
}

impl Optimizer {
    /// Creates a new `Optimizer` with the given data and base configuration.
    ///
    /// ### Arguments
    /// * `data` - Historical candle data for backtesting.
    /// * `config` - Configuration shared by every run; only its strategy is replaced.
    ///
    /// ### Returns
    /// A new `Optimizer` instance, or the error a single run would fail with.
    pub fn new(data: impl Into<Arc<[Candle]>>, config: BacktestConfig) -> Result<Self> {
        let data = data.into();
        Backtest::new(config.clone(), Arc::clone(&data))?;
        Ok(Self {
            data,
            config,
            cancel: CancelFlag::new(),
        })
    }

    /// Shares `cancel` with every run; raising it aborts the remaining bars of all of them.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the cancel flag shared by the runs.
    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    fn run_one(&self, strategy: Strategy) -> Result<BacktestResult> {
        let mut config = self.config.clone();
        config.strategy = strategy;
        Backtest::new(config, Arc::clone(&self.data))?.run_with_cancel(&self.cancel)
    }

    /// Runs every named strategy, one run per worker.
    ///
    /// ### Returns
    /// The named results in input order. The first failing run (including a cancelled one)
    /// fails the whole call.
    ///
    /// ### Example
    /// ```rust
    /// use btsim::prelude::*;
    /// use chrono::{DateTime, Duration};
    ///
    /// let start = DateTime::default();
    /// let candles = (0..80)
    ///     .map(|i| {
    ///         let close = 100.0 + (i as f64 * 0.2).sin() * 10.0;
    ///         CandleBuilder::builder()
    ///             .open(close)
    ///             .high(close + 1.0)
    ///             .low(close - 1.0)
    ///             .close(close)
    ///             .timestamp(start + Duration::days(i))
    ///             .build()
    ///             .unwrap()
    ///     })
    ///     .collect::<Vec<_>>();
    /// let config = BacktestConfig::builder()
    ///     .symbol("AAPL")
    ///     .start(start)
    ///     .end(start + Duration::days(80))
    ///     .initial_capital(10_000.0)
    ///     .build()
    ///     .unwrap();
    ///
    /// let optimizer = Optimizer::new(candles, config).unwrap();
    /// let results = optimizer
    ///     .run_strategies(vec![
    ///         ("ma".to_string(), Strategy::default()),
    ///         ("rsi".to_string(), Strategy::MeanReversion(RsiReversion::default())),
    ///     ])
    ///     .unwrap();
    /// assert_eq!(results[0].0, "ma");
    /// assert_eq!(results[1].1.equity_curve.len(), 60);
    /// ```
    pub fn run_strategies(&self, strategies: Vec<(String, Strategy)>) -> Result<Vec<(String, BacktestResult)>> {
        info!(symbol = %self.config.symbol, runs = strategies.len(), "running strategies in parallel");

        strategies
            .into_par_iter()
            .map(|(name, strategy)| self.run_one(strategy).map(|result| (name, result)))
            .collect()
    }

    /// Optimizes a strategy by testing all parameter combinations of `PC`.
    ///
    /// ### Arguments
    /// * `combinator` - Function that converts a parameter combination into a strategy.
    ///
    /// ### Returns
    /// Each parameter combination with its result, in generation order.
    ///
    /// ### Errors
    /// Returns the first combinator or backtest error.
    pub fn sweep<PC, C>(&self, combinator: C) -> Result<Vec<(PC::Output, BacktestResult)>>
    where
        PC: ParameterCombination,
        C: Fn(&PC::Output) -> Result<Strategy> + Sync,
    {
        let num_cpus = num_cpus::get();
        let combinations = PC::generate();
        let chunk_size = combinations.len().div_ceil(num_cpus).max(1);

        info!(
            symbol = %self.config.symbol,
            combinations = combinations.len(),
            chunk_size,
            "sweeping parameters"
        );

        combinations
            .par_chunks(chunk_size)
            .map::<_, Result<_>>(|par_combinations| {
                let mut local_results = Vec::with_capacity(par_combinations.len());
                for param_set in par_combinations {
                    let strategy = combinator(param_set)?;
                    local_results.push((param_set.clone(), self.run_one(strategy)?));
                }
                Ok(local_results)
            })
            .collect::<Result<Vec<_>>>()
            .map(|chunks| chunks.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::strategy::tests::candles_from_closes;
    use crate::strategy::{MaCrossover, MacdCrossover, RsiReversion};

    use chrono::{DateTime, Duration};

    struct Periods;

    impl ParameterCombination for Periods {
        type Output = (usize, usize);

        fn generate() -> Vec<Self::Output> {
            (3..=6).flat_map(|short| (8..=10).map(move |long| (short, long))).collect()
        }
    }

    fn closes() -> Vec<f64> {
        (0..120).map(|i| 100.0 + (i as f64 * 0.15).sin() * 8.0 + i as f64 * 0.05).collect()
    }

    fn optimizer() -> Optimizer {
        let candles = candles_from_closes(&closes());
        let start = candles[0].timestamp();
        let config = BacktestConfig::builder()
            .symbol("AAPL")
            .start(start)
            .end(start + Duration::days(120))
            .initial_capital(10_000.0)
            .build()
            .unwrap();
        Optimizer::new(candles, config).unwrap()
    }

    #[test]
    fn rejects_short_data() {
        let candles = candles_from_closes(&[100.0; 10]);
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let config = BacktestConfig::builder()
            .symbol("AAPL")
            .start(start)
            .end(start + Duration::days(10))
            .initial_capital(10_000.0)
            .build()
            .unwrap();
        assert!(matches!(Optimizer::new(candles, config), Err(Error::InsufficientData { .. })));
    }

    #[test]
    fn parallel_runs_match_sequential_runs() {
        let optimizer = optimizer();
        let strategies = vec![
            ("ma".to_string(), Strategy::MovingAverageCrossover(MaCrossover::new(5, 15).unwrap())),
            ("rsi".to_string(), Strategy::MeanReversion(RsiReversion::default())),
            ("macd".to_string(), Strategy::TrendMomentum(MacdCrossover::default())),
        ];

        let results = optimizer.run_strategies(strategies.clone()).unwrap();
        assert_eq!(results.len(), 3);
        for ((name, result), (expected_name, strategy)) in results.iter().zip(strategies) {
            assert_eq!(name, &expected_name);
            assert_eq!(result, &optimizer.run_one(strategy).unwrap());
        }
    }

    #[test]
    fn sweep_keeps_generation_order() {
        let optimizer = optimizer();
        let results = optimizer
            .sweep::<Periods, _>(|&(short, long)| {
                Ok(Strategy::MovingAverageCrossover(MaCrossover::new(short, long)?))
            })
            .unwrap();

        let params = results.iter().map(|(p, _)| *p).collect::<Vec<_>>();
        assert_eq!(params, Periods::generate());
        for ((short, long), result) in &results {
            assert_eq!(result.config.strategy.to_string(), format!("ma_crossover({short}, {long})"));
        }
    }

    #[test]
    fn sweep_propagates_combinator_errors() {
        let optimizer = optimizer();
        let result = optimizer.sweep::<Periods, _>(|&(short, long)| {
            Ok(Strategy::MovingAverageCrossover(MaCrossover::new(long, short)?))
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn cancel_aborts_every_run() {
        let cancel = CancelFlag::new();
        let optimizer = optimizer().with_cancel(cancel.clone());
        cancel.cancel();
        let result = optimizer.run_strategies(vec![("ma".to_string(), Strategy::default())]);
        assert!(matches!(result, Err(Error::Cancelled { .. })));
        assert!(optimizer.cancel_flag().is_cancelled());
    }
}
