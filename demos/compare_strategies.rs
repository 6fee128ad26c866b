//! # Strategy Comparison
//!
//! Runs the three built-in strategies on the same candles in parallel and ranks them by
//! Sharpe ratio.
mod utils;

use btsim::prelude::*;

fn main() -> anyhow::Result<()> {
    utils::init_tracing();

    let candles = utils::example_candles()?;
    let optimizer = Optimizer::new(candles, utils::example_config()?)?;

    let results = optimizer.run_strategies(vec![
        ("ma_crossover".to_string(), Strategy::default()),
        ("rsi".to_string(), Strategy::MeanReversion(RsiReversion::default())),
        ("macd".to_string(), Strategy::TrendMomentum(MacdCrossover::default())),
    ])?;

    let summaries = compare_strategies(results.iter().map(|(name, result)| (name, result)));
    println!("{}", comparison_table(&summaries));

    if let Some(best) = summaries.first()
        && let Some((_, result)) = results.iter().find(|(name, _)| name == &best.name)
    {
        println!();
        println!("Best: {} ({})", best.name, result.config.strategy);
        println!("{}", result.metrics);
    }

    Ok(())
}
