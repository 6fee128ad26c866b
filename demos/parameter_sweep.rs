//! # Parallel Moving Average Parameters Optimization
//!
//! Sweeps the short and long periods of the moving average crossover in parallel and prints
//! the best combinations by Sharpe ratio.
mod utils;

use btsim::prelude::*;

const SHORT: std::ops::RangeInclusive<usize> = 3..=15;
const LONG: std::ops::RangeInclusive<usize> = 10..=40;

struct Periods;

impl ParameterCombination for Periods {
    type Output = (usize, usize);

    fn generate() -> Vec<Self::Output> {
        SHORT
            .flat_map(|short| LONG.filter(move |long| *long > short).map(move |long| (short, long)))
            .collect()
    }
}

fn main() -> anyhow::Result<()> {
    utils::init_tracing();

    let optimizer = Optimizer::new(utils::example_candles()?, utils::example_config()?)?;
    let results = optimizer.sweep::<Periods, _>(|&(short, long)| {
        Ok(Strategy::MovingAverageCrossover(MaCrossover::new(short, long)?))
    })?;

    let summaries = compare_strategies(
        results
            .iter()
            .map(|((short, long), result)| (format!("ma({short}, {long})"), result)),
    );

    println!("{} combinations tested", summaries.len());
    println!("{}", comparison_table(&summaries[..summaries.len().min(10)]));

    Ok(())
}
