//! # Equity Curve
//!
//! Runs a single MACD backtest, prints its trades and metrics and draws the equity curve in
//! the terminal. With the `draws` feature the chart is also saved as `equity.svg`.
mod utils;

use btsim::prelude::*;

fn main() -> anyhow::Result<()> {
    utils::init_tracing();

    let source = MemorySource::new().with_series("SAMPLE", Timeframe::Day, utils::example_candles()?);
    let mut config = utils::example_config()?;
    config.strategy = Strategy::TrendMomentum(MacdCrossover::new(8, 21, 5)?);

    let result = run(config, &source)?;

    for trade in &result.trades {
        println!(
            "{} -> {} | {:>4} bars | {:>8.2} -> {:>8.2} | pnl {:>9.2} ({:>6.2}%) | {}",
            trade.entry_time.date_naive(),
            trade.exit_time.date_naive(),
            trade.bars_held,
            trade.entry_price,
            trade.exit_price,
            trade.pnl,
            trade.pnl_percent,
            trade.exit_reason
        );
    }
    println!();
    println!("{}", result.metrics);
    println!();

    let chart = Draw::with_result(&result)
        .with_options(DrawOptions::default().title(result.config.strategy).size(80, 20))
        .plot()?;
    if let Some(chart) = chart {
        println!("{chart}");
    }

    #[cfg(feature = "draws")]
    {
        let candles = source.get_candles(
            &result.config.symbol,
            result.config.timeframe,
            result.config.start,
            result.config.end,
        )?;
        Draw::with_result(&result)
            .with_candles(&candles)
            .with_options(
                DrawOptions::default()
                    .draw_output(DrawOutput::Svg("equity.svg".to_string()))
                    .show_volume(true),
            )
            .plot()?;
        println!("chart saved to equity.svg");
    }

    Ok(())
}
