#![allow(dead_code)]

use btsim::prelude::*;
use chrono::{DateTime, Duration, Utc};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// First bar of the sample series.
pub fn sample_start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_672_531_200, 0).unwrap_or_default()
}

/// Generates deterministic daily candle data.
pub fn generate_sample_candles(max: i64, seed: i32, base_price: f64) -> Result<Vec<Candle>> {
    let start = sample_start();
    let mut open = base_price;

    (0..=max)
        .map(|i| {
            // Base price with trend (+ 0.1*i) and a slower cycle on top
            let base_price = base_price + 0.1 * (i as f64) + 8.0 * (i as f64 / 40.0).sin();

            // Price variation using simple trigonometric function with seed
            let variation = 5.0 * ((i as f64 * 0.3 + seed as f64).sin() * 0.5 + 0.5);

            let close = base_price + variation;
            let high = open.max(close) + 0.3 * variation;
            let low = open.min(close) - 0.3 * variation;
            // Volume with seasonal pattern
            let volume = 1000.0 + 500.0 * ((i as f64 * 0.2).sin()).abs();

            let candle = CandleBuilder::builder()
                .open(open)
                .high(high)
                .low(low)
                .close(close)
                .volume(volume)
                .timestamp(start + Duration::days(i))
                .build()?;

            open = close;
            Ok(candle)
        })
        .collect()
}

/// Roughly one year of sample candles.
pub fn example_candles() -> Result<Vec<Candle>> {
    generate_sample_candles(365, 42, 100.0)
}

/// Base configuration covering the sample candles.
pub fn example_config() -> Result<BacktestConfig> {
    Ok(BacktestConfig::builder()
        .symbol("SAMPLE")
        .start(sample_start())
        .end(sample_start() + Duration::days(365))
        .initial_capital(10_000.0)
        .build()?)
}

/// Prints the engine's logs; `RUST_LOG=btsim=debug` shows every trade.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("btsim=info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
