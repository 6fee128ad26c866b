//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Curve length: one equity point per bar after the warm-up
//! 2. Flat markets: no trade and no drawdown
//! 3. Equity accounting: final equity is capital plus realized P&L minus entry fees
//! 4. Drawdown: the reported maximum matches the curve and never exceeds 100%
//! 5. Determinism: the same inputs give the same result

use std::sync::Arc;

use btsim::engine::{Backtest, BacktestConfig, BacktestResult, Candle, CandleBuilder, WARMUP_BARS};
use btsim::strategy::{MaCrossover, MacdCrossover, RsiReversion, Strategy as TradingStrategy};
use chrono::{DateTime, Duration};
use proptest::prelude::*;

const CAPITAL: f64 = 10_000.0;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_closes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.04..0.04_f64, WARMUP_BARS..160).prop_map(|moves| {
        moves
            .into_iter()
            .scan(100.0, |price, change| {
                *price *= 1.0 + change;
                Some(*price)
            })
            .collect()
    })
}

fn arb_trading_strategy() -> impl Strategy<Value = TradingStrategy> {
    prop_oneof![
        (2..10_usize, 10..30_usize)
            .prop_map(|(short, long)| TradingStrategy::MovingAverageCrossover(MaCrossover::new(short, long).unwrap())),
        (2..20_usize, 15.0..40.0_f64, 60.0..85.0_f64).prop_map(|(period, oversold, overbought)| {
            TradingStrategy::MeanReversion(RsiReversion::new(period, oversold, overbought).unwrap())
        }),
        (2..10_usize, 10..26_usize, 2..9_usize).prop_map(|(fast, slow, signal)| {
            TradingStrategy::TrendMomentum(MacdCrossover::new(fast, slow, signal).unwrap())
        }),
    ]
}

fn arb_friction() -> impl Strategy<Value = (f64, f64)> {
    (0.0..0.01_f64, 0.0..0.01_f64)
}

// ── Helpers ──────────────────────────────────────────────────────────

fn candles(closes: &[f64]) -> Arc<[Candle]> {
    let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            CandleBuilder::builder()
                .open(close)
                .high(close)
                .low(close)
                .close(close)
                .timestamp(start + Duration::hours(i as i64))
                .build()
                .unwrap()
        })
        .collect()
}

fn run(strategy: TradingStrategy, (slippage, commission): (f64, f64), closes: &[f64]) -> BacktestResult {
    let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let config = BacktestConfig::builder()
        .symbol("SPY")
        .start(start)
        .end(start + Duration::days(30))
        .initial_capital(CAPITAL)
        .strategy(strategy)
        .slippage(slippage)
        .commission(commission)
        .build()
        .unwrap();
    Backtest::new(config, candles(closes)).unwrap().run().unwrap()
}

// ── 1. Curve Length ──────────────────────────────────────────────────

proptest! {
    /// Exactly one equity point per simulated bar.
    #[test]
    fn curve_length(closes in arb_closes(), strategy in arb_trading_strategy(), friction in arb_friction()) {
        let result = run(strategy, friction, &closes);
        prop_assert_eq!(result.equity_curve.len(), closes.len() - WARMUP_BARS);
        prop_assert!(result.equity_curve.iter().all(|p| p.equity > 0.0));
    }
}

// ── 2. Flat Markets ──────────────────────────────────────────────────

proptest! {
    /// Constant prices never trigger a trade, whatever the strategy.
    #[test]
    fn flat_series_is_idle(
        price in 1.0..1_000.0_f64,
        len in WARMUP_BARS..120,
        strategy in arb_trading_strategy(),
    ) {
        let result = run(strategy, (0.001, 0.001), &vec![price; len]);
        prop_assert!(result.trades.is_empty());
        prop_assert_eq!(result.metrics.total_return, 0.0);
        prop_assert_eq!(result.metrics.max_drawdown, 0.0);
        prop_assert_eq!(result.metrics.sharpe_ratio, 0.0);
        prop_assert_eq!(result.metrics.sortino_ratio, 0.0);
        prop_assert!(result.equity_curve.iter().all(|p| p.equity == CAPITAL));
    }
}

// ── 3. Equity Accounting ─────────────────────────────────────────────

proptest! {
    /// Every fee is either inside a trade's P&L (exit) or paid at entry.
    #[test]
    fn pnl_identity(closes in arb_closes(), strategy in arb_trading_strategy(), friction in arb_friction()) {
        let result = run(strategy, friction, &closes);
        let realized = result.trades.iter().map(|t| t.pnl).sum::<f64>();
        let exit_fees = result.trades.iter().map(|t| t.commission).sum::<f64>();
        let entry_fees = result.metrics.total_fees - exit_fees;

        prop_assert!(entry_fees >= -1e-9);
        let expected = CAPITAL + realized - entry_fees;
        prop_assert!((result.final_equity() - expected).abs() < 1e-6);

        for trade in &result.trades {
            let pnl = trade.quantity * (trade.exit_price - trade.entry_price) - trade.commission;
            prop_assert!((trade.pnl - pnl).abs() < 1e-9);
            prop_assert!(trade.quantity >= 1.0);
            prop_assert_eq!(trade.quantity.fract(), 0.0);
        }
    }
}

// ── 4. Drawdown ──────────────────────────────────────────────────────

proptest! {
    /// The reported maximum drawdown is the running maximum over the curve.
    #[test]
    fn drawdown_matches_curve(closes in arb_closes(), strategy in arb_trading_strategy(), friction in arb_friction()) {
        let result = run(strategy, friction, &closes);

        let mut peak = CAPITAL;
        let mut max_drawdown = 0.0_f64;
        for point in &result.equity_curve {
            peak = peak.max(point.equity);
            let drawdown = (peak - point.equity) / peak;
            prop_assert!((0.0..1.0).contains(&drawdown));
            max_drawdown = max_drawdown.max(drawdown);
        }

        prop_assert!((result.metrics.max_drawdown - max_drawdown * 100.0).abs() < 1e-9);
        prop_assert!((0.0..=100.0).contains(&result.metrics.max_drawdown));
    }
}

// ── 5. Determinism ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Two runs on the same inputs are identical.
    #[test]
    fn runs_are_deterministic(closes in arb_closes(), strategy in arb_trading_strategy(), friction in arb_friction()) {
        let first = run(strategy, friction, &closes);
        let second = run(strategy, friction, &closes);
        prop_assert_eq!(first, second);
    }
}
