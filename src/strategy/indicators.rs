//! Indicator helpers shared by the built-in strategies.
//!
//! All helpers are pure functions over a slice of values ordered oldest first.

/// Simple moving average of the last `period` values.
///
/// Returns `None` when fewer than `period` values are available.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let sum = values[values.len() - period..].iter().sum::<f64>();
    Some(sum / period as f64)
}

/// Exponential moving average for every value, seeded with the first one.
///
/// The smoothing factor is `2 / (period + 1)`. A constant input yields exactly that constant.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return Vec::new();
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut series = Vec::with_capacity(values.len());
    let mut previous: Option<f64> = None;
    for &value in values {
        let next = match previous {
            Some(prev) => prev + k * (value - prev),
            None => value,
        };
        series.push(next);
        previous = Some(next);
    }
    series
}

/// Relative strength index over the last `period` close-to-close changes, bounded to `[0, 100]`.
///
/// Gains and losses are averaged with simple means. A window without any movement is
/// neutral (50) and a window without losses saturates at 100.
pub fn rsi(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period + 1 {
        return None;
    }

    let (gains, losses) = values[values.len() - period - 1..]
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0, 0.0), |(gains, losses), change| {
            if change > 0.0 {
                (gains + change, losses)
            } else {
                (gains, losses - change)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}
