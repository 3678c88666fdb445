//! Momentum oscillators: RSI and Stochastic

use super::helpers::{defined, diff, rolling_max, rolling_mean, rolling_min};
use crate::series::Column;

/// RSI value for a window with no movement at all
pub const RSI_NEUTRAL: f64 = 50.0;

/// %K value when the high-low range of the window is zero
pub const STOCH_NEUTRAL: f64 = 50.0;

/// Relative Strength Index over a rolling window of gains and losses.
///
/// Undefined for the first `period` bars. Zero average loss saturates at
/// 100; zero gain and zero loss resolves to [`RSI_NEUTRAL`].
pub fn rsi(closes: &[f64], period: usize) -> Column {
    let delta = diff(closes);
    let gains: Column = delta.iter().map(|d| d.map(|d| d.max(0.0))).collect();
    let losses: Column = delta.iter().map(|d| d.map(|d| (-d).max(0.0))).collect();

    let avg_gain = rolling_mean(&gains, period);
    let avg_loss = rolling_mean(&losses, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(g, l)| {
            let (g, l) = ((*g)?, (*l)?);
            Some(rsi_value(g, l))
        })
        .collect()
}

#[inline]
fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { RSI_NEUTRAL } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// %K and %D lines
#[derive(Debug, Clone)]
pub struct Stochastic {
    pub k: Column,
    pub d: Column,
}

/// Stochastic oscillator: %K over `k_period` bars, %D its `d_period` mean
pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> Stochastic {
    let lowest = rolling_min(&defined(lows), k_period);
    let highest = rolling_max(&defined(highs), k_period);

    let k: Column = closes
        .iter()
        .zip(lowest.iter().zip(&highest))
        .map(|(close, (lo, hi))| {
            let (lo, hi) = ((*lo)?, (*hi)?);
            let range = hi - lo;
            if range <= 0.0 {
                return Some(STOCH_NEUTRAL);
            }
            Some((100.0 * (close - lo) / range).clamp(0.0, 100.0))
        })
        .collect();
    let d = rolling_mean(&k, d_period);

    Stochastic { k, d }
}
