//! Volatility: Bollinger Bands, true range, ATR and daily range

use super::helpers::{defined, rolling_mean, rolling_std};
use crate::series::Column;
use crate::{OHLCVExt, OHLCV};

/// Bollinger Bands around a simple moving average
#[derive(Debug, Clone)]
pub struct Bollinger {
    pub middle: Column,
    pub upper: Column,
    pub lower: Column,
    /// `(upper - lower) / middle`
    pub width: Column,
}

pub fn bollinger(closes: &[f64], period: usize, num_std: f64) -> Bollinger {
    let middle = rolling_mean(&defined(closes), period);
    let std = rolling_std(&defined(closes), period);

    let n = closes.len();
    let mut upper = vec![None; n];
    let mut lower = vec![None; n];
    let mut width = vec![None; n];

    for i in 0..n {
        let (Some(m), Some(s)) = (middle[i], std[i]) else {
            continue;
        };
        let (u, l) = (m + num_std * s, m - num_std * s);
        upper[i] = Some(u);
        lower[i] = Some(l);
        width[i] = (m != 0.0).then(|| (u - l) / m);
    }

    Bollinger {
        middle,
        upper,
        lower,
        width,
    }
}

/// True range per bar; the first bar has no prior close and is undefined
pub fn true_range<T: OHLCV>(bars: &[T]) -> Column {
    let mut out = vec![None; bars.len()];
    for i in 1..bars.len() {
        out[i] = Some(bars[i].true_range(bars[i - 1].close()));
    }
    out
}

/// Average True Range: rolling mean of [`true_range`], undefined for the
/// first `period` bars
pub fn atr<T: OHLCV>(bars: &[T], period: usize) -> Column {
    rolling_mean(&true_range(bars), period)
}

/// `(high - low) / close`; undefined when close is zero
pub fn daily_volatility<T: OHLCV>(bars: &[T]) -> Column {
    bars.iter()
        .map(|b| (b.close() != 0.0).then(|| b.range() / b.close()))
        .collect()
}
