//! Moving averages: SMA, EMA and MACD

use super::helpers::{defined, ema_of, rolling_mean, zip_with};
use crate::series::Column;

/// Simple moving average over `window` closes
pub fn sma(values: &[f64], window: usize) -> Column {
    rolling_mean(&defined(values), window)
}

/// Exponential moving average, seeded with the first close
pub fn ema(values: &[f64], span: usize) -> Column {
    ema_of(&defined(values), span)
}

/// MACD line, signal line and histogram
#[derive(Debug, Clone)]
pub struct Macd {
    pub line: Column,
    pub signal: Column,
    pub histogram: Column,
}

/// MACD(fast, slow, signal).
///
/// The line is defined once the slow EMA is; the signal EMA is seeded at
/// the first defined line value.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);
    let line = zip_with(&fast_ema, &slow_ema, |f, s| Some(f - s));
    let signal = ema_of(&line, signal);
    let histogram = zip_with(&line, &signal, |l, s| Some(l - s));

    Macd {
        line,
        signal,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_undefined_before_window() {
        let closes: Vec<f64> = (1..=10).map(f64::from).collect();
        let out = sma(&closes, 5);
        assert!(out[..4].iter().all(Option::is_none));
        assert_eq!(out[4], Some(3.0));
        assert_eq!(out[9], Some(8.0));
    }

    #[test]
    fn test_ema_of_constant_is_constant() {
        let out = ema(&[5.0; 30], 12);
        assert!(out[..11].iter().all(Option::is_none));
        assert!(out[11..].iter().all(|v| *v == Some(5.0)));
    }

    #[test]
    fn test_macd_definition_points() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let m = macd(&closes, 12, 26, 9);
        assert_eq!(m.line[24], None);
        assert!(m.line[25].is_some());
        assert_eq!(m.signal[32], None);
        assert!(m.signal[33].is_some());
        assert!(m.histogram[33].is_some());
        // rising prices keep the fast EMA above the slow one
        assert!(m.line[59].unwrap() > 0.0);
    }

    #[test]
    fn test_macd_flat_is_zero() {
        let m = macd(&[50.0; 40], 12, 26, 9);
        assert_eq!(m.line[39], Some(0.0));
        assert_eq!(m.histogram[39], Some(0.0));
    }
}
