//! Rolling-window primitives shared by all indicator modules
//!
//! Every helper works on [`Column`]s so undefined inputs propagate: a
//! window containing an undefined value yields an undefined output.
//! Window sums are recomputed per bar rather than maintained incrementally,
//! so exact zeros (flat prices, zero losses) stay exact.

use crate::series::Column;

/// Lift fully defined values into a column
#[inline]
pub fn defined(values: &[f64]) -> Column {
    values.iter().copied().map(Some).collect()
}

/// The `window` values ending at `index`, if all of them are defined
fn window_at(values: &[Option<f64>], index: usize, window: usize) -> Option<Vec<f64>> {
    if window == 0 || index + 1 < window {
        return None;
    }
    values[index + 1 - window..=index].iter().copied().collect()
}

fn rolling<F>(values: &[Option<f64>], window: usize, f: F) -> Column
where
    F: Fn(&[f64]) -> Option<f64>,
{
    (0..values.len())
        .map(|i| window_at(values, i, window).and_then(|w| f(&w)))
        .collect()
}

pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Column {
    rolling(values, window, |w| Some(w.iter().sum::<f64>() / w.len() as f64))
}

/// Sample standard deviation (n - 1 denominator); undefined for window 1
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Column {
    rolling(values, window, |w| {
        if w.len() < 2 {
            return None;
        }
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        let var = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (w.len() - 1) as f64;
        Some(var.sqrt())
    })
}

pub fn rolling_min(values: &[Option<f64>], window: usize) -> Column {
    rolling(values, window, |w| w.iter().copied().reduce(f64::min))
}

pub fn rolling_max(values: &[Option<f64>], window: usize) -> Column {
    rolling(values, window, |w| w.iter().copied().reduce(f64::max))
}

/// Exponentially weighted mean `e = alpha * x + (1 - alpha) * e_prev`.
///
/// Seeded with the first defined value; outputs before `min_periods`
/// values have been absorbed are undefined. An undefined input after the
/// seed leaves the state untouched and yields an undefined output.
pub fn ewm(values: &[Option<f64>], alpha: f64, min_periods: usize) -> Column {
    let mut out = vec![None; values.len()];
    let mut state: Option<f64> = None;
    let mut seen = 0usize;

    for (i, value) in values.iter().enumerate() {
        let Some(x) = *value else {
            continue;
        };
        let next = match state {
            None => x,
            Some(prev) => alpha * x + (1.0 - alpha) * prev,
        };
        state = Some(next);
        seen += 1;
        if seen >= min_periods.max(1) {
            out[i] = Some(next);
        }
    }

    out
}

/// EMA with `alpha = 2 / (span + 1)`, undefined for the first `span - 1` values
#[inline]
pub fn ema_of(values: &[Option<f64>], span: usize) -> Column {
    ewm(values, 2.0 / (span as f64 + 1.0), span)
}

/// Wilder smoothing, `alpha = 1 / period`
#[inline]
pub fn wilder(values: &[Option<f64>], period: usize, min_periods: usize) -> Column {
    ewm(values, 1.0 / period as f64, min_periods)
}

/// Day-over-day difference; the first bar is undefined
pub fn diff(values: &[f64]) -> Column {
    (0..values.len())
        .map(|i| (i > 0).then(|| values[i] - values[i - 1]))
        .collect()
}

/// Percent change over `periods` bars; undefined when the base is zero
pub fn pct_change(values: &[f64], periods: usize) -> Column {
    (0..values.len())
        .map(|i| {
            if periods == 0 || i < periods {
                return None;
            }
            let base = values[i - periods];
            (base != 0.0).then(|| values[i] / base - 1.0)
        })
        .collect()
}

/// Element-wise combination; undefined where either side is
pub fn zip_with<F>(a: &[Option<f64>], b: &[Option<f64>], f: F) -> Column
where
    F: Fn(f64, f64) -> Option<f64>,
{
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => f(*x, *y),
            _ => None,
        })
        .collect()
}
