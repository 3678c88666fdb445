//! Trend strength: Average Directional Index

use super::helpers::{wilder, zip_with};
use super::volatility::atr;
use crate::series::Column;
use crate::OHLCV;

/// Directional indicators and ADX
#[derive(Debug, Clone)]
pub struct Adx {
    pub plus_di: Column,
    pub minus_di: Column,
    pub dx: Column,
    pub adx: Column,
}

/// ADX(period).
///
/// Directional movement is Wilder-smoothed and divided by the rolling ATR.
/// A zero ATR gives zero DI, a zero DI sum gives zero DX. ADX is the
/// Wilder-smoothed DX, undefined for its first `period - 1` values.
pub fn adx<T: OHLCV>(bars: &[T], period: usize) -> Adx {
    let n = bars.len();
    let mut plus_dm = vec![None; n];
    let mut minus_dm = vec![None; n];

    for i in 1..n {
        let up = bars[i].high() - bars[i - 1].high();
        let down = bars[i - 1].low() - bars[i].low();
        plus_dm[i] = Some(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm[i] = Some(if down > up && down > 0.0 { down } else { 0.0 });
    }

    let atr = atr(bars, period);
    let directional = |dm: &Column| {
        zip_with(&wilder(dm, period, 1), &atr, |dm, atr| {
            Some(if atr == 0.0 { 0.0 } else { 100.0 * dm / atr })
        })
    };
    let plus_di = directional(&plus_dm);
    let minus_di = directional(&minus_dm);

    let dx = zip_with(&plus_di, &minus_di, |p, m| {
        let sum = p + m;
        Some(if sum == 0.0 { 0.0 } else { 100.0 * (p - m).abs() / sum })
    });
    let adx = wilder(&dx, period, period);

    Adx {
        plus_di,
        minus_di,
        dx,
        adx,
    }
}
