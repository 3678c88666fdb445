//! Swing segmentation
//!
//! Turns a high/low path into an alternating sequence of swing highs and
//! swing lows, then into high-to-low waves whose depths drive VCP
//! detection.

use serde::Serialize;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SwingKind {
    High,
    Low,
}

impl SwingKind {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            SwingKind::High => SwingKind::Low,
            SwingKind::Low => SwingKind::High,
        }
    }
}

/// A confirmed turning point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SwingPoint {
    /// Bar index in the series
    pub index: usize,
    /// High of the bar for a swing high, low for a swing low
    pub price: f64,
    pub kind: SwingKind,
}

impl SwingPoint {
    /// Strictly higher high, or strictly lower low
    #[inline]
    fn more_extreme_than(&self, other: &SwingPoint) -> bool {
        match self.kind {
            SwingKind::High => self.price > other.price,
            SwingKind::Low => self.price < other.price,
        }
    }
}

/// A swing high followed by the next swing low
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Wave {
    pub high_index: usize,
    pub high: f64,
    pub low_index: usize,
    pub low: f64,
    /// `(high - low) / high`
    pub depth: f64,
}

/// Alternating swing points with every leg at least `min_duration` bars.
///
/// A bar is a pivot when its high (low) is strictly above (below) the
/// `max(1, min_duration / 2)` bars on each side. A run of equal values is a
/// single candidate placed on its first bar, compared against the bars
/// outside the run. Bars lacking a full window on either side are never
/// pivots.
pub fn segment(highs: &[f64], lows: &[f64], min_duration: usize) -> Vec<SwingPoint> {
    let n = highs.len().min(lows.len());
    let k = (min_duration / 2).max(1);
    let mut pivots: Vec<SwingPoint> = Vec::new();

    if n < 2 * k + 1 {
        return pivots;
    }

    for i in k..n - k {
        let is_high = is_extreme(&highs[..n], i, k, |a, b| a > b);
        let is_low = is_extreme(&lows[..n], i, k, |a, b| a < b);

        let kind = match (is_high, is_low) {
            (true, false) => SwingKind::High,
            (false, true) => SwingKind::Low,
            (true, true) => pivots.last().map_or(SwingKind::High, |p| p.kind.opposite()),
            (false, false) => continue,
        };
        let price = match kind {
            SwingKind::High => highs[i],
            SwingKind::Low => lows[i],
        };
        push_alternating(&mut pivots, SwingPoint { index: i, price, kind });
    }

    let raw = pivots.len();
    enforce_min_duration(&mut pivots, min_duration);
    trace!(bars = n, raw, kept = pivots.len(), "swing segmentation");

    pivots
}

/// Whether the run of values equal to `values[i]` that starts at `i` beats
/// the `k` bars before and after it
fn is_extreme(values: &[f64], i: usize, k: usize, beats: impl Fn(f64, f64) -> bool) -> bool {
    let v = values[i];
    if i < k || (i > 0 && values[i - 1] == v) {
        return false;
    }
    let mut end = i;
    while end + 1 < values.len() && values[end + 1] == v {
        end += 1;
    }
    if end + k >= values.len() {
        return false;
    }
    (i - k..i).chain(end + 1..=end + k).all(|j| beats(v, values[j]))
}

/// Same-kind neighbours collapse into the more extreme one, earliest on ties
fn push_alternating(pivots: &mut Vec<SwingPoint>, point: SwingPoint) {
    match pivots.last_mut() {
        Some(last) if last.kind == point.kind => {
            if point.more_extreme_than(last) {
                *last = point;
            }
        }
        _ => pivots.push(point),
    }
}

/// Remove the shortest too-short leg until none remains.
///
/// An inner leg loses its closing pivot, after which the two same-kind
/// pivots around it merge into the more extreme one. An edge leg loses its
/// outer pivot.
fn enforce_min_duration(pivots: &mut Vec<SwingPoint>, min_duration: usize) {
    loop {
        let shortest = pivots
            .windows(2)
            .enumerate()
            .map(|(j, w)| (w[1].index - w[0].index, j))
            .filter(|(len, _)| *len < min_duration)
            .min();
        let Some((_, j)) = shortest else {
            break;
        };

        let last = pivots.len() - 1;
        if j == 0 {
            pivots.remove(0);
        } else if j + 1 == last {
            pivots.remove(last);
        } else {
            pivots.remove(j + 1);
            let drop = if pivots[j + 1].more_extreme_than(&pivots[j]) {
                j
            } else {
                j + 1
            };
            pivots.remove(drop);
        }
    }
}

/// High-to-low waves of an alternating pivot sequence
pub fn waves(pivots: &[SwingPoint]) -> Vec<Wave> {
    pivots
        .windows(2)
        .filter(|w| w[0].kind == SwingKind::High && w[1].kind == SwingKind::Low)
        .filter(|w| w[0].price > 0.0)
        .map(|w| Wave {
            high_index: w[0].index,
            high: w[0].price,
            low_index: w[1].index,
            low: w[1].price,
            depth: (w[0].price - w[1].price) / w[0].price,
        })
        .collect()
}

/// Most recent swing low priced below `level`
pub fn last_swing_low(pivots: &[SwingPoint], level: f64) -> Option<&SwingPoint> {
    pivots
        .iter()
        .rev()
        .find(|p| p.kind == SwingKind::Low && p.price < level)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Piecewise-linear path through `(index, price)` anchors
    fn path(anchors: &[(usize, f64)]) -> Vec<f64> {
        let mut out = Vec::new();
        for w in anchors.windows(2) {
            let ((i0, p0), (i1, p1)) = (w[0], w[1]);
            for i in i0..i1 {
                out.push(p0 + (p1 - p0) * (i - i0) as f64 / (i1 - i0) as f64);
            }
        }
        if let Some(&(_, p)) = anchors.last() {
            out.push(p);
        }
        out
    }

    #[test]
    fn test_zigzag_pivots_alternate() {
        let prices = path(&[(0, 10.0), (5, 20.0), (10, 12.0), (15, 18.0), (20, 14.0), (25, 16.0)]);
        let pivots = segment(&prices, &prices, 4);

        let kinds: Vec<_> = pivots.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![SwingKind::High, SwingKind::Low, SwingKind::High, SwingKind::Low]);
        assert_eq!(pivots.iter().map(|p| p.index).collect::<Vec<_>>(), vec![5, 10, 15, 20]);
    }

    #[test]
    fn test_plateau_pivot_on_first_bar() {
        let prices = [1.0, 2.0, 5.0, 5.0, 2.0, 1.0];
        let pivots = segment(&prices, &prices, 2);
        assert_eq!(pivots, vec![SwingPoint { index: 2, price: 5.0, kind: SwingKind::High }]);
    }

    #[test]
    fn test_plateau_highs_and_lows_keep_their_swings() {
        let prices = [
            10.0, 12.0, 15.0, 15.0, 13.0, 11.0, 8.0, 8.0, 8.0, 10.0, 12.0, 14.0, 14.0, 12.0, 10.0,
        ];
        let pivots = segment(&prices, &prices, 2);

        let found: Vec<_> = pivots.iter().map(|p| (p.index, p.kind)).collect();
        assert_eq!(
            found,
            vec![(2, SwingKind::High), (6, SwingKind::Low), (11, SwingKind::High)]
        );
    }

    #[test]
    fn test_plateau_at_window_edge_is_not_a_pivot() {
        // the run reaches the last bar, so nothing follows it
        let prices = [1.0, 2.0, 3.0, 5.0, 5.0];
        assert!(segment(&prices, &prices, 2).is_empty());
    }

    #[test]
    fn test_flat_run_with_higher_neighbour_is_not_a_high() {
        let prices = [1.0, 5.0, 5.0, 6.0, 2.0, 1.0];
        let pivots = segment(&prices, &prices, 2);
        assert!(pivots.iter().all(|p| !(p.kind == SwingKind::High && p.index == 1)));
        assert!(pivots.iter().any(|p| p.kind == SwingKind::High && p.index == 3));
    }

    #[test]
    fn test_too_short_for_window() {
        assert!(segment(&[1.0, 3.0], &[1.0, 3.0], 5).is_empty());
        assert!(segment(&[], &[], 5).is_empty());
    }

    #[test]
    fn test_short_leg_is_absorbed() {
        // a 2-bar wiggle inside a 10-bar decline
        let prices = path(&[(0, 10.0), (6, 30.0), (10, 24.0), (12, 26.0), (18, 12.0), (24, 20.0)]);
        let pivots = segment(&prices, &prices, 2);
        // the raw sequence has the short 24 -> 26 leg; min_duration 5 removes it
        assert!(pivots.iter().any(|p| p.index == 12));

        let filtered = segment(&prices, &prices, 5);
        let legs: Vec<_> = filtered.windows(2).map(|w| w[1].index - w[0].index).collect();
        assert!(legs.iter().all(|len| *len >= 5), "{legs:?}");
        assert!(filtered.iter().any(|p| p.kind == SwingKind::High && p.index == 6));
        assert!(filtered.iter().any(|p| p.kind == SwingKind::Low && p.index == 18));
    }

    #[test]
    fn test_waves_and_depth() {
        let prices = path(&[(0, 90.0), (3, 100.0), (8, 80.0), (13, 95.0), (18, 90.0), (21, 93.0)]);
        let pivots = segment(&prices, &prices, 4);
        let waves = waves(&pivots);

        assert_eq!(waves.len(), 2);
        assert!((waves[0].depth - 0.2).abs() < 1e-12);
        assert_eq!((waves[1].high_index, waves[1].low_index), (13, 18));
    }

    #[test]
    fn test_last_swing_low() {
        let pivots = vec![
            SwingPoint { index: 1, price: 10.0, kind: SwingKind::Low },
            SwingPoint { index: 5, price: 20.0, kind: SwingKind::High },
            SwingPoint { index: 9, price: 15.0, kind: SwingKind::Low },
        ];
        assert_eq!(last_swing_low(&pivots, 18.0).map(|p| p.index), Some(9));
        assert_eq!(last_swing_low(&pivots, 12.0).map(|p| p.index), Some(1));
        assert!(last_swing_low(&pivots, 5.0).is_none());
    }
}
