//! Relative strength rating against a benchmark index
//!
//! The trailing return of the instrument is divided by the trailing return
//! of the benchmark on the same date, and the resulting ratios are turned
//! into a 0-100 percentile rank across every overlapping date.

use tracing::warn;

use super::helpers::pct_change;
use crate::series::{Column, PriceSeries};

/// RS rating column aligned with `series`.
///
/// Dates absent from the benchmark, and dates where either trailing return
/// is undefined or the benchmark return is zero, are undefined. Without any
/// overlap the whole column is undefined.
pub fn rs_rating(series: &PriceSeries, benchmark: &PriceSeries, lookback: usize) -> Column {
    let mut out = vec![None; series.len()];
    if !series.overlaps(benchmark) {
        warn!(
            symbol = series.symbol(),
            benchmark = benchmark.symbol(),
            "benchmark shares no dates with series"
        );
        return out;
    }

    let own = pct_change(&series.closes(), lookback);
    let base = pct_change(&benchmark.closes(), lookback);

    let mut ratios = Vec::new();
    for (i, bar) in series.bars().iter().enumerate() {
        let Some(j) = benchmark.index_of(bar.date) else {
            continue;
        };
        let (Some(r), Some(b)) = (own[i], base[j]) else {
            continue;
        };
        if b == 0.0 {
            continue;
        }
        let ratio = r / b;
        if ratio.is_finite() {
            ratios.push((i, ratio));
        }
    }

    let values: Vec<f64> = ratios.iter().map(|(_, r)| *r).collect();
    for ((i, _), rank) in ratios.iter().zip(percentile_rank(&values)) {
        out[*i] = Some(rank);
    }
    out
}

/// Percentile rank `rank / n * 100`, ranks 1-based with ties averaged
pub fn percentile_rank(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end share ranks start+1..=end
        let avg = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg / n as f64 * 100.0;
        }
        start = end;
    }
    ranks
}
