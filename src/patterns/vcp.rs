//! Volatility Contraction Pattern detection
//!
//! A VCP is a run of consecutive pullbacks, each shallower than the one
//! before it, that tightens price into a pivot. Detection works on the
//! swing waves of [`super::swings`]:
//!
//! 1. every wave after the first must be strictly shallower than its
//!    predecessor, with a depth ratio inside
//!    `[min_contraction, max_contraction]`
//! 2. the run needs at least `min_waves` waves
//! 3. the run's span in bars must lie in `[min_duration, max_duration]`
//!
//! Among qualifying runs the one ending nearest the last bar wins; runs
//! with the same end prefer more waves.

use std::ops::Range;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use super::stage::{stage_at, Stage};
use super::swings::{self, Wave};
use crate::params::VcpParams;
use crate::series::EnrichedSeries;

/// Outcome of VCP detection. Dependent fields are empty when not detected.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct VcpResult {
    pub detected: bool,
    /// Stage at the end of the pattern
    pub stage: Option<Stage>,
    /// Depth of the last wave relative to the first, in (0, 1)
    pub contraction_fraction: Option<f64>,
    /// Bars from the first wave's high to the last wave's low, inclusive
    pub duration_bars: Option<usize>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Close change from the start to the end of the pattern
    pub price_change_fraction: Option<f64>,
    pub waves: Vec<Wave>,
    /// High of the final wave; the breakout level
    pub pivot_high: Option<f64>,
    /// Low of the final wave
    pub range_floor: Option<f64>,
}

impl VcpResult {
    pub fn not_detected() -> Self {
        Self::default()
    }
}

/// Detects the most recent VCP in an enriched series
#[derive(Debug, Clone, Copy)]
pub struct VcpDetector<'a> {
    params: &'a VcpParams,
}

impl<'a> VcpDetector<'a> {
    pub fn new(params: &'a VcpParams) -> Self {
        Self { params }
    }

    pub fn detect(&self, enriched: &EnrichedSeries) -> VcpResult {
        let series = enriched.series();
        let pivots = swings::segment(&series.highs(), &series.lows(), self.params.min_duration.get());
        let waves = swings::waves(&pivots);

        let Some(run) = self.find_run(&waves) else {
            debug!(symbol = series.symbol(), waves = waves.len(), "no VCP");
            return VcpResult::not_detected();
        };
        let run = &waves[run];
        let (Some(first), Some(last)) = (run.first(), run.last()) else {
            return VcpResult::not_detected();
        };

        let (start, end) = (first.high_index, last.low_index);
        let bars = series.bars();
        let start_close = bars[start].close;
        let price_change_fraction = (start_close != 0.0).then(|| bars[end].close / start_close - 1.0);
        let contraction_fraction = last.depth / first.depth;
        let stage = stage_at(enriched, end, self.params);

        debug!(
            symbol = series.symbol(),
            waves = run.len(),
            contraction_fraction,
            duration = end - start + 1,
            ?stage,
            "VCP detected"
        );

        VcpResult {
            detected: true,
            stage,
            contraction_fraction: Some(contraction_fraction),
            duration_bars: Some(end - start + 1),
            start_date: series.date_at(start),
            end_date: series.date_at(end),
            price_change_fraction,
            waves: run.to_vec(),
            pivot_high: Some(last.high),
            range_floor: Some(last.low),
        }
    }

    /// Whether `next` is a valid contraction of `prev`
    fn contracts(&self, prev: &Wave, next: &Wave) -> bool {
        if prev.depth <= 0.0 || next.depth <= 0.0 || next.depth >= prev.depth {
            return false;
        }
        let ratio = next.depth / prev.depth;
        ratio >= self.params.min_contraction.get() && ratio <= self.params.max_contraction.get()
    }

    /// Wave range of the winning run
    fn find_run(&self, waves: &[Wave]) -> Option<Range<usize>> {
        let min_waves = self.params.min_waves.max(2);
        let (min_span, max_span) = (self.params.min_duration.get(), self.params.max_duration.get());
        if waves.len() < min_waves {
            return None;
        }

        // first wave of the contracting chain ending at each wave
        let mut chain_start = vec![0; waves.len()];
        for i in 1..waves.len() {
            chain_start[i] = if self.contracts(&waves[i - 1], &waves[i]) {
                chain_start[i - 1]
            } else {
                i
            };
        }

        for end in (0..waves.len()).rev() {
            for start in chain_start[end]..=end {
                if end + 1 - start < min_waves {
                    break;
                }
                let span = waves[end].low_index + 1 - waves[start].high_index;
                if (min_span..=max_span).contains(&span) {
                    return Some(start..end + 1);
                }
            }
        }
        None
    }
}

// ============================================================
// TESTS
// ============================================================
