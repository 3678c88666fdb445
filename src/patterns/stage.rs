//! Weinstein market stage classification

use serde::{Deserialize, Serialize};

use crate::params::VcpParams;
use crate::series::{columns, EnrichedSeries};

/// Market stage of a price trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Basing: flat long-term average after no prior advance
    Stage1,
    /// Advancing: price above rising averages
    Stage2,
    /// Topping: the advance stalls
    Stage3,
    /// Declining: price below falling averages
    Stage4,
}

/// Facts about one bar that decide its stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageInputs {
    pub close: f64,
    pub medium_ma: f64,
    pub long_ma: f64,
    /// Relative change of the long average over the slope window
    pub long_ma_slope: f64,
    /// Close change over the prior-year window
    pub prior_change: f64,
}

/// Classify a bar; `None` when no stage description fits
pub fn classify_stage(inputs: &StageInputs, flat_threshold: f64) -> Option<Stage> {
    let StageInputs {
        close,
        medium_ma,
        long_ma,
        long_ma_slope: slope,
        prior_change,
    } = *inputs;

    let rising = slope > flat_threshold;
    let falling = slope < -flat_threshold;
    let advanced = prior_change > flat_threshold;

    if close > medium_ma && medium_ma > long_ma && rising {
        return Some(Stage::Stage2);
    }
    if close < medium_ma && close < long_ma && falling && prior_change < 0.0 {
        return Some(Stage::Stage4);
    }
    if advanced && (!rising || close < medium_ma) {
        return Some(Stage::Stage3);
    }
    if !rising && !falling && !advanced {
        return Some(Stage::Stage1);
    }
    None
}

/// Stage of bar `index`, from the configured stage averages.
///
/// `None` when either average, or the long average one slope window
/// earlier, is undefined.
pub fn stage_at(enriched: &EnrichedSeries, index: usize, params: &VcpParams) -> Option<Stage> {
    let medium_name = columns::sma(params.stage_medium_ma.get());
    let long_name = columns::sma(params.stage_long_ma.get());

    let medium_ma = enriched.value_at(&medium_name, index)?;
    let long_ma = enriched.value_at(&long_name, index)?;
    let earlier = index
        .checked_sub(params.stage_slope_period.get())
        .and_then(|i| enriched.value_at(&long_name, i))?;
    if earlier == 0.0 {
        return None;
    }

    let bars = enriched.series().bars();
    let close = bars.get(index)?.close;
    let base = bars[index.saturating_sub(params.stage_lookback.get())].close;
    let prior_change = if base > 0.0 { close / base - 1.0 } else { 0.0 };

    let inputs = StageInputs {
        close,
        medium_ma,
        long_ma,
        long_ma_slope: (long_ma - earlier) / earlier,
        prior_change,
    };
    classify_stage(&inputs, params.stage_flat_threshold.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(close: f64, medium: f64, long: f64, slope: f64, prior: f64) -> StageInputs {
        StageInputs {
            close,
            medium_ma: medium,
            long_ma: long,
            long_ma_slope: slope,
            prior_change: prior,
        }
    }

    #[test]
    fn test_stage2_advancing() {
        let s = classify_stage(&inputs(120.0, 110.0, 100.0, 0.05, 0.4), 0.01);
        assert_eq!(s, Some(Stage::Stage2));
    }

    #[test]
    fn test_stage4_declining() {
        let s = classify_stage(&inputs(80.0, 90.0, 100.0, -0.05, -0.3), 0.01);
        assert_eq!(s, Some(Stage::Stage4));
    }

    #[test]
    fn test_stage3_stalling_after_advance() {
        let flat_after_run = classify_stage(&inputs(105.0, 104.0, 100.0, 0.0, 0.5), 0.01);
        assert_eq!(flat_after_run, Some(Stage::Stage3));

        let broke_medium = classify_stage(&inputs(101.0, 104.0, 100.0, 0.03, 0.5), 0.01);
        assert_eq!(broke_medium, Some(Stage::Stage3));
    }

    #[test]
    fn test_stage1_basing() {
        let s = classify_stage(&inputs(50.0, 50.5, 51.0, 0.002, -0.1), 0.01);
        assert_eq!(s, Some(Stage::Stage1));
    }

    #[test]
    fn test_no_stage() {
        // falling average, price below, but the prior year still positive
        let s = classify_stage(&inputs(95.0, 98.0, 100.0, -0.05, 0.005), 0.01);
        assert_eq!(s, None);
    }
}
