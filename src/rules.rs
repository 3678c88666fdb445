//! SEPA rules, confidence and trade levels
//!
//! [`Recommender`] turns the trend template score, the VCP outcome and the
//! enriched series into a [`SepaRecommendation`]: five rule verdicts, a
//! Buy/Sell/Hold call with confidence, entry/stop/target levels and a
//! structured [`Rationale`].

use std::fmt;

use serde::Serialize;

use crate::params::{IndicatorParams, RuleParams};
use crate::patterns::stage::Stage;
use crate::patterns::swings;
use crate::patterns::trend_template::TrendTemplateResult;
use crate::patterns::vcp::VcpResult;
use crate::series::{columns, EnrichedSeries};
use crate::{DataNote, Direction, Trend};

// ============================================================
// RESULT TYPES
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Recommendation {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Recommendation::Buy => "Buy",
            Recommendation::Sell => "Sell",
            Recommendation::Hold => "Hold",
        })
    }
}

/// Verdict of each SEPA rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RuleResults {
    pub trend: bool,
    pub pattern: bool,
    pub volume: bool,
    pub relative_strength: bool,
    pub earnings: bool,
}

impl RuleResults {
    pub const TOTAL: u8 = 5;

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> {
        [
            ("trend", self.trend),
            ("pattern", self.pattern),
            ("volume", self.volume),
            ("relative_strength", self.relative_strength),
            ("earnings", self.earnings),
        ]
        .into_iter()
    }

    pub fn passed(&self) -> u8 {
        self.iter().filter(|(_, ok)| *ok).count() as u8
    }

    #[inline]
    pub fn total(&self) -> u8 {
        Self::TOTAL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PatternQuality {
    High,
    Medium,
    Low,
}

impl PatternQuality {
    fn of(vcp: &VcpResult) -> Self {
        match (vcp.detected, vcp.contraction_fraction) {
            (true, Some(c)) if c > 0.7 => PatternQuality::High,
            (true, _) => PatternQuality::Medium,
            _ => PatternQuality::Low,
        }
    }
}

/// One supporting fact behind a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reason {
    StrongTrend { score: u8 },
    WeakTrend { score: u8 },
    VcpPattern { stage: Option<Stage> },
    NoVcpPattern,
    DecliningStagePattern,
    AboveAverageVolume,
    BelowAverageVolume,
    StrongRelativeStrength,
    WeakRelativeStrength,
    MixedSignals { rules_passed: u8 },
    InsufficientHistory { need: usize, got: usize },
    FlatPrice,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::StrongTrend { score } => write!(f, "strong uptrend (trend template {score}/6)"),
            Reason::WeakTrend { score } => write!(f, "not in a strong uptrend (trend template {score}/6)"),
            Reason::VcpPattern { stage: Some(stage) } => write!(f, "volatility contraction pattern in {stage:?}"),
            Reason::VcpPattern { stage: None } => f.write_str("volatility contraction pattern"),
            Reason::NoVcpPattern => f.write_str("no volatility contraction pattern"),
            Reason::DecliningStagePattern => f.write_str("contraction pattern in a declining stage"),
            Reason::AboveAverageVolume => f.write_str("volume above its average"),
            Reason::BelowAverageVolume => f.write_str("volume not above its average"),
            Reason::StrongRelativeStrength => f.write_str("high relative strength against the market"),
            Reason::WeakRelativeStrength => f.write_str("weak relative strength against the market"),
            Reason::MixedSignals { rules_passed } => write!(f, "mixed signals ({rules_passed}/5 rules passed)"),
            Reason::InsufficientHistory { need, got } => write!(f, "insufficient history ({got} of {need} bars)"),
            Reason::FlatPrice => f.write_str("no price movement"),
        }
    }
}

/// Structured explanation of a recommendation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rationale {
    pub rules_passed: u8,
    pub total_rules: u8,
    pub trend_state: Trend,
    /// Trend template score over 6
    pub trend_strength: f64,
    pub trend_direction: Direction,
    pub pattern_quality: PatternQuality,
    /// Distance from entry to stop, percent of entry
    pub risk_percentage: f64,
    /// Distance from entry to target, percent of entry
    pub reward_percentage: f64,
    pub reasons: Vec<Reason>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SepaRecommendation {
    pub recommendation: Recommendation,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub entry_point: f64,
    pub stop_loss: f64,
    pub target_price: f64,
    pub risk_reward_ratio: f64,
    pub rule_results: RuleResults,
    pub rationale: Rationale,
}

/// Entry, stop and target of a trade
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PriceLevels {
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub risk_reward: f64,
}

// ============================================================
// RECOMMENDER
// ============================================================

/// Applies the SEPA rules to analysis facts
#[derive(Debug, Clone, Copy)]
pub struct Recommender<'a> {
    rules: &'a RuleParams,
    indicators: &'a IndicatorParams,
}

impl<'a> Recommender<'a> {
    pub fn new(rules: &'a RuleParams, indicators: &'a IndicatorParams) -> Self {
        Self { rules, indicators }
    }

    /// Combine the analysis facts into a recommendation.
    ///
    /// A degrading [`DataNote`] forces Hold with confidence scaled by the
    /// share of `required_bars` available; rule verdicts and levels are
    /// still reported.
    pub fn recommend(
        &self,
        enriched: &EnrichedSeries,
        template: &TrendTemplateResult,
        vcp: &VcpResult,
        notes: &[DataNote],
        required_bars: usize,
    ) -> SepaRecommendation {
        let rule_results = self.evaluate_rules(enriched, template, vcp);
        let passed = rule_results.passed();
        let score = template.score;
        let degraded = notes.iter().any(DataNote::degrades);

        let (recommendation, confidence) = if degraded {
            let coverage = if required_bars == 0 {
                1.0
            } else {
                (enriched.len() as f64 / required_bars as f64).min(1.0)
            };
            (Recommendation::Hold, 0.5 * coverage)
        } else {
            (self.decide(passed, score), confidence(passed, score))
        };

        let levels = self.price_levels(enriched, vcp);
        let (risk_percentage, reward_percentage) = if levels.entry > 0.0 {
            (
                (levels.entry - levels.stop) / levels.entry * 100.0,
                (levels.target - levels.entry) / levels.entry * 100.0,
            )
        } else {
            (0.0, 0.0)
        };

        let rationale = Rationale {
            rules_passed: passed,
            total_rules: rule_results.total(),
            trend_state: if degraded { Trend::Sideways } else { Trend::from_score(score) },
            trend_strength: f64::from(score) / f64::from(TrendTemplateResult::CHECKS),
            trend_direction: if degraded { Direction::Neutral } else { Direction::from_score(score) },
            pattern_quality: PatternQuality::of(vcp),
            risk_percentage,
            reward_percentage,
            reasons: reasons(recommendation, &rule_results, template, vcp, notes),
        };

        SepaRecommendation {
            recommendation,
            confidence,
            entry_point: levels.entry,
            stop_loss: levels.stop,
            target_price: levels.target,
            risk_reward_ratio: levels.risk_reward,
            rule_results,
            rationale,
        }
    }

    // ============================================================
    // RULES
    // ============================================================

    pub fn evaluate_rules(
        &self,
        enriched: &EnrichedSeries,
        template: &TrendTemplateResult,
        vcp: &VcpResult,
    ) -> RuleResults {
        let stage_ok = matches!(vcp.stage, None | Some(Stage::Stage2));
        RuleResults {
            trend: template.score >= self.rules.min_trend_score && stage_ok,
            pattern: vcp.detected,
            volume: self.volume_rule(enriched),
            relative_strength: enriched
                .latest(columns::RS_RATING)
                .is_some_and(|rs| rs >= self.rules.rs_threshold),
            earnings: true,
        }
    }

    /// Last volume above its rolling average, with a full averaging window
    fn volume_rule(&self, enriched: &EnrichedSeries) -> bool {
        let period = self.indicators.volume_period.get();
        if enriched.len() < period {
            return false;
        }
        let (Some(last), Some(avg)) = (
            enriched.series().last().map(|b| b.volume),
            enriched.latest(&columns::volume_sma(period)),
        ) else {
            return false;
        };
        last > avg
    }

    fn decide(&self, passed: u8, score: u8) -> Recommendation {
        let r = self.rules;
        if passed >= r.buy_min_rules && score >= r.min_trend_score {
            Recommendation::Buy
        } else if passed <= r.sell_max_rules || score <= r.sell_max_score {
            Recommendation::Sell
        } else {
            Recommendation::Hold
        }
    }

    // ============================================================
    // PRICE LEVELS
    // ============================================================

    /// Entry at the higher of last close and VCP pivot; stop `stop_buffer`
    /// under the structural low, capped at `max_stop_fraction` below entry; target at
    /// least `min_risk_reward` times the risk and no lower than the prior
    /// `target_lookback` high.
    pub fn price_levels(&self, enriched: &EnrichedSeries, vcp: &VcpResult) -> PriceLevels {
        let r = self.rules;
        let series = enriched.series();
        let Some(last) = series.last() else {
            return PriceLevels::default();
        };

        let pivot = vcp.pivot_high.filter(|_| vcp.detected);
        let entry = pivot.map_or(last.close, |p| last.close.max(p));
        if entry <= 0.0 || !entry.is_finite() {
            return PriceLevels::default();
        }

        let structural = vcp
            .range_floor
            .filter(|_| vcp.detected)
            .or_else(|| {
                let pivots = swings::segment(&series.highs(), &series.lows(), r.swing_min_duration.get());
                swings::last_swing_low(&pivots, entry).map(|p| p.price)
            })
            .map(|low| low * (1.0 - r.stop_buffer.get()))
            .unwrap_or_else(|| {
                let atr = enriched
                    .latest(&columns::atr(self.indicators.atr_period.get()))
                    .filter(|a| *a > 0.0)
                    .unwrap_or(entry * 0.02);
                entry - r.atr_stop_multiple * atr
            });

        let floor = entry * (1.0 - r.max_stop_fraction.get());
        let stop = if structural < entry {
            structural.max(floor)
        } else {
            floor
        };

        let risk = entry - stop;
        let lookback = r.target_lookback.get();
        let bars = series.bars();
        let prior_high = bars[bars.len().saturating_sub(lookback)..]
            .iter()
            .map(|b| b.high)
            .fold(f64::NEG_INFINITY, f64::max);
        let target = (entry + r.min_risk_reward * risk).max(prior_high);

        PriceLevels {
            entry,
            stop,
            target,
            risk_reward: (target - entry) / risk,
        }
    }
}

/// `min(0.5 + rules_passed / 10 + score / 20, 1)`
pub fn confidence(rules_passed: u8, score: u8) -> f64 {
    (0.5 + f64::from(rules_passed) / 10.0 + f64::from(score) / 20.0).min(1.0)
}

fn reasons(
    recommendation: Recommendation,
    rules: &RuleResults,
    template: &TrendTemplateResult,
    vcp: &VcpResult,
    notes: &[DataNote],
) -> Vec<Reason> {
    let mut out = Vec::new();
    for note in notes {
        match note {
            DataNote::InsufficientHistory { need, got } => out.push(Reason::InsufficientHistory {
                need: *need,
                got: *got,
            }),
            DataNote::FlatPrice => out.push(Reason::FlatPrice),
            DataNote::MissingBenchmark | DataNote::MisalignedBenchmark => {}
        }
    }
    let score = template.score;

    match recommendation {
        Recommendation::Buy => {
            if rules.trend {
                out.push(Reason::StrongTrend { score });
            }
            if rules.pattern {
                out.push(Reason::VcpPattern { stage: vcp.stage });
            }
            if rules.volume {
                out.push(Reason::AboveAverageVolume);
            }
            if rules.relative_strength {
                out.push(Reason::StrongRelativeStrength);
            }
        }
        Recommendation::Sell => {
            if !rules.trend {
                out.push(Reason::WeakTrend { score });
            }
            if !rules.pattern {
                out.push(Reason::NoVcpPattern);
            } else if vcp.stage == Some(Stage::Stage4) {
                out.push(Reason::DecliningStagePattern);
            }
            if !rules.volume {
                out.push(Reason::BelowAverageVolume);
            }
            if !rules.relative_strength {
                out.push(Reason::WeakRelativeStrength);
            }
        }
        Recommendation::Hold => out.push(Reason::MixedSignals {
            rules_passed: rules.passed(),
        }),
    }
    out
}

// ============================================================
// TESTS
// ============================================================
