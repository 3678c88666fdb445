//! Integration tests for the SEPA analysis pipeline.
//!
//! Each scenario builds a synthetic price history with a known shape and
//! checks the indicators, patterns and recommendation end to end.

use chrono::{Days, NaiveDate};
use sepa::prelude::*;
use sepa::rules::PatternQuality;
use sepa::series::columns;

fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Days::new(i as u64)
}

/// Bars from closes with a relative high/low spread and constant volume
fn bars_from(closes: &[f64], spread: f64) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::new(day(i), c, c * (1.0 + spread), c * (1.0 - spread), c, 1_000.0))
        .collect()
}

/// Piecewise-linear closes through `(index, price)` anchors
fn path(anchors: &[(usize, f64)]) -> Vec<f64> {
    let mut out = Vec::new();
    for w in anchors.windows(2) {
        let ((i0, p0), (i1, p1)) = (w[0], w[1]);
        for i in i0..i1 {
            out.push(p0 + (p1 - p0) * (i - i0) as f64 / (i1 - i0) as f64);
        }
    }
    out.push(anchors[anchors.len() - 1].1);
    out
}

fn series(symbol: &str, bars: Vec<Bar>) -> PriceSeries {
    PriceSeries::new(symbol, bars).unwrap()
}

/// Linear index rising one point a day
fn benchmark(n: usize) -> PriceSeries {
    let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
    series("INDEX", bars_from(&closes, 0.0))
}

/// 300 bars compounding 1 % a day, with a volume surge on the last bar
fn leader() -> PriceSeries {
    let closes: Vec<f64> = (0..300).map(|i| 100.0 * 1.01f64.powi(i)).collect();
    let mut bars = bars_from(&closes, 0.005);
    bars[299].volume = 2_000.0;
    series("LEAD", bars)
}

/// Uptrend into three narrowing pullbacks (20 %, 12 %, 7 %), last volume high
fn vcp_setup() -> PriceSeries {
    let closes = path(&[
        (0, 40.0),
        (220, 100.0),
        (227, 80.0),
        (234, 98.0),
        (241, 86.24),
        (248, 97.0),
        (255, 90.21),
        (256, 92.0),
        (257, 94.0),
    ]);
    let mut bars = bars_from(&closes, 0.0);
    bars[257].volume = 3_000.0;
    series("VCPX", bars)
}

// ============================================================
// SCENARIOS
// ============================================================

#[test]
fn test_rising_leader_is_buy() {
    let engine = AnalysisEngine::default();
    let analysis = engine.analyze(&leader(), Some(&benchmark(300)));

    assert!(analysis.notes.is_empty(), "{:?}", analysis.notes);
    assert_eq!(analysis.trend_template.score, 6);
    assert!(!analysis.vcp.detected);

    let rec = &analysis.recommendation;
    assert_eq!(rec.recommendation, Recommendation::Buy);
    assert_eq!(rec.rule_results.passed(), 4);
    assert!(!rec.rule_results.pattern);
    assert!((rec.confidence - 1.0).abs() < 1e-12);
    assert!(rec.stop_loss < rec.entry_point && rec.entry_point < rec.target_price);
    assert!(rec.risk_reward_ratio >= 3.0 - 1e-9);
    assert_eq!(rec.rationale.trend_state, Trend::StrongUp);
    assert_eq!(rec.rationale.trend_direction, Direction::Bullish);
    assert!(rec.rationale.reasons.contains(&Reason::StrongTrend { score: 6 }));
}

#[test]
fn test_leader_rs_rating_tops_the_range() {
    let engine = AnalysisEngine::default();
    let analysis = engine.analyze(&leader(), Some(&benchmark(300)));

    assert_eq!(analysis.enriched.latest(columns::RS_RATING), Some(100.0));
    assert_eq!(analysis.enriched.value_at(columns::RS_RATING, 251), None);
    assert!(analysis.enriched.value_at(columns::RS_RATING, 252).is_some());
}

#[test]
fn test_flat_series_is_hold() {
    let engine = AnalysisEngine::default();
    let flat = series("FLAT", bars_from(&[50.0; 300], 0.0));
    let analysis = engine.analyze(&flat, None);

    assert_eq!(analysis.enriched.latest(&columns::rsi(14)), Some(50.0));
    assert!(analysis.enriched.latest(&columns::adx(14)).unwrap().abs() < 1e-9);
    assert!(analysis.notes.contains(&DataNote::FlatPrice));
    assert!(!analysis.vcp.detected);

    let rec = &analysis.recommendation;
    assert_eq!(rec.recommendation, Recommendation::Hold);
    assert!((rec.confidence - 0.5).abs() < 1e-12);
    assert_eq!(rec.rationale.trend_state, Trend::Sideways);
    assert_eq!(rec.rationale.trend_direction, Direction::Neutral);
    assert!(rec.rationale.reasons.contains(&Reason::FlatPrice));
}

#[test]
fn test_declining_series_is_sell() {
    let engine = AnalysisEngine::default();
    let closes: Vec<f64> = (0..300).map(|i| 400.0 - i as f64).collect();
    let analysis = engine.analyze(&series("DOWN", bars_from(&closes, 0.01)), None);

    assert_eq!(analysis.trend_template.score, 0);
    let rec = &analysis.recommendation;
    assert_eq!(rec.recommendation, Recommendation::Sell);
    assert_eq!(rec.rule_results.passed(), 1);
    assert!(rec.rule_results.earnings);
    assert!((rec.confidence - 0.6).abs() < 1e-12);
    assert_eq!(rec.rationale.trend_state, Trend::StrongDown);
    assert!(rec.rationale.reasons.contains(&Reason::NoVcpPattern));
}

#[test]
fn test_short_series_is_degraded() {
    let engine = AnalysisEngine::default();
    let closes = path(&[
        (0, 96.0),
        (1, 98.0),
        (2, 100.0),
        (9, 80.0),
        (16, 98.0),
        (23, 86.24),
        (30, 97.0),
        (37, 90.21),
        (38, 92.0),
        (39, 94.0),
    ]);
    let short = series("SHORT", bars_from(&closes, 0.0));
    let analysis = engine.analyze(&short, None);

    assert!(analysis.notes.contains(&DataNote::InsufficientHistory { need: 200, got: 40 }));
    assert_eq!(analysis.enriched.latest(&columns::sma(50)), None);
    assert_eq!(analysis.enriched.latest(&columns::sma(200)), None);
    assert!(analysis.enriched.latest(&columns::sma(20)).is_some());

    // the contraction exists but is not reported on short history
    assert!(!analysis.vcp.detected);
    let direct = VcpDetector::new(&VcpParams::default()).detect(&analysis.enriched);
    assert!(direct.detected);

    let rec = &analysis.recommendation;
    assert_eq!(rec.recommendation, Recommendation::Hold);
    assert!((rec.confidence - 0.1).abs() < 1e-12);
}

#[test]
fn test_vcp_after_uptrend_is_buy() {
    let engine = AnalysisEngine::default();
    let analysis = engine.analyze(&vcp_setup(), None);
    let vcp = &analysis.vcp;

    assert!(vcp.detected);
    assert_eq!(vcp.stage, Some(Stage::Stage2));
    assert_eq!(vcp.waves.len(), 3);
    assert!((vcp.contraction_fraction.unwrap() - 0.35).abs() < 0.01);
    assert_eq!(vcp.duration_bars, Some(36));
    assert_eq!(vcp.start_date, Some(day(220)));
    assert_eq!(vcp.end_date, Some(day(255)));

    assert_eq!(analysis.trend_template.score, 5);
    let rec = &analysis.recommendation;
    assert!(rec.rule_results.trend);
    assert!(rec.rule_results.pattern);
    assert!(rec.rule_results.volume);
    assert!(!rec.rule_results.relative_strength);
    assert_eq!(rec.recommendation, Recommendation::Buy);

    assert_eq!(rec.entry_point, 97.0);
    assert!(rec.stop_loss < 90.21);
    assert!((rec.stop_loss - 90.21 * 0.999).abs() < 1e-9);
    assert!((rec.risk_reward_ratio - 3.0).abs() < 1e-9);
    assert_eq!(rec.rationale.pattern_quality, PatternQuality::Medium);
}

#[test]
fn test_per_call_config_override() {
    let strict = AnalysisConfig {
        vcp: VcpParams {
            min_waves: 4,
            ..VcpParams::default()
        },
        ..AnalysisConfig::default()
    };
    let analysis = analyze_with_config(&vcp_setup(), None, &strict).unwrap();
    assert!(!analysis.vcp.detected);
    assert_eq!(analysis.recommendation.recommendation, Recommendation::Hold);
}

#[test]
fn test_misaligned_benchmark_leaves_rs_undefined() {
    let engine = AnalysisEngine::default();
    let later: Vec<Bar> = (0..300)
        .map(|i| {
            let c = 100.0 + i as f64;
            Bar::new(day(10_000 + i), c, c, c, c, 1.0)
        })
        .collect();
    let analysis = engine.analyze(&leader(), Some(&series("LATE", later)));

    assert!(analysis.notes.contains(&DataNote::MisalignedBenchmark));
    assert_eq!(analysis.enriched.latest(columns::RS_RATING), None);
    assert!(!analysis.trend_template.rs_rating_above_threshold);
}

// ============================================================
// SCREENING
// ============================================================

#[test]
fn test_screen_parallel_ranks_buys_first() {
    let engine = EngineBuilder::new().build().unwrap();
    let index = benchmark(300);

    let lead = leader().bars().to_vec();
    let down: Vec<Bar> = bars_from(&(0..300).map(|i| 400.0 - i as f64).collect::<Vec<_>>(), 0.01);
    let flat = bars_from(&[20.0; 300], 0.0);
    let instruments: Vec<(&str, &[Bar])> = vec![("FLAT", &flat), ("DOWN", &down), ("LEAD", &lead)];

    let (mut results, errors) = screen_parallel(&engine, instruments, Some(&index));
    assert!(errors.is_empty());
    assert_eq!(results.len(), 3);

    rank_by_confidence(&mut results);
    let order: Vec<_> = results.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(order, vec!["LEAD", "DOWN", "FLAT"]);
    assert_eq!(results[0].recommendation(), Recommendation::Buy);
}

#[test]
fn test_screen_parallel_reports_bad_data() {
    let engine = AnalysisEngine::default();
    let good = bars_from(&[10.0, 11.0, 12.0], 0.01);
    let mut unordered = good.clone();
    unordered.swap(1, 2);

    let instruments: Vec<(&str, &[Bar])> = vec![("GOOD", &good), ("BAD", &unordered)];
    let (results, errors) = screen_parallel(&engine, instruments, None);

    assert_eq!(results.len(), 1);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].symbol, "BAD");
    assert!(matches!(errors[0].error, SepaError::UnorderedDates { index: 2 }));
}

// ============================================================
// SERIALIZATION
// ============================================================

#[test]
fn test_analysis_serializes() {
    let engine = AnalysisEngine::default();
    let analysis = engine.analyze(&vcp_setup(), None);
    let value = serde_json::to_value(&analysis).unwrap();

    assert_eq!(value["symbol"], "VCPX");
    assert_eq!(value["recommendation"]["recommendation"], "Buy");
    assert_eq!(value["vcp"]["stage"], "Stage2");
    assert_eq!(value["trend_template"]["score"], 5);
    assert_eq!(value["notes"][0]["kind"], "missing_benchmark");
    assert_eq!(value["as_of"], "2020-09-14");
}
