//! # SEPA - trend template and volatility contraction analysis
//!
//! Technical-analysis engine for daily equity prices: indicators, the
//! six-point trend template, Volatility Contraction Pattern detection and a
//! Buy/Sell/Hold recommendation with entry, stop and target levels.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{Days, NaiveDate};
//! use sepa::prelude::*;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
//! let bars: Vec<Bar> = (0..260)
//!     .map(|i| {
//!         let close = 50.0 + i as f64 * 0.25;
//!         Bar::new(start + Days::new(i), close, close + 0.5, close - 0.5, close, 1_000.0)
//!     })
//!     .collect();
//! let series = PriceSeries::new("ACME", bars).unwrap();
//!
//! let engine = EngineBuilder::new().build().unwrap();
//! let analysis = engine.analyze(&series, None);
//!
//! assert_eq!(analysis.trend_template.score, 5);
//! assert!(analysis.notes.contains(&DataNote::MissingBenchmark));
//! println!("{}: {}", analysis.symbol, analysis.recommendation.recommendation);
//! ```

pub mod indicators;
pub mod params;
pub mod patterns;
pub mod rules;
pub mod series;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::indicators::IndicatorCalculator;
use crate::params::{AnalysisConfig, IndicatorParams, RuleParams, TemplateParams, VcpParams};
use crate::patterns::trend_template::{TrendTemplate, TrendTemplateResult};
use crate::patterns::vcp::{VcpDetector, VcpResult};
use crate::rules::{Recommendation, Recommender, SepaRecommendation};
use crate::series::{EnrichedSeries, PriceSeries};

pub mod prelude {
    pub use crate::{
        // Engine
        analyze_with_config,
        // Pipeline stages
        indicators::IndicatorCalculator,
        // Parameters
        params::{
            get_period, get_ratio, AnalysisConfig, IndicatorParams, ParamMeta, ParamType,
            Parameterized, RuleParams, TemplateParams, VcpParams,
        },
        patterns::{Stage, TrendTemplate, TrendTemplateResult, VcpDetector, VcpResult},
        rank_by_confidence,
        rules::{Rationale, Reason, Recommendation, Recommender, RuleResults, SepaRecommendation},
        // Parallel
        screen_parallel,
        // Data
        series::{Bar, EnrichedSeries, PriceSeries},
        Analysis,
        AnalysisEngine,
        DataNote,
        Direction,
        EngineBuilder,
        OHLCVExt,
        Period,
        Ratio,
        Result,
        ScreenError,
        ScreenResult,
        // Errors
        SepaError,
        Trend,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, SepaError>;

/// Errors of configuration and data ingestion
#[derive(Debug, Clone, thiserror::Error)]
pub enum SepaError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },

    #[error("Dates not strictly ascending at index {index}")]
    UnorderedDates { index: usize },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(SepaError::InvalidValue("Ratio cannot be NaN or infinite"));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(SepaError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Window length in bars (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(usize);

impl Period {
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(SepaError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// A daily price bar supplied by the caller
pub trait OHLCV {
    fn date(&self) -> NaiveDate;
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    /// Split/dividend adjusted close; the raw close unless overridden
    fn adjusted_close(&self) -> f64 {
        self.close()
    }
}

impl<T: OHLCV + ?Sized> OHLCV for &T {
    fn date(&self) -> NaiveDate {
        (**self).date()
    }

    fn open(&self) -> f64 {
        (**self).open()
    }

    fn high(&self) -> f64 {
        (**self).high()
    }

    fn low(&self) -> f64 {
        (**self).low()
    }

    fn close(&self) -> f64 {
        (**self).close()
    }

    fn volume(&self) -> f64 {
        (**self).volume()
    }

    fn adjusted_close(&self) -> f64 {
        (**self).adjusted_close()
    }
}

/// Derived bar properties
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// Range extended to the prior close when price gapped
    #[inline]
    fn true_range(&self, prev_close: f64) -> f64 {
        self.range()
            .max((self.high() - prev_close).abs())
            .max((self.low() - prev_close).abs())
    }

    /// Check the OHLC invariants of a single bar.
    ///
    /// Errors carry index 0; [`PriceSeries::new`] fills in the position.
    fn validate(&self) -> Result<()> {
        let values = [self.open(), self.high(), self.low(), self.close(), self.volume()];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(SepaError::InvalidBar {
                index: 0,
                reason: "non-finite value",
            });
        }
        if values.iter().any(|v| *v < 0.0) {
            return Err(SepaError::InvalidBar {
                index: 0,
                reason: "negative value",
            });
        }
        if self.high() < self.open().max(self.close()).max(self.low()) {
            return Err(SepaError::InvalidBar {
                index: 0,
                reason: "high below open, close or low",
            });
        }
        if self.low() > self.open().min(self.close()) {
            return Err(SepaError::InvalidBar {
                index: 0,
                reason: "low above open or close",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV + ?Sized> OHLCVExt for T {}

// ============================================================
// TREND CLASSIFICATION
// ============================================================

/// Trend state summarised from the trend template score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
pub enum Trend {
    StrongUp,
    WeakUp,
    #[default]
    Sideways,
    WeakDown,
    StrongDown,
}

impl Trend {
    /// 5-6 strong up, 3-4 weak up, 2 weak down, 0-1 strong down
    pub fn from_score(score: u8) -> Self {
        match score {
            5.. => Trend::StrongUp,
            3..=4 => Trend::WeakUp,
            2 => Trend::WeakDown,
            _ => Trend::StrongDown,
        }
    }

    #[inline]
    pub fn is_down(self) -> bool {
        matches!(self, Trend::WeakDown | Trend::StrongDown)
    }

    #[inline]
    pub fn is_up(self) -> bool {
        matches!(self, Trend::WeakUp | Trend::StrongUp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    /// No call; used when the data is too degraded to read a trend
    Neutral,
    Bearish,
}

impl Direction {
    /// Bullish from a trend template score of 3, bearish below
    pub fn from_score(score: u8) -> Self {
        if score >= 3 {
            Direction::Bullish
        } else {
            Direction::Bearish
        }
    }

    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

// ============================================================
// ANALYSIS RESULT
// ============================================================

/// Data condition that limits how far an analysis can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataNote {
    /// Fewer bars than the longest moving average
    InsufficientHistory { need: usize, got: usize },
    /// No benchmark supplied; RS rating undefined
    MissingBenchmark,
    /// Benchmark shares no dates with the series
    MisalignedBenchmark,
    /// No price movement over the analysed window
    FlatPrice,
}

impl DataNote {
    /// Whether the note forces a Hold recommendation
    #[inline]
    pub fn degrades(&self) -> bool {
        matches!(self, DataNote::InsufficientHistory { .. } | DataNote::FlatPrice)
    }
}

/// Complete analysis of one instrument
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub symbol: String,
    /// Date of the latest bar
    pub as_of: Option<NaiveDate>,
    pub enriched: EnrichedSeries,
    pub trend_template: TrendTemplateResult,
    pub vcp: VcpResult,
    pub recommendation: SepaRecommendation,
    pub notes: Vec<DataNote>,
}

// ============================================================
// ANALYSIS ENGINE
// ============================================================

/// Runs the full pipeline with a validated configuration
#[derive(Debug, Clone, Default)]
pub struct AnalysisEngine {
    config: AnalysisConfig,
}

impl AnalysisEngine {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Bars needed before every moving average is defined
    #[inline]
    pub fn required_bars(&self) -> usize {
        self.config.indicators.max_window()
    }

    // ===========================================
    // LOW-LEVEL: Pipeline stages
    // ===========================================

    pub fn enrich(&self, series: &PriceSeries, benchmark: Option<&PriceSeries>) -> EnrichedSeries {
        IndicatorCalculator::new(&self.config.indicators).compute(series, benchmark)
    }

    pub fn trend_template(&self, enriched: &EnrichedSeries) -> TrendTemplateResult {
        TrendTemplate::new(&self.config.template).evaluate(enriched)
    }

    /// VCP detection, reported not detected on short history
    pub fn detect_vcp(&self, enriched: &EnrichedSeries) -> VcpResult {
        if enriched.len() < self.required_bars() {
            return VcpResult::not_detected();
        }
        VcpDetector::new(&self.config.vcp).detect(enriched)
    }

    /// Degraded-data conditions of a series and its benchmark
    pub fn data_notes(&self, series: &PriceSeries, benchmark: Option<&PriceSeries>) -> Vec<DataNote> {
        let mut notes = Vec::new();
        let need = self.required_bars();
        if series.len() < need {
            notes.push(DataNote::InsufficientHistory {
                need,
                got: series.len(),
            });
        }
        match benchmark {
            None => notes.push(DataNote::MissingBenchmark),
            Some(b) if !series.overlaps(b) => notes.push(DataNote::MisalignedBenchmark),
            Some(_) => {}
        }
        if series.is_flat(need) {
            notes.push(DataNote::FlatPrice);
        }
        notes
    }

    // ===========================================
    // MID-LEVEL: Recommendation
    // ===========================================

    pub fn recommend(
        &self,
        enriched: &EnrichedSeries,
        template: &TrendTemplateResult,
        vcp: &VcpResult,
        notes: &[DataNote],
    ) -> SepaRecommendation {
        Recommender::new(&self.config.rules, &self.config.indicators).recommend(
            enriched,
            template,
            vcp,
            notes,
            self.required_bars(),
        )
    }

    // ===========================================
    // HIGH-LEVEL: Full analysis
    // ===========================================

    /// Analyse a series against an optional benchmark.
    ///
    /// Never fails: short, flat or benchmark-less data yields a degraded
    /// result described by [`Analysis::notes`].
    pub fn analyze(&self, series: &PriceSeries, benchmark: Option<&PriceSeries>) -> Analysis {
        let notes = self.data_notes(series, benchmark);
        let enriched = self.enrich(series, benchmark);
        let trend_template = self.trend_template(&enriched);
        let vcp = self.detect_vcp(&enriched);
        let recommendation = self.recommend(&enriched, &trend_template, &vcp, &notes);

        debug!(
            symbol = series.symbol(),
            bars = series.len(),
            score = trend_template.score,
            vcp = vcp.detected,
            recommendation = %recommendation.recommendation,
            confidence = recommendation.confidence,
            "analysis complete"
        );

        Analysis {
            symbol: series.symbol().to_string(),
            as_of: series.last().map(|b| b.date),
            enriched,
            trend_template,
            vcp,
            recommendation,
            notes,
        }
    }

    /// Like [`Self::analyze`], but rejects series shorter than
    /// [`Self::required_bars`]
    pub fn analyze_strict(
        &self,
        series: &PriceSeries,
        benchmark: Option<&PriceSeries>,
    ) -> Result<Analysis> {
        let need = self.required_bars();
        if series.len() < need {
            return Err(SepaError::InsufficientData {
                need,
                got: series.len(),
            });
        }
        Ok(self.analyze(series, benchmark))
    }
}

/// One-off analysis with a per-call configuration
pub fn analyze_with_config(
    series: &PriceSeries,
    benchmark: Option<&PriceSeries>,
    config: &AnalysisConfig,
) -> Result<Analysis> {
    let engine = AnalysisEngine::new(config.clone())?;
    Ok(engine.analyze(series, benchmark))
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`AnalysisEngine`]
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    config: AnalysisConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn indicators(mut self, params: IndicatorParams) -> Self {
        self.config.indicators = params;
        self
    }

    pub fn template(mut self, params: TemplateParams) -> Self {
        self.config.template = params;
        self
    }

    pub fn vcp(mut self, params: VcpParams) -> Self {
        self.config.vcp = params;
        self
    }

    pub fn rules(mut self, params: RuleParams) -> Self {
        self.config.rules = params;
        self
    }

    /// RS rating threshold of both the trend template and the RS rule
    pub fn rs_threshold(mut self, threshold: f64) -> Self {
        self.config.template.rs_threshold = threshold;
        self.config.rules.rs_threshold = threshold;
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<AnalysisEngine> {
        AnalysisEngine::new(self.config)
    }
}

// ============================================================
// PARALLEL SCREENING
// ============================================================

use rayon::prelude::*;

/// Analysis of a single screened instrument
#[derive(Debug, Clone, Serialize)]
pub struct ScreenResult {
    pub symbol: String,
    pub analysis: Analysis,
}

impl ScreenResult {
    #[inline]
    pub fn recommendation(&self) -> Recommendation {
        self.analysis.recommendation.recommendation
    }

    #[inline]
    pub fn confidence(&self) -> f64 {
        self.analysis.recommendation.confidence
    }
}

/// Ingestion failure of a single screened instrument
#[derive(Debug)]
pub struct ScreenError {
    pub symbol: String,
    pub error: SepaError,
}

/// Analyse many instruments in parallel against one benchmark.
///
/// Results come back in no particular order.
pub fn screen_parallel<'a, T, I>(
    engine: &AnalysisEngine,
    instruments: I,
    benchmark: Option<&PriceSeries>,
) -> (Vec<ScreenResult>, Vec<ScreenError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            PriceSeries::from_ohlcv(symbol, bars)
                .map(|series| ScreenResult {
                    symbol: symbol.to_string(),
                    analysis: engine.analyze(&series, benchmark),
                })
                .map_err(|error| {
                    warn!(symbol, %error, "instrument rejected");
                    ScreenError {
                        symbol: symbol.to_string(),
                        error,
                    }
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

/// Order screening results: Buy first, then confidence descending, then symbol
pub fn rank_by_confidence(results: &mut [ScreenResult]) {
    results.sort_by(|a, b| {
        let a_buy = a.recommendation() == Recommendation::Buy;
        let b_buy = b.recommendation() == Recommendation::Buy;
        b_buy
            .cmp(&a_buy)
            .then_with(|| b.confidence().total_cmp(&a.confidence()))
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
}

// ============================================================
// TESTS
// ============================================================
