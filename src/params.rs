//! Analysis configuration and parameter metadata
//!
//! Every threshold and window the engine uses lives in [`AnalysisConfig`].
//! Configuration is always passed explicitly, never read from the
//! environment, so each call can override it.
//!
//! Parameter metadata enables:
//! - Grid search over VCP and rule thresholds
//! - Parameter documentation
//! - Building parameter sets from loosely typed maps
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use sepa::params::{Parameterized, VcpParams};
//!
//! for param in VcpParams::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut overrides = HashMap::new();
//! overrides.insert("min_contraction", 0.4);
//! let vcp = VcpParams::with_params(&overrides).unwrap();
//! assert_eq!(vcp.min_contraction.get(), 0.4);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Period, Ratio, Result, SepaError};

// ============================================================
// INDICATOR PARAMETERS
// ============================================================

/// Windows and spans for [`crate::indicators::IndicatorCalculator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
  pub sma_windows: Vec<Period>,
  pub ema_spans: Vec<Period>,
  pub rsi_period: Period,
  pub macd_fast: Period,
  pub macd_slow: Period,
  pub macd_signal: Period,
  pub bollinger_period: Period,
  /// Band distance in standard deviations
  pub bollinger_std: f64,
  pub atr_period: Period,
  pub adx_period: Period,
  pub stoch_k: Period,
  pub stoch_d: Period,
  /// Rolling average volume window (volume rule)
  pub volume_period: Period,
  /// Trailing return window of the RS rating (one trading year)
  pub rs_lookback: Period,
}

impl Default for IndicatorParams {
  fn default() -> Self {
    Self {
      sma_windows: [20, 50, 150, 200].into_iter().map(Period::new_const).collect(),
      ema_spans: [12, 26, 50, 200].into_iter().map(Period::new_const).collect(),
      rsi_period: Period::new_const(14),
      macd_fast: Period::new_const(12),
      macd_slow: Period::new_const(26),
      macd_signal: Period::new_const(9),
      bollinger_period: Period::new_const(20),
      bollinger_std: 2.0,
      atr_period: Period::new_const(14),
      adx_period: Period::new_const(14),
      stoch_k: Period::new_const(14),
      stoch_d: Period::new_const(3),
      volume_period: Period::new_const(50),
      rs_lookback: Period::new_const(252),
    }
  }
}

impl IndicatorParams {
  /// Largest moving-average window; shorter series count as insufficient history
  pub fn max_window(&self) -> usize {
    self.sma_windows.iter().chain(&self.ema_spans).map(|p| p.get()).max().unwrap_or(0)
  }

  pub fn has_sma(&self, window: Period) -> bool {
    self.sma_windows.contains(&window)
  }

  pub fn validate(&self) -> Result<()> {
    if self.macd_fast >= self.macd_slow {
      return Err(SepaError::InvalidConfig(format!(
        "macd_fast ({}) must be shorter than macd_slow ({})",
        self.macd_fast.get(),
        self.macd_slow.get()
      )));
    }
    if !self.bollinger_std.is_finite() || self.bollinger_std <= 0.0 {
      return Err(SepaError::InvalidValue("bollinger_std must be positive"));
    }
    Ok(())
  }
}

// ============================================================
// TREND TEMPLATE PARAMETERS
// ============================================================

/// Moving averages and RS threshold of the six-point trend template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateParams {
  pub short_ma: Period,
  pub medium_ma: Period,
  pub long_ma: Period,
  pub rs_threshold: f64,
}

impl Default for TemplateParams {
  fn default() -> Self {
    Self {
      short_ma: Period::new_const(50),
      medium_ma: Period::new_const(150),
      long_ma: Period::new_const(200),
      rs_threshold: 70.0,
    }
  }
}

impl TemplateParams {
  pub fn validate(&self) -> Result<()> {
    if !(self.short_ma < self.medium_ma && self.medium_ma < self.long_ma) {
      return Err(SepaError::InvalidConfig(
        "trend template requires short_ma < medium_ma < long_ma".into(),
      ));
    }
    check_rating("rs_threshold", self.rs_threshold)
  }
}

// ============================================================
// VCP PARAMETERS
// ============================================================

/// Thresholds of VCP detection and stage classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VcpParams {
  /// Lowest accepted depth ratio of a wave to the previous wave
  pub min_contraction: Ratio,
  /// Highest accepted depth ratio of a wave to the previous wave
  pub max_contraction: Ratio,
  /// Minimum swing leg length and minimum pattern span, in bars
  pub min_duration: Period,
  /// Maximum pattern span, in bars
  pub max_duration: Period,
  /// Contraction waves required for a pattern
  pub min_waves: usize,
  pub stage_medium_ma: Period,
  pub stage_long_ma: Period,
  /// Bars over which the long average's slope is measured
  pub stage_slope_period: Period,
  /// Relative change treated as "flat" for slopes and yearly trend
  pub stage_flat_threshold: Ratio,
  /// Prior-year window for the overall trend
  pub stage_lookback: Period,
}

impl Default for VcpParams {
  fn default() -> Self {
    Self {
      min_contraction: Ratio::new_const(0.5),
      max_contraction: Ratio::new_const(0.9),
      min_duration: Period::new_const(5),
      max_duration: Period::new_const(100),
      min_waves: 3,
      stage_medium_ma: Period::new_const(150),
      stage_long_ma: Period::new_const(200),
      stage_slope_period: Period::new_const(20),
      stage_flat_threshold: Ratio::new_const(0.01),
      stage_lookback: Period::new_const(252),
    }
  }
}

impl VcpParams {
  pub fn validate(&self) -> Result<()> {
    if self.min_contraction.get() <= 0.0 {
      return Err(SepaError::InvalidValue("min_contraction must be > 0"));
    }
    if self.min_contraction > self.max_contraction {
      return Err(SepaError::InvalidConfig(format!(
        "min_contraction ({}) exceeds max_contraction ({})",
        self.min_contraction.get(),
        self.max_contraction.get()
      )));
    }
    if self.min_duration > self.max_duration {
      return Err(SepaError::InvalidConfig(format!(
        "min_duration ({}) exceeds max_duration ({})",
        self.min_duration.get(),
        self.max_duration.get()
      )));
    }
    if self.min_waves < 2 {
      return Err(SepaError::OutOfRange {
        field: "min_waves",
        value: self.min_waves as f64,
        min: 2.0,
        max: f64::INFINITY,
      });
    }
    if self.stage_medium_ma >= self.stage_long_ma {
      return Err(SepaError::InvalidConfig(
        "stage_medium_ma must be shorter than stage_long_ma".into(),
      ));
    }
    Ok(())
  }
}

// ============================================================
// RULE PARAMETERS
// ============================================================

/// Thresholds of the recommendation rules and price levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleParams {
  pub min_trend_score: u8,
  pub rs_threshold: f64,
  pub buy_min_rules: u8,
  pub sell_max_rules: u8,
  pub sell_max_score: u8,
  /// Leg length for locating the most recent swing low
  pub swing_min_duration: Period,
  /// Target is at least this multiple of the risk
  pub min_risk_reward: f64,
  /// Stop never sits further than this fraction below entry
  pub max_stop_fraction: Ratio,
  /// Stop sits this fraction below a structural low
  pub stop_buffer: Ratio,
  /// Fallback stop distance in ATRs
  pub atr_stop_multiple: f64,
  /// Window of the prior high used as structural target
  pub target_lookback: Period,
}

impl Default for RuleParams {
  fn default() -> Self {
    Self {
      min_trend_score: 5,
      rs_threshold: 70.0,
      buy_min_rules: 4,
      sell_max_rules: 2,
      sell_max_score: 2,
      swing_min_duration: Period::new_const(5),
      min_risk_reward: 3.0,
      max_stop_fraction: Ratio::new_const(0.08),
      stop_buffer: Ratio::new_const(0.001),
      atr_stop_multiple: 2.0,
      target_lookback: Period::new_const(252),
    }
  }
}

impl RuleParams {
  pub fn validate(&self) -> Result<()> {
    if self.min_trend_score > 6 || self.sell_max_score > 6 {
      return Err(SepaError::OutOfRange {
        field: "trend score threshold",
        value: self.min_trend_score.max(self.sell_max_score) as f64,
        min: 0.0,
        max: 6.0,
      });
    }
    if self.buy_min_rules > 5 || self.sell_max_rules > 5 {
      return Err(SepaError::OutOfRange {
        field: "rule count threshold",
        value: self.buy_min_rules.max(self.sell_max_rules) as f64,
        min: 0.0,
        max: 5.0,
      });
    }
    check_rating("rs_threshold", self.rs_threshold)?;
    if !self.min_risk_reward.is_finite() || self.min_risk_reward <= 0.0 {
      return Err(SepaError::InvalidValue("min_risk_reward must be positive"));
    }
    let stop = self.max_stop_fraction.get();
    if stop <= 0.0 || stop >= 1.0 {
      return Err(SepaError::OutOfRange {
        field: "max_stop_fraction",
        value: stop,
        min: 0.0,
        max: 1.0,
      });
    }
    if self.stop_buffer >= self.max_stop_fraction {
      return Err(SepaError::InvalidConfig(format!(
        "stop_buffer ({}) must be below max_stop_fraction ({})",
        self.stop_buffer.get(),
        stop
      )));
    }
    if !self.atr_stop_multiple.is_finite() || self.atr_stop_multiple <= 0.0 {
      return Err(SepaError::InvalidValue("atr_stop_multiple must be positive"));
    }
    Ok(())
  }
}

// ============================================================
// FULL CONFIGURATION
// ============================================================

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
  pub indicators: IndicatorParams,
  pub template: TemplateParams,
  pub vcp: VcpParams,
  pub rules: RuleParams,
}

impl AnalysisConfig {
  /// Validate each section and the windows they share
  pub fn validate(&self) -> Result<()> {
    self.indicators.validate()?;
    self.template.validate()?;
    self.vcp.validate()?;
    self.rules.validate()?;

    let required = [
      ("template.short_ma", self.template.short_ma),
      ("template.medium_ma", self.template.medium_ma),
      ("template.long_ma", self.template.long_ma),
      ("vcp.stage_medium_ma", self.vcp.stage_medium_ma),
      ("vcp.stage_long_ma", self.vcp.stage_long_ma),
    ];
    for (name, window) in required {
      if !self.indicators.has_sma(window) {
        return Err(SepaError::InvalidConfig(format!(
          "{name} = {} is not among the configured SMA windows",
          window.get()
        )));
      }
    }
    Ok(())
  }
}

fn check_rating(field: &'static str, value: f64) -> Result<()> {
  if value.is_nan() || !(0.0..=100.0).contains(&value) {
    return Err(SepaError::OutOfRange { field, value, min: 0.0, max: 100.0 });
  }
  Ok(())
}

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Ratio value (0.0..=1.0)
  Ratio,
  /// Period value (positive integer)
  Period,
  /// Whole-number count
  Count,
  /// Real value
  Value,
}

/// Metadata for a single parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "min_contraction")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn count(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Count, default, range, description }
  }

  pub const fn value(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Value, default, range, description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    let mut v = min;
    while v <= max + f64::EPSILON {
      values.push(v);
      v += step;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value.is_nan() || value < min || value > max {
      return Err(SepaError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio => Ratio::new(value).map(|_| ()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(SepaError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
      ParamType::Count => {
        if value.fract() != 0.0 {
          return Err(SepaError::OutOfRange { field: self.name, value, min, max });
        }
        Ok(())
      },
      ParamType::Value => Ok(()),
    }
  }
}

/// Check every supplied value against its parameter's metadata
pub fn validate_params(meta: &[ParamMeta], params: &HashMap<&str, f64>) -> Result<()> {
  for m in meta {
    if let Some(&value) = params.get(m.name) {
      m.validate(value)?;
    }
  }
  Ok(())
}

// ============================================================
// PARAMETERIZED TRAIT
// ============================================================

/// Parameter sets that can be discovered and built from a map
pub trait Parameterized: Sized {
  /// Returns metadata for all tunable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Builds a parameter set from a HashMap; missing keys keep their defaults.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  /// Configuration section name
  fn section() -> &'static str;
}

static VCP_PARAMS: [ParamMeta; 5] = [
  ParamMeta::ratio("min_contraction", 0.5, (0.3, 0.7, 0.05), "Lowest wave-to-previous-wave depth ratio"),
  ParamMeta::ratio("max_contraction", 0.9, (0.7, 0.95, 0.05), "Highest wave-to-previous-wave depth ratio"),
  ParamMeta::period("min_duration", 5.0, (3.0, 15.0, 1.0), "Minimum leg length and pattern span"),
  ParamMeta::period("max_duration", 100.0, (40.0, 250.0, 10.0), "Maximum pattern span"),
  ParamMeta::count("min_waves", 3.0, (2.0, 6.0, 1.0), "Contraction waves required"),
];

impl Parameterized for VcpParams {
  fn param_meta() -> &'static [ParamMeta] {
    &VCP_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    validate_params(Self::param_meta(), params)?;
    let defaults = Self::default();
    let vcp = Self {
      min_contraction: get_ratio(params, "min_contraction", defaults.min_contraction.get())?,
      max_contraction: get_ratio(params, "max_contraction", defaults.max_contraction.get())?,
      min_duration: get_period(params, "min_duration", defaults.min_duration.get())?,
      max_duration: get_period(params, "max_duration", defaults.max_duration.get())?,
      min_waves: get_value(params, "min_waves", defaults.min_waves as f64) as usize,
      ..defaults
    };
    vcp.validate()?;
    Ok(vcp)
  }

  fn section() -> &'static str {
    "vcp"
  }
}

static RULE_PARAMS: [ParamMeta; 5] = [
  ParamMeta::count("min_trend_score", 5.0, (3.0, 6.0, 1.0), "Trend template score for the trend rule"),
  ParamMeta::value("rs_threshold", 70.0, (50.0, 90.0, 5.0), "RS rating for the relative-strength rule"),
  ParamMeta::value("min_risk_reward", 3.0, (1.5, 5.0, 0.5), "Minimum reward multiple of the risk"),
  ParamMeta::ratio("max_stop_fraction", 0.08, (0.03, 0.15, 0.01), "Maximum stop distance below entry"),
  ParamMeta::value("atr_stop_multiple", 2.0, (1.0, 4.0, 0.5), "Fallback stop distance in ATRs"),
];

impl Parameterized for RuleParams {
  fn param_meta() -> &'static [ParamMeta] {
    &RULE_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    validate_params(Self::param_meta(), params)?;
    let defaults = Self::default();
    let rules = Self {
      min_trend_score: get_value(params, "min_trend_score", defaults.min_trend_score as f64) as u8,
      rs_threshold: get_value(params, "rs_threshold", defaults.rs_threshold),
      min_risk_reward: get_value(params, "min_risk_reward", defaults.min_risk_reward),
      max_stop_fraction: get_ratio(params, "max_stop_fraction", defaults.max_stop_fraction.get())?,
      atr_stop_multiple: get_value(params, "atr_stop_multiple", defaults.atr_stop_multiple),
      ..defaults
    };
    rules.validate()?;
    Ok(rules)
  }

  fn section() -> &'static str {
    "rules"
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if !value.is_finite() || value.fract() != 0.0 || value < 0.0 {
    return Err(SepaError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

/// Helper to get a plain value from params with default fallback
pub fn get_value(params: &HashMap<&str, f64>, key: &str, default: f64) -> f64 {
  params.get(key).copied().unwrap_or(default)
}

// ============================================================
// TESTS
// ============================================================
