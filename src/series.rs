//! Price series data model
//!
//! [`Bar`] and [`PriceSeries`] are the validated input of the engine;
//! [`EnrichedSeries`] is the series plus the named indicator columns
//! produced by [`crate::indicators::IndicatorCalculator`].

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{OHLCVExt, Result, SepaError, OHLCV};

// ============================================================
// BAR
// ============================================================

/// One trading day of OHLCV data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adjusted_close: f64,
    pub volume: f64,
}

impl Bar {
    /// Bar with `adjusted_close == close`
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            adjusted_close: close,
            volume,
        }
    }
}

impl OHLCV for Bar {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn adjusted_close(&self) -> f64 {
        self.adjusted_close
    }
}

// ============================================================
// PRICE SERIES
// ============================================================

/// Validated, date-ordered bars of a single instrument.
///
/// Construction is the ingestion boundary: bars violating the OHLC
/// invariants and unordered or duplicate dates are rejected here, so every
/// downstream stage can rely on a clean series. An empty series is valid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self> {
        for (index, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                SepaError::InvalidBar { reason, .. } => SepaError::InvalidBar { index, reason },
                other => other,
            })?;
            if adjusted_close_invalid(bar) {
                return Err(SepaError::InvalidBar {
                    index,
                    reason: "adjusted close must be finite and non-negative",
                });
            }
        }

        if let Some(index) = bars
            .windows(2)
            .position(|w| w[1].date <= w[0].date)
            .map(|i| i + 1)
        {
            return Err(SepaError::UnorderedDates { index });
        }

        Ok(Self {
            symbol: symbol.into(),
            bars,
        })
    }

    /// Ingest any [`OHLCV`] implementation
    pub fn from_ohlcv<T: OHLCV>(symbol: impl Into<String>, bars: &[T]) -> Result<Self> {
        let bars = bars
            .iter()
            .map(|b| Bar {
                date: b.date(),
                open: b.open(),
                high: b.high(),
                low: b.low(),
                close: b.close(),
                adjusted_close: b.adjusted_close(),
                volume: b.volume(),
            })
            .collect();
        Self::new(symbol, bars)
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    #[inline]
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    #[inline]
    pub fn date_at(&self, index: usize) -> Option<NaiveDate> {
        self.bars.get(index).map(|b| b.date)
    }

    /// Position of `date`, if the series has a bar on that day
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by(|b| b.date.cmp(&date)).ok()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// True if both series have at least one date in common
    pub fn overlaps(&self, other: &PriceSeries) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.bars.len() && j < other.bars.len() {
            match self.bars[i].date.cmp(&other.bars[j].date) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => return true,
            }
        }
        false
    }

    /// True if the last `window` closes carry no price movement at all
    pub fn is_flat(&self, window: usize) -> bool {
        let start = self.bars.len().saturating_sub(window);
        let tail = &self.bars[start..];
        if tail.is_empty() {
            return false;
        }
        let (min, max) = tail.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| {
            (lo.min(b.close), hi.max(b.close))
        });
        max - min <= f64::EPSILON * max.abs().max(1.0)
    }
}

fn adjusted_close_invalid(bar: &Bar) -> bool {
    !bar.adjusted_close.is_finite() || bar.adjusted_close < 0.0
}

#[derive(Deserialize)]
struct RawSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl<'de> Deserialize<'de> for PriceSeries {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = RawSeries::deserialize(d)?;
        PriceSeries::new(raw.symbol, raw.bars).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// COLUMN NAMES
// ============================================================

/// Indicator column names used in [`EnrichedSeries`]
pub mod columns {
    pub const MACD: &str = "macd";
    pub const MACD_SIGNAL: &str = "macd_signal";
    pub const MACD_HISTOGRAM: &str = "macd_histogram";
    pub const OBV: &str = "obv";
    pub const RS_RATING: &str = "rs_rating";
    pub const DAILY_CHANGE: &str = "daily_change";
    pub const DAILY_VOLATILITY: &str = "daily_volatility";

    pub fn sma(window: usize) -> String {
        format!("sma_{window}")
    }

    pub fn ema(span: usize) -> String {
        format!("ema_{span}")
    }

    pub fn rsi(period: usize) -> String {
        format!("rsi_{period}")
    }

    pub fn bb_middle(period: usize) -> String {
        format!("bb_middle_{period}")
    }

    pub fn bb_upper(period: usize) -> String {
        format!("bb_upper_{period}")
    }

    pub fn bb_lower(period: usize) -> String {
        format!("bb_lower_{period}")
    }

    pub fn bb_width(period: usize) -> String {
        format!("bb_width_{period}")
    }

    pub fn atr(period: usize) -> String {
        format!("atr_{period}")
    }

    pub fn plus_di(period: usize) -> String {
        format!("plus_di_{period}")
    }

    pub fn minus_di(period: usize) -> String {
        format!("minus_di_{period}")
    }

    pub fn dx(period: usize) -> String {
        format!("dx_{period}")
    }

    pub fn adx(period: usize) -> String {
        format!("adx_{period}")
    }

    pub fn stoch_k(k_period: usize) -> String {
        format!("stoch_k_{k_period}")
    }

    pub fn stoch_d(k_period: usize, d_period: usize) -> String {
        format!("stoch_d_{k_period}_{d_period}")
    }

    pub fn volume_sma(period: usize) -> String {
        format!("volume_sma_{period}")
    }
}

// ============================================================
// ENRICHED SERIES
// ============================================================

/// Indicator values aligned with the bars; `None` = undefined
pub type Column = Vec<Option<f64>>;

/// A [`PriceSeries`] plus named indicator columns
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedSeries {
    series: PriceSeries,
    columns: BTreeMap<String, Column>,
}

impl EnrichedSeries {
    pub(crate) fn new(series: PriceSeries) -> Self {
        Self {
            series,
            columns: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, column: Column) {
        debug_assert_eq!(column.len(), self.series.len());
        self.columns.insert(name.into(), column);
    }

    #[inline]
    pub fn series(&self) -> &PriceSeries {
        &self.series
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn value_at(&self, name: &str, index: usize) -> Option<f64> {
        self.columns.get(name)?.get(index).copied().flatten()
    }

    /// Value on the most recent bar
    pub fn latest(&self, name: &str) -> Option<f64> {
        let last = self.len().checked_sub(1)?;
        self.value_at(name, last)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

// ============================================================
// TESTS
// ============================================================
