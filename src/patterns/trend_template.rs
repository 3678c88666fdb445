//! Six-point trend template

use serde::Serialize;

use crate::params::TemplateParams;
use crate::series::{columns, EnrichedSeries};

/// Outcome of the trend template on the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TrendTemplateResult {
    pub price_above_ma150: bool,
    pub price_above_ma200: bool,
    pub ma150_above_ma200: bool,
    pub ma50_above_ma150: bool,
    pub ma50_above_ma200: bool,
    pub rs_rating_above_threshold: bool,
    /// Number of passing checks, 0..=6
    pub score: u8,
}

impl TrendTemplateResult {
    pub const CHECKS: u8 = 6;

    fn from_checks(checks: [bool; 6]) -> Self {
        let [
            price_above_ma150,
            price_above_ma200,
            ma150_above_ma200,
            ma50_above_ma150,
            ma50_above_ma200,
            rs_rating_above_threshold,
        ] = checks;
        Self {
            price_above_ma150,
            price_above_ma200,
            ma150_above_ma200,
            ma50_above_ma150,
            ma50_above_ma200,
            rs_rating_above_threshold,
            score: checks.iter().filter(|c| **c).count() as u8,
        }
    }

    /// `(name, passed)` for every check, in template order
    pub fn checks(&self) -> impl Iterator<Item = (&'static str, bool)> {
        [
            ("price_above_ma150", self.price_above_ma150),
            ("price_above_ma200", self.price_above_ma200),
            ("ma150_above_ma200", self.ma150_above_ma200),
            ("ma50_above_ma150", self.ma50_above_ma150),
            ("ma50_above_ma200", self.ma50_above_ma200),
            ("rs_rating_above_threshold", self.rs_rating_above_threshold),
        ]
        .into_iter()
    }
}

/// Evaluates the template against an enriched series
#[derive(Debug, Clone, Copy)]
pub struct TrendTemplate<'a> {
    params: &'a TemplateParams,
}

impl<'a> TrendTemplate<'a> {
    pub fn new(params: &'a TemplateParams) -> Self {
        Self { params }
    }

    /// Score the latest bar. Undefined inputs fail their checks.
    pub fn evaluate(&self, enriched: &EnrichedSeries) -> TrendTemplateResult {
        let p = self.params;
        let close = enriched.series().last().map(|b| b.close);
        let short = enriched.latest(&columns::sma(p.short_ma.get()));
        let medium = enriched.latest(&columns::sma(p.medium_ma.get()));
        let long = enriched.latest(&columns::sma(p.long_ma.get()));
        let rs = enriched.latest(columns::RS_RATING);

        TrendTemplateResult::from_checks([
            above(close, medium),
            above(close, long),
            above(medium, long),
            above(short, medium),
            above(short, long),
            rs.is_some_and(|rs| rs >= p.rs_threshold),
        ])
    }
}

#[inline]
fn above(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a > b)
}
