//! Technical indicator calculation
//!
//! Each submodule is a set of pure functions over price slices returning
//! [`Column`]s. [`IndicatorCalculator`] runs the configured set and
//! assembles them into an [`EnrichedSeries`] under the names in
//! [`crate::series::columns`].

pub mod helpers;
pub mod moving_average;
pub mod oscillators;
pub mod relative_strength;
pub mod trend;
pub mod volatility;
pub mod volume;

use tracing::trace;

use crate::params::IndicatorParams;
use crate::series::{columns, Column, EnrichedSeries, PriceSeries};

pub use moving_average::{ema, macd, sma, Macd};
pub use oscillators::{rsi, stochastic, Stochastic};
pub use relative_strength::{percentile_rank, rs_rating};
pub use trend::{adx, Adx};
pub use volatility::{atr, bollinger, daily_volatility, true_range, Bollinger};
pub use volume::obv;

/// Computes every configured indicator for a series
#[derive(Debug, Clone, Copy)]
pub struct IndicatorCalculator<'a> {
    params: &'a IndicatorParams,
}

impl<'a> IndicatorCalculator<'a> {
    pub fn new(params: &'a IndicatorParams) -> Self {
        Self { params }
    }

    /// Enrich `series` with all indicator columns.
    ///
    /// Never fails: columns needing more history than available are
    /// undefined. `rs_rating` is undefined throughout without a benchmark.
    pub fn compute(&self, series: &PriceSeries, benchmark: Option<&PriceSeries>) -> EnrichedSeries {
        let p = self.params;
        let bars = series.bars();
        let closes = series.closes();
        let highs = series.highs();
        let lows = series.lows();
        let volumes = series.volumes();

        let mut out = EnrichedSeries::new(series.clone());

        for w in &p.sma_windows {
            out.insert(columns::sma(w.get()), sma(&closes, w.get()));
        }
        for s in &p.ema_spans {
            out.insert(columns::ema(s.get()), ema(&closes, s.get()));
        }

        out.insert(columns::rsi(p.rsi_period.get()), rsi(&closes, p.rsi_period.get()));

        let m = macd(&closes, p.macd_fast.get(), p.macd_slow.get(), p.macd_signal.get());
        out.insert(columns::MACD, m.line);
        out.insert(columns::MACD_SIGNAL, m.signal);
        out.insert(columns::MACD_HISTOGRAM, m.histogram);

        let bp = p.bollinger_period.get();
        let bb = bollinger(&closes, bp, p.bollinger_std);
        out.insert(columns::bb_middle(bp), bb.middle);
        out.insert(columns::bb_upper(bp), bb.upper);
        out.insert(columns::bb_lower(bp), bb.lower);
        out.insert(columns::bb_width(bp), bb.width);

        out.insert(columns::atr(p.atr_period.get()), atr(bars, p.atr_period.get()));

        let ap = p.adx_period.get();
        let a = adx(bars, ap);
        out.insert(columns::plus_di(ap), a.plus_di);
        out.insert(columns::minus_di(ap), a.minus_di);
        out.insert(columns::dx(ap), a.dx);
        out.insert(columns::adx(ap), a.adx);

        let (kp, dp) = (p.stoch_k.get(), p.stoch_d.get());
        let st = stochastic(&highs, &lows, &closes, kp, dp);
        out.insert(columns::stoch_k(kp), st.k);
        out.insert(columns::stoch_d(kp, dp), st.d);

        out.insert(columns::OBV, obv(&closes, &volumes));
        out.insert(
            columns::volume_sma(p.volume_period.get()),
            sma(&volumes, p.volume_period.get()),
        );

        out.insert(columns::DAILY_CHANGE, helpers::pct_change(&closes, 1));
        out.insert(columns::DAILY_VOLATILITY, daily_volatility(bars));

        let rs: Column = match benchmark {
            Some(b) => rs_rating(series, b, p.rs_lookback.get()),
            None => vec![None; series.len()],
        };
        out.insert(columns::RS_RATING, rs);

        trace!(
            symbol = series.symbol(),
            bars = series.len(),
            columns = out.names().count(),
            "indicators computed"
        );
        out
    }
}

// ============================================================
// TESTS
// ============================================================
