//! # Indicator Engine
//!
//! Pure function of a [`PriceSeries`]: six indicators recomputed over the
//! whole retained window. No state survives between calls, so computing
//! twice on the same series gives identical output.
//!
//! | Indicator | First defined index |
//! |---|---|
//! | MACD / signal / histogram | 25 |
//! | KDJ | 8 |
//! | RSI(14) | 14 |
//! | Williams %R(14) | 13 |
//! | BBI | 23 |
//! | ZLMM | 25 |
//!
//! An undefined value is `None` and never satisfies a signal condition.

pub mod averages;
pub mod oscillators;
pub mod trend;

use serde::Serialize;
use types::PriceSeries;

/// Per-index indicator columns, all the same length as the series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSet {
    pub close: Vec<Option<f64>>,
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
    pub j: Vec<Option<f64>>,
    pub rsi: Vec<Option<f64>>,
    pub williams_r: Vec<Option<f64>>,
    pub bbi: Vec<Option<f64>>,
    pub zlmm: Vec<Option<f64>>,
}

/// Indicator values at one index, for logs and status
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IndicatorValues {
    pub close: Option<f64>,
    pub macd: Option<f64>,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
    pub k: Option<f64>,
    pub d: Option<f64>,
    pub j: Option<f64>,
    pub rsi: Option<f64>,
    pub williams_r: Option<f64>,
    pub bbi: Option<f64>,
    pub zlmm: Option<f64>,
}

impl IndicatorSet {
    pub fn compute(series: &PriceSeries) -> Self {
        Self::from_prices(&series.highs(), &series.lows(), &series.closes())
    }

    pub fn from_prices(highs: &[f64], lows: &[f64], closes: &[f64]) -> Self {
        let macd = trend::macd(closes);
        let kdj = oscillators::kdj(highs, lows, closes);
        Self {
            close: closes.iter().copied().map(Some).collect(),
            macd: macd.macd,
            signal: macd.signal,
            histogram: macd.histogram,
            k: kdj.k,
            d: kdj.d,
            j: kdj.j,
            rsi: oscillators::rsi(closes),
            williams_r: oscillators::williams_r(highs, lows, closes),
            bbi: trend::bbi(closes),
            zlmm: trend::zlmm(closes),
        }
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    pub fn values_at(&self, index: usize) -> IndicatorValues {
        let at = |column: &[Option<f64>]| column.get(index).copied().flatten();
        IndicatorValues {
            close: at(&self.close),
            macd: at(&self.macd),
            signal: at(&self.signal),
            histogram: at(&self.histogram),
            k: at(&self.k),
            d: at(&self.d),
            j: at(&self.j),
            rsi: at(&self.rsi),
            williams_r: at(&self.williams_r),
            bbi: at(&self.bbi),
            zlmm: at(&self.zlmm),
        }
    }

    pub fn latest(&self) -> Option<IndicatorValues> {
        self.len().checked_sub(1).map(|i| self.values_at(i))
    }
}
