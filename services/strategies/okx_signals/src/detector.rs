//! # Signal Detector
//!
//! Evaluates the six buy and six sell conditions at one index of an
//! [`IndicatorSet`] and applies the strategy profile's acceptance rule.
//!
//! "Five steps earlier" look-backs use the exact index `i - 5`. Any input
//! that is undefined makes its condition false.
//!
//! | Profile | Buy | Sell |
//! |---|---|---|
//! | conservative | 6, or >= 5 with MACD golden cross | >= 4 |
//! | balanced | >= 4 with golden cross or KDJ bullish | >= 3 |
//! | aggressive | >= 3 | >= 2 |

use crate::indicators::IndicatorSet;
use crate::signals::{BuyCondition, ConditionSet, SellCondition, Signal, SignalStats};
use signal_config::StrategyMode;
use tracing::debug;

/// Minimum index at which conditions are evaluated at all
pub const MIN_EVALUATION_INDEX: usize = 10;
const LOOKBACK: usize = 5;
const BBI_DEVIATION: f64 = 0.05;

/// Both sides' conditions at one index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub index: usize,
    pub buy: ConditionSet<BuyCondition>,
    pub sell: ConditionSet<SellCondition>,
}

/// Applies one strategy profile to indicator sets
#[derive(Debug, Clone)]
pub struct SignalDetector {
    mode: StrategyMode,
    stats: SignalStats,
}

impl SignalDetector {
    pub fn new(mode: StrategyMode) -> Self {
        Self {
            mode,
            stats: SignalStats::default(),
        }
    }

    pub fn mode(&self) -> StrategyMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: StrategyMode) {
        self.mode = mode;
    }

    pub fn stats(&self) -> &SignalStats {
        &self.stats
    }

    /// Condition flags at `index`, or `None` before enough history exists
    pub fn evaluate(&self, set: &IndicatorSet, index: usize) -> Option<Evaluation> {
        if index < MIN_EVALUATION_INDEX || index >= set.len() {
            return None;
        }
        Some(Evaluation {
            index,
            buy: buy_conditions(set, index),
            sell: sell_conditions(set, index),
        })
    }

    pub fn should_buy(&self, conditions: &ConditionSet<BuyCondition>) -> bool {
        let strength = conditions.strength();
        let golden_cross = conditions.contains(BuyCondition::MacdGoldenCross);
        match self.mode {
            StrategyMode::Conservative => strength == 6 || (strength >= 5 && golden_cross),
            StrategyMode::Balanced => {
                strength >= 4 && (golden_cross || conditions.contains(BuyCondition::KdjBullish))
            }
            StrategyMode::Aggressive => strength >= 3,
        }
    }

    pub fn should_sell(&self, conditions: &ConditionSet<SellCondition>) -> bool {
        let threshold = match self.mode {
            StrategyMode::Conservative => 4,
            StrategyMode::Balanced => 3,
            StrategyMode::Aggressive => 2,
        };
        conditions.strength() >= threshold
    }

    /// Evaluate the newest index and decide, given whether a position is
    /// open. A buy is suppressed while holding; a sell without a position
    /// is a no-op.
    pub fn decide(&mut self, set: &IndicatorSet, has_position: bool) -> Option<Signal> {
        let index = set.len().checked_sub(1)?;
        let evaluation = self.evaluate(set, index)?;
        self.stats.record_evaluation();

        debug!(
            "Index {} buy [{}] sell [{}]",
            index,
            evaluation.buy.describe(),
            evaluation.sell.describe()
        );

        let signal = if has_position {
            if self.should_buy(&evaluation.buy) {
                self.stats.record_suppressed_buy();
            }
            self.should_sell(&evaluation.sell)
                .then_some(Signal::Sell(evaluation.sell))
        } else {
            self.should_buy(&evaluation.buy)
                .then_some(Signal::Buy(evaluation.buy))
        };

        if let Some(signal) = &signal {
            self.stats.record_signal(signal);
        }
        signal
    }
}

fn at(column: &[Option<f64>], index: usize) -> Option<f64> {
    column.get(index).copied().flatten()
}

fn back(column: &[Option<f64>], index: usize, steps: usize) -> Option<f64> {
    at(column, index.checked_sub(steps)?)
}

fn crossed_above(set: &IndicatorSet, i: usize) -> Option<bool> {
    let (macd, signal) = (at(&set.macd, i)?, at(&set.signal, i)?);
    let (prev_macd, prev_signal) = (back(&set.macd, i, 1)?, back(&set.signal, i, 1)?);
    Some(macd > signal && prev_macd <= prev_signal)
}

fn crossed_below(set: &IndicatorSet, i: usize) -> Option<bool> {
    let (macd, signal) = (at(&set.macd, i)?, at(&set.signal, i)?);
    let (prev_macd, prev_signal) = (back(&set.macd, i, 1)?, back(&set.signal, i, 1)?);
    Some(macd < signal && prev_macd >= prev_signal)
}

/// Current value clears `level`, or clears `floor` after having been below
/// `floor` exactly five steps earlier
fn strong_or_recovering(
    column: &[Option<f64>],
    i: usize,
    level: f64,
    floor: f64,
) -> Option<bool> {
    let now = at(column, i)?;
    let recovering = back(column, i, LOOKBACK).is_some_and(|earlier| earlier < floor);
    Some(now > level || (now > floor && recovering))
}

fn buy_conditions(set: &IndicatorSet, i: usize) -> ConditionSet<BuyCondition> {
    let mut conditions = ConditionSet::default();

    let golden_cross = crossed_above(set, i)
        .zip(at(&set.macd, i))
        .is_some_and(|(crossed, macd)| crossed && macd > 0.0);
    conditions.set(BuyCondition::MacdGoldenCross, golden_cross);

    let kdj = at(&set.k, i).zip(at(&set.d, i)).is_some_and(|(k, d)| {
        let oversold_before = back(&set.k, i, LOOKBACK).is_some_and(|earlier| earlier < 20.0);
        k > d && (k < 80.0 || oversold_before)
    });
    conditions.set(BuyCondition::KdjBullish, kdj);

    conditions.set(
        BuyCondition::RsiStrength,
        strong_or_recovering(&set.rsi, i, 50.0, 30.0).unwrap_or(false),
    );
    conditions.set(
        BuyCondition::WilliamsRecovery,
        strong_or_recovering(&set.williams_r, i, -50.0, -80.0).unwrap_or(false),
    );

    let above_bbi = at(&set.close, i)
        .zip(at(&set.bbi, i))
        .is_some_and(|(close, bbi)| close > bbi);
    conditions.set(BuyCondition::AboveBbi, above_bbi);

    conditions.set(
        BuyCondition::PositiveMomentum,
        at(&set.zlmm, i).is_some_and(|z| z > 0.0),
    );
    conditions
}

fn sell_conditions(set: &IndicatorSet, i: usize) -> ConditionSet<SellCondition> {
    let mut conditions = ConditionSet::default();

    conditions.set(
        SellCondition::RsiOverbought,
        at(&set.rsi, i).is_some_and(|rsi| rsi > 70.0),
    );

    let kdj = at(&set.k, i)
        .zip(at(&set.d, i))
        .is_some_and(|(k, d)| k > 80.0 && d > 80.0);
    conditions.set(SellCondition::KdjOverbought, kdj);

    conditions.set(
        SellCondition::WilliamsOverbought,
        at(&set.williams_r, i).is_some_and(|wr| wr > -20.0),
    );
    conditions.set(
        SellCondition::MacdDeathCross,
        crossed_below(set, i).unwrap_or(false),
    );

    let deviation = at(&set.close, i)
        .zip(at(&set.bbi, i))
        .is_some_and(|(close, bbi)| bbi > 0.0 && ((close - bbi) / bbi).abs() > BBI_DEVIATION);
    conditions.set(SellCondition::BbiDeviation, deviation);

    conditions.set(
        SellCondition::NegativeMomentum,
        at(&set.zlmm, i).is_some_and(|z| z < 0.0),
    );
    conditions
}
