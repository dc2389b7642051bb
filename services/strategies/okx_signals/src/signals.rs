//! Signal conditions, condition sets and signal statistics

use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

pub const CONDITION_COUNT: usize = 6;

/// Fixed vocabulary of one side's conditions
pub trait Condition: Copy + fmt::Debug + 'static {
    const ALL: [Self; CONDITION_COUNT];

    fn index(self) -> usize;

    fn label(self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BuyCondition {
    /// MACD crosses above its signal line while positive
    MacdGoldenCross,
    /// K above D, not overbought or recovering from oversold
    KdjBullish,
    /// RSI above 50, or leaving oversold
    RsiStrength,
    /// Williams %R above -50, or leaving oversold
    WilliamsRecovery,
    /// Close above BBI
    AboveBbi,
    /// ZLMM positive
    PositiveMomentum,
}

impl Condition for BuyCondition {
    const ALL: [Self; CONDITION_COUNT] = [
        BuyCondition::MacdGoldenCross,
        BuyCondition::KdjBullish,
        BuyCondition::RsiStrength,
        BuyCondition::WilliamsRecovery,
        BuyCondition::AboveBbi,
        BuyCondition::PositiveMomentum,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn label(self) -> &'static str {
        match self {
            BuyCondition::MacdGoldenCross => "MACD golden cross",
            BuyCondition::KdjBullish => "KDJ bullish",
            BuyCondition::RsiStrength => "RSI strength",
            BuyCondition::WilliamsRecovery => "Williams %R recovery",
            BuyCondition::AboveBbi => "close above BBI",
            BuyCondition::PositiveMomentum => "ZLMM positive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SellCondition {
    /// RSI above 70
    RsiOverbought,
    /// K and D both above 80
    KdjOverbought,
    /// Williams %R above -20
    WilliamsOverbought,
    /// MACD crosses below its signal line
    MacdDeathCross,
    /// Close more than 5% away from BBI
    BbiDeviation,
    /// ZLMM negative
    NegativeMomentum,
}

impl Condition for SellCondition {
    const ALL: [Self; CONDITION_COUNT] = [
        SellCondition::RsiOverbought,
        SellCondition::KdjOverbought,
        SellCondition::WilliamsOverbought,
        SellCondition::MacdDeathCross,
        SellCondition::BbiDeviation,
        SellCondition::NegativeMomentum,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn label(self) -> &'static str {
        match self {
            SellCondition::RsiOverbought => "RSI overbought",
            SellCondition::KdjOverbought => "KDJ overbought",
            SellCondition::WilliamsOverbought => "Williams %R overbought",
            SellCondition::MacdDeathCross => "MACD death cross",
            SellCondition::BbiDeviation => "BBI deviation",
            SellCondition::NegativeMomentum => "ZLMM negative",
        }
    }
}

/// Which of one side's conditions hold at an index
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ConditionSet<C: Condition> {
    flags: [bool; CONDITION_COUNT],
    _side: PhantomData<C>,
}

impl<C: Condition> Default for ConditionSet<C> {
    fn default() -> Self {
        Self {
            flags: [false; CONDITION_COUNT],
            _side: PhantomData,
        }
    }
}

impl<C: Condition> ConditionSet<C> {
    pub fn from_flags(flags: [bool; CONDITION_COUNT]) -> Self {
        Self {
            flags,
            _side: PhantomData,
        }
    }

    pub fn set(&mut self, condition: C, satisfied: bool) {
        self.flags[condition.index()] = satisfied;
    }

    pub fn contains(&self, condition: C) -> bool {
        self.flags[condition.index()]
    }

    /// Number of satisfied conditions, 0 to 6
    pub fn strength(&self) -> u8 {
        self.flags.iter().filter(|f| **f).count() as u8
    }

    pub fn satisfied(&self) -> impl Iterator<Item = C> + '_ {
        C::ALL.into_iter().filter(|c| self.contains(*c))
    }

    /// Comma-separated labels of the satisfied conditions
    pub fn describe(&self) -> String {
        let labels: Vec<&str> = self.satisfied().map(C::label).collect();
        if labels.is_empty() {
            "none".to_string()
        } else {
            labels.join(", ")
        }
    }
}

impl<C: Condition> fmt::Debug for ConditionSet<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.satisfied()).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Buy,
    Sell,
}

/// Coarse grade of a signal's strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthLevel {
    /// Two conditions or fewer
    Weak,
    /// Three or four conditions
    Medium,
    /// Five or six conditions
    Strong,
}

impl StrengthLevel {
    pub fn from_strength(strength: u8) -> Self {
        match strength {
            0..=2 => StrengthLevel::Weak,
            3..=4 => StrengthLevel::Medium,
            _ => StrengthLevel::Strong,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrengthLevel::Weak => "weak",
            StrengthLevel::Medium => "medium",
            StrengthLevel::Strong => "strong",
        }
    }
}

/// Accepted signal with the conditions that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy(ConditionSet<BuyCondition>),
    Sell(ConditionSet<SellCondition>),
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::Buy(_) => SignalKind::Buy,
            Signal::Sell(_) => SignalKind::Sell,
        }
    }

    pub fn strength(&self) -> u8 {
        match self {
            Signal::Buy(set) => set.strength(),
            Signal::Sell(set) => set.strength(),
        }
    }

    pub fn level(&self) -> StrengthLevel {
        StrengthLevel::from_strength(self.strength())
    }

    pub fn describe(&self) -> String {
        let conditions = match self {
            Signal::Buy(set) => set.describe(),
            Signal::Sell(set) => set.describe(),
        };
        format!(
            "{:?} strength {} {}/{}: {}",
            self.kind(),
            self.level().as_str(),
            self.strength(),
            CONDITION_COUNT,
            conditions
        )
    }
}

/// Signal generation statistics
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SignalStats {
    pub evaluations: u64,
    pub buy_signals: u64,
    pub sell_signals: u64,
    /// Buys accepted by the profile while a position was already open
    pub suppressed_buys: u64,
    pub avg_strength: f64,
    pub last_signal: Option<SignalKind>,
}

impl SignalStats {
    pub fn record_evaluation(&mut self) {
        self.evaluations += 1;
    }

    pub fn record_suppressed_buy(&mut self) {
        self.suppressed_buys += 1;
    }

    /// Update stats with an accepted signal
    pub fn record_signal(&mut self, signal: &Signal) {
        match signal.kind() {
            SignalKind::Buy => self.buy_signals += 1,
            SignalKind::Sell => self.sell_signals += 1,
        }

        let total = self.buy_signals + self.sell_signals;
        let total_strength = self.avg_strength * (total - 1) as f64 + signal.strength() as f64;
        self.avg_strength = total_strength / total as f64;
        self.last_signal = Some(signal.kind());
    }
}
