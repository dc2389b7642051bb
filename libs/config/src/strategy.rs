//! Strategy strictness modes and their risk presets

use crate::trading_config::RiskLimits;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How strict the signal detector is and how much risk each preset takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyMode {
    Conservative,
    Balanced,
    Aggressive,
}

impl StrategyMode {
    pub const ALL: [StrategyMode; 3] = [
        StrategyMode::Conservative,
        StrategyMode::Balanced,
        StrategyMode::Aggressive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyMode::Conservative => "conservative",
            StrategyMode::Balanced => "balanced",
            StrategyMode::Aggressive => "aggressive",
        }
    }

    /// Infer the mode implied by explicit risk limits.
    ///
    /// Conservative needs all of: at most 5 trades a day, at least 300s
    /// between trades, a stop-loss of at least 5%. Balanced relaxes those to
    /// 10 trades, 180s and 3%. Anything looser is aggressive.
    pub fn derive(limits: &RiskLimits) -> Self {
        let stop_loss = limits.stop_loss_percent;
        if limits.max_trades_per_day <= 5
            && limits.min_trade_interval_secs >= 300
            && stop_loss >= Decimal::from(5)
        {
            StrategyMode::Conservative
        } else if limits.max_trades_per_day <= 10
            && limits.min_trade_interval_secs >= 180
            && stop_loss >= Decimal::from(3)
        {
            StrategyMode::Balanced
        } else {
            StrategyMode::Aggressive
        }
    }

    /// Preset risk limits for this mode. Trading stays disabled and sandbox
    /// mode stays on; those are operator decisions, not presets.
    pub fn preset(&self) -> RiskLimits {
        let (notional, interval, per_day, stop_loss, take_profit) = match self {
            StrategyMode::Conservative => (150, 300, 5, 5, 10),
            StrategyMode::Balanced => (300, 180, 10, 3, 6),
            StrategyMode::Aggressive => (500, 60, 20, 2, 4),
        };
        RiskLimits {
            per_trade_notional: Decimal::from(notional),
            min_trade_interval_secs: interval,
            max_trades_per_day: per_day,
            stop_loss_percent: Decimal::from(stop_loss),
            take_profit_percent: Decimal::from(take_profit),
            ..RiskLimits::default()
        }
    }
}

impl fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(StrategyMode::Conservative),
            "balanced" => Ok(StrategyMode::Balanced),
            "aggressive" => Ok(StrategyMode::Aggressive),
            other => Err(format!("unknown strategy mode '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_presets_derive_back_to_their_mode() {
        for mode in StrategyMode::ALL {
            assert_eq!(StrategyMode::derive(&mode.preset()), mode);
        }
    }

    #[test]
    fn test_derivation_thresholds() {
        let mut limits = StrategyMode::Conservative.preset();
        limits.stop_loss_percent = dec!(4.9);
        assert_eq!(StrategyMode::derive(&limits), StrategyMode::Balanced);

        limits.min_trade_interval_secs = 179;
        assert_eq!(StrategyMode::derive(&limits), StrategyMode::Aggressive);
    }

    #[test]
    fn test_preset_values() {
        let balanced = StrategyMode::Balanced.preset();
        assert_eq!(balanced.per_trade_notional, dec!(300));
        assert_eq!(balanced.min_trade_interval_secs, 180);
        assert_eq!(balanced.max_trades_per_day, 10);
        assert_eq!(balanced.take_profit_percent, dec!(6));
        assert!(!balanced.trading_enabled);
        assert!(balanced.sandbox_mode);
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("Aggressive".parse::<StrategyMode>(), Ok(StrategyMode::Aggressive));
        assert!("reckless".parse::<StrategyMode>().is_err());
    }
}
