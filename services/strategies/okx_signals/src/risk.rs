//! # Position Sizing and Exit Monitor
//!
//! ## Sizing Steps
//!
//! 1. Candidate notional = min(target, utilization% of available balance)
//! 2. Reject when the candidate is below the venue minimum order notional
//! 3. Quantity = candidate / price, raised to the instrument minimum size
//! 4. Floor to the lot step at the step's fractional-digit count
//! 5. Re-check the final notional against the minimum
//!
//! A rejection is a value ([`SizingDecision::Rejected`]) meaning "skip this
//! cycle", never an error.
//!
//! ## Exit Monitor
//!
//! [`check_exit`] compares an open position's percent P&L against the
//! stop-loss and take-profit limits. Stop-loss wins when both would hold.

use adapter_service::InstrumentRules;
use rust_decimal::Decimal;
use signal_config::RiskLimits;
use thiserror::Error;
use types::{floor_to_step, Position, TradeTrigger};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SizingRejected {
    #[error("price must be positive")]
    NonPositivePrice,

    #[error("candidate notional {notional} below minimum {minimum}")]
    BelowMinNotional { notional: Decimal, minimum: Decimal },

    #[error("size rounds to zero at the lot step")]
    RoundedToZero,

    #[error("final notional {notional} below minimum {minimum}")]
    FinalBelowMinNotional { notional: Decimal, minimum: Decimal },

    #[error("sizing query failed: {0}")]
    QueryFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizingDecision {
    Sized { size: Decimal, notional: Decimal },
    Rejected(SizingRejected),
}

impl SizingDecision {
    /// Accepted size, zero when rejected
    pub fn size(&self) -> Decimal {
        match self {
            SizingDecision::Sized { size, .. } => *size,
            SizingDecision::Rejected(_) => Decimal::ZERO,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, SizingDecision::Sized { .. })
    }
}

/// Size a buy for `target` quote notional
pub fn compute_size(
    target: Decimal,
    available_balance: Decimal,
    price: Decimal,
    rules: &InstrumentRules,
    min_notional: Decimal,
    utilization_percent: Decimal,
) -> SizingDecision {
    if price <= Decimal::ZERO {
        return SizingDecision::Rejected(SizingRejected::NonPositivePrice);
    }

    let spendable = available_balance.max(Decimal::ZERO) * utilization_percent
        / Decimal::ONE_HUNDRED;
    let candidate = target.min(spendable);
    if candidate < min_notional {
        return SizingDecision::Rejected(SizingRejected::BelowMinNotional {
            notional: candidate,
            minimum: min_notional,
        });
    }

    let quantity = (candidate / price).max(rules.min_size);
    let size = floor_to_step(quantity, rules.lot_size);
    if size <= Decimal::ZERO {
        return SizingDecision::Rejected(SizingRejected::RoundedToZero);
    }

    let notional = size * price;
    if notional < min_notional {
        return SizingDecision::Rejected(SizingRejected::FinalBelowMinNotional {
            notional,
            minimum: min_notional,
        });
    }

    SizingDecision::Sized { size, notional }
}

/// Forced exit of an open position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitTrigger {
    StopLoss { pnl_percent: Decimal },
    TakeProfit { pnl_percent: Decimal },
}

impl ExitTrigger {
    pub fn trade_trigger(&self) -> TradeTrigger {
        match self {
            ExitTrigger::StopLoss { .. } => TradeTrigger::StopLoss,
            ExitTrigger::TakeProfit { .. } => TradeTrigger::TakeProfit,
        }
    }

    pub fn pnl_percent(&self) -> Decimal {
        match self {
            ExitTrigger::StopLoss { pnl_percent } | ExitTrigger::TakeProfit { pnl_percent } => {
                *pnl_percent
            }
        }
    }
}

pub fn check_exit(position: &Position, current: Decimal, limits: &RiskLimits) -> Option<ExitTrigger> {
    let pnl_percent = position.pnl_percent(current)?;
    if pnl_percent <= -limits.stop_loss_percent {
        Some(ExitTrigger::StopLoss { pnl_percent })
    } else if pnl_percent >= limits.take_profit_percent {
        Some(ExitTrigger::TakeProfit { pnl_percent })
    } else {
        None
    }
}
