//! Instruments, positions and the trade record

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InstrumentError {
    #[error("Invalid instrument id '{0}': expected BASE-QUOTE")]
    InvalidFormat(String),
}

/// Spot instrument identifier in venue notation, e.g. `BTC-USDT`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstrumentId(String);

impl InstrumentId {
    pub fn new(symbol: impl Into<String>) -> Result<Self, InstrumentError> {
        let symbol = symbol.into().trim().to_ascii_uppercase();
        let mut parts = symbol.split('-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) if !base.is_empty() && !quote.is_empty() => {
                Ok(Self(symbol))
            }
            _ => Err(InstrumentError::InvalidFormat(symbol)),
        }
    }

    /// Build from already-split currencies, e.g. `("BTC", "USDT")`
    pub fn from_parts(base: &str, quote: &str) -> Self {
        Self(format!("{}-{}", base, quote).to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Asset being bought and sold (`BTC` in `BTC-USDT`)
    pub fn base_currency(&self) -> &str {
        self.0.split('-').next().unwrap_or_default()
    }

    /// Asset the notional is expressed in (`USDT` in `BTC-USDT`)
    pub fn quote_currency(&self) -> &str {
        self.0.split('-').nth(1).unwrap_or_default()
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InstrumentId {
    type Err = InstrumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for InstrumentId {
    type Error = InstrumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<InstrumentId> for String {
    fn from(id: InstrumentId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a trade happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeTrigger {
    Signal,
    StopLoss,
    TakeProfit,
}

impl fmt::Display for TradeTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TradeTrigger::Signal => "signal",
            TradeTrigger::StopLoss => "stop-loss",
            TradeTrigger::TakeProfit => "take-profit",
        };
        f.write_str(label)
    }
}

/// Open long position. At most one exists per instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub instrument: InstrumentId,
    pub entry_price: Decimal,
    pub size: Decimal,
    pub entry_time: DateTime<Utc>,
    pub order_id: String,
}

impl Position {
    /// Percent P&L at `current`: `(current - entry) / entry * 100`.
    /// `None` when the entry price is zero.
    pub fn pnl_percent(&self, current: Decimal) -> Option<Decimal> {
        if self.entry_price.is_zero() {
            return None;
        }
        Some((current - self.entry_price) / self.entry_price * Decimal::ONE_HUNDRED)
    }

    pub fn notional(&self) -> Decimal {
        self.size * self.entry_price
    }
}

/// Executed trade. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub instrument: InstrumentId,
    pub side: Side,
    pub size: Decimal,
    pub price: Decimal,
    pub order_id: String,
    pub trigger: TradeTrigger,
    /// Signal strength (0-6) behind a signal-driven trade
    pub signal_strength: Option<u8>,
    /// Entry price of the position a sell closed
    pub entry_price: Option<Decimal>,
    /// Realised P&L percent, sells only
    pub profit_percent: Option<Decimal>,
}
