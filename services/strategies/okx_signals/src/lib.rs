//! # OKX Signal Strategy
//!
//! Indicator-driven spot strategy for one OKX instrument: candles from the
//! feed connector flow into a bounded price series, six technical
//! indicators are recomputed on change, and a strategy profile turns their
//! conditions into buy and sell signals that pass a risk gate, get sized
//! against balance and instrument rules, and are executed as venue orders.
//!
//! ## Components
//!
//! - [`indicators`]: MACD, KDJ, RSI, Williams %R, BBI, ZLMM over a series
//! - [`detector`]: six buy / six sell conditions and profile thresholds
//! - [`session`]: trading enable flag, trade interval and daily limit gate
//! - [`risk`]: position sizing and stop-loss / take-profit monitor
//! - [`executor`] and [`ledger`]: orders, open positions, trade history
//! - [`engine`]: the decision loop tying them together
//!
//! ## Invariants
//!
//! - At most one open position per instrument
//! - Order sizes are exact multiples of the instrument lot step
//! - A rejected order never changes the ledger or the session

#[macro_use]
pub mod logging;

pub mod detector;
pub mod engine;
pub mod error;
pub mod executor;
pub mod indicators;
pub mod ledger;
pub mod risk;
pub mod session;
pub mod signals;

pub use detector::{Evaluation, SignalDetector, MIN_EVALUATION_INDEX};
pub use engine::{EngineCommand, EngineHandle, EngineSnapshot, SignalEngine, TickReport};
pub use error::{Result, StrategyError};
pub use executor::{ExecutionResult, OrderError, OrderExecutor};
pub use indicators::{IndicatorSet, IndicatorValues};
pub use ledger::PositionLedger;
pub use risk::{check_exit, compute_size, ExitTrigger, SizingDecision, SizingRejected};
pub use session::{GateRejection, TradingSession};
pub use signals::{
    BuyCondition, ConditionSet, SellCondition, Signal, SignalKind, SignalStats, StrengthLevel,
};
