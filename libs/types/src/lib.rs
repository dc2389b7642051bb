//! # Candlewick Shared Types
//!
//! Market-data and trading types shared by the feed adapters and the
//! signal strategy.
//!
//! ## Design Philosophy
//!
//! - **Floats for analytics, decimals for money**: candles carry `f64` prices
//!   because indicators are floating-point statistics; anything that becomes
//!   an order size, a price on the wire, or a P&L figure is a
//!   [`rust_decimal::Decimal`].
//! - **Bounded history**: [`PriceSeries`] never grows past its capacity and
//!   evicts oldest candles first.
//! - **Append-only trade history**: [`TradeRecord`] has no mutators.
//!
//! ## Integration Points
//!
//! - `adapter-service` decodes venue frames into [`Candle`] values
//! - `okx-signals-strategy` owns the [`PriceSeries`], opens [`Position`]s and
//!   appends [`TradeRecord`]s

pub mod candle;
pub mod precision;
pub mod series;
pub mod trading;

pub use candle::Candle;
pub use precision::{decimal_places, floor_to_step, format_decimal, round_to_step, to_decimal};
pub use series::{PriceSeries, SeriesUpdate};
pub use trading::{InstrumentError, InstrumentId, Position, Side, TradeRecord, TradeTrigger};
