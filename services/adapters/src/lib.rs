//! # OKX Feed and Venue Adapters
//!
//! ## Purpose
//!
//! Boundary between the OKX venue and the signal pipeline. Streams candle
//! updates over the business websocket with subscription acknowledgement,
//! keepalive, health checks and bounded exponential-backoff reconnection, and
//! wraps the signed REST endpoints the strategy needs for bootstrap, sizing
//! and order placement.
//!
//! ## Integration Points
//!
//! - **Input**: `wss://ws.okx.com:8443/ws/v5/business` candle channels,
//!   `https://www.okx.com/api/v5/*` REST endpoints
//! - **Output**: decoded [`types::Candle`] values on a bounded
//!   `tokio::sync::mpsc` queue drained by the decision loop
//! - **Configuration**: [`signal_config::FeedConfig`] and
//!   [`signal_config::VenueConfig`]
//!
//! ## Architecture Role
//!
//! ```text
//! OKX websocket ──► read loop ──try_send──► candle queue ──► decision loop
//!        ▲                                                      │
//!        └── keepalive / subscribe / close (one sink lock)      │
//! OKX REST ◄──────────── ExchangeClient ◄───────────────────────┘
//! ```
//!
//! The read loop never blocks on the consumer and never issues REST calls.
//! All writes to the socket go through a single `tokio::sync::Mutex` so a
//! keepalive can never race a teardown.

pub mod error;
pub mod input;
pub mod rest;

pub use error::{AdapterError, Result};
pub use input::collectors::OkxCandleCollector;
pub use input::{
    ConnectionState, ConnectionTracker, FeedHealth, HealthLevel, InputAdapter, ReconnectPolicy,
    ScheduledTask,
};
pub use rest::{
    ExchangeClient, InstrumentRules, OkxRestClient, OrderAck, OrderRequest, OrderState,
    OrderStatus, OrderType,
};
