//! Input adapters for streaming market data

pub mod collectors;
pub mod connection;
pub mod timer;

use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use types::InstrumentId;

pub use connection::{ConnectionState, ConnectionTracker, ReconnectPolicy};
pub use timer::ScheduledTask;

/// Lifecycle and health surface of a streaming feed
#[async_trait]
pub trait InputAdapter: Send + Sync {
    /// Instrument this feed streams
    fn instrument(&self) -> &InstrumentId;

    /// Start connecting in the background. Calling twice is a no-op.
    async fn start(&mut self) -> Result<()>;

    /// Tear down the transport and cancel all timers. Idempotent.
    async fn stop(&mut self) -> Result<()>;

    /// Current connection state
    fn state(&self) -> ConnectionState;

    /// Check if adapter is currently connected
    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Poll liveness. A connected feed that has been silent past its
    /// message timeout is forced into reconnection.
    fn check_health(&self) -> FeedHealth;

    /// Health snapshot without side effects
    fn health(&self) -> FeedHealth;

    /// Drop the current connection and reconnect immediately
    async fn reconnect(&self) -> Result<()>;
}

/// Point-in-time view of a feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedHealth {
    /// Overall health level
    pub level: HealthLevel,
    /// Connection state
    pub state: ConnectionState,
    /// Consecutive failed connection attempts since the last success
    pub reconnect_attempts: u32,
    /// Most recent transport or protocol error
    pub last_error: Option<String>,
    /// Time since the last inbound frame
    pub silence_ms: u64,
    pub messages_received: u64,
    /// Data frames or rows dropped as malformed
    pub malformed_frames: u64,
    /// Candles dropped because the queue was full
    pub dropped_candles: u64,
    /// Reconnect budget exhausted; restart required
    pub feed_unavailable: bool,
}

/// Health level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    /// Connected and receiving
    Healthy,
    /// Connecting or recovering
    Degraded,
    /// Stopped or unavailable
    Unhealthy,
}

impl FeedHealth {
    /// Check if status indicates problems
    pub fn has_issues(&self) -> bool {
        self.level != HealthLevel::Healthy
    }
}
