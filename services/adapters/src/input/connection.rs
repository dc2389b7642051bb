//! Connection state, reconnect policy and liveness tracking

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use signal_config::FeedConfig;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::{FeedHealth, HealthLevel};

/// Connection states for the streaming lifecycle
///
/// ```text
/// Disconnected ─start─► Connecting ─ack─► Connected
///                           ▲                 │ failure / silence
///                           └── Reconnecting ◄┘
/// ```
/// Only an explicit stop (or an exhausted reconnect budget) returns the feed
/// to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Transport opening or subscription awaiting acknowledgement
    Connecting,
    /// Subscribed and receiving data
    Connected,
    /// Waiting out a backoff delay before the next attempt
    Reconnecting,
}

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub max: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(5),
            max: Duration::from_secs(60),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    pub fn from_config(config: &FeedConfig) -> Self {
        Self {
            base: Duration::from_millis(config.base_backoff_ms),
            max: Duration::from_millis(config.max_backoff_ms),
            max_attempts: config.max_reconnect_attempts,
        }
    }

    /// Delay before reconnect attempt `attempt` (1-based): `base * 2^(attempt-1)`,
    /// capped at `max`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let base_ms = self.base.as_millis() as u64;
        let backoff_ms = base_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(backoff_ms.min(self.max.as_millis() as u64))
    }

    /// Delay for the next attempt after `failures` consecutive failures, or
    /// `None` once the budget is spent.
    pub fn next_delay(&self, failures: u32) -> Option<Duration> {
        if failures >= self.max_attempts {
            None
        } else {
            Some(self.delay_for(failures + 1))
        }
    }
}

/// Shared view of one feed's connection, written by the supervisor and the
/// read loop and read by anyone holding the adapter.
#[derive(Debug)]
pub struct ConnectionTracker {
    state: RwLock<ConnectionState>,
    last_message: Mutex<Instant>,
    last_error: RwLock<Option<String>>,
    message_timeout: Duration,
    reconnect_attempts: AtomicU32,
    feed_unavailable: AtomicBool,
    messages_received: AtomicU64,
    malformed_frames: AtomicU64,
    dropped_candles: AtomicU64,
}

impl ConnectionTracker {
    pub fn new(message_timeout: Duration) -> Self {
        Self {
            state: RwLock::new(ConnectionState::Disconnected),
            last_message: Mutex::new(Instant::now()),
            last_error: RwLock::new(None),
            message_timeout,
            reconnect_attempts: AtomicU32::new(0),
            feed_unavailable: AtomicBool::new(false),
            messages_received: AtomicU64::new(0),
            malformed_frames: AtomicU64::new(0),
            dropped_candles: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn set_state(&self, state: ConnectionState) {
        let previous = std::mem::replace(&mut *self.state.write(), state);
        if previous != state {
            tracing::debug!("Feed state {:?} -> {:?}", previous, state);
        }
    }

    /// Mark a successful subscription: resets liveness and the attempt count
    pub fn mark_connected(&self) {
        *self.last_message.lock() = Instant::now();
        self.reconnect_attempts.store(0, Ordering::Relaxed);
        self.set_state(ConnectionState::Connected);
    }

    pub fn record_message(&self) {
        *self.last_message.lock() = Instant::now();
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, error: impl Into<String>) {
        *self.last_error.write() = Some(error.into());
    }

    pub fn record_malformed(&self, count: u64) {
        self.malformed_frames.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_dropped_candle(&self) -> u64 {
        self.dropped_candles.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn set_reconnect_attempts(&self, attempts: u32) {
        self.reconnect_attempts.store(attempts, Ordering::Relaxed);
    }

    pub fn mark_feed_unavailable(&self) {
        self.feed_unavailable.store(true, Ordering::SeqCst);
        self.set_state(ConnectionState::Disconnected);
    }

    pub fn is_feed_unavailable(&self) -> bool {
        self.feed_unavailable.load(Ordering::SeqCst)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    pub fn silence(&self) -> Duration {
        self.last_message.lock().elapsed()
    }

    /// Connected but silent for longer than the message timeout
    pub fn is_stale(&self) -> bool {
        self.state() == ConnectionState::Connected && self.silence() > self.message_timeout
    }

    pub fn snapshot(&self) -> FeedHealth {
        let state = self.state();
        let feed_unavailable = self.is_feed_unavailable();
        let level = match state {
            _ if feed_unavailable => HealthLevel::Unhealthy,
            ConnectionState::Connected if !self.is_stale() => HealthLevel::Healthy,
            ConnectionState::Disconnected => HealthLevel::Unhealthy,
            _ => HealthLevel::Degraded,
        };

        FeedHealth {
            level,
            state,
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            last_error: self.last_error(),
            silence_ms: self.silence().as_millis() as u64,
            messages_received: self.messages_received.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            dropped_candles: self.dropped_candles.load(Ordering::Relaxed),
            feed_unavailable,
        }
    }
}
