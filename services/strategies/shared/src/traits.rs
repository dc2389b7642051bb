//! Strategy traits and interfaces

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Lifecycle every long-running strategy exposes to its host
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Strategy name for identification
    fn name(&self) -> &'static str;

    /// Bootstrap and run until stopped or a fatal error
    async fn start(&mut self) -> Result<()>;

    /// Request shutdown. Idempotent.
    async fn stop(&mut self) -> Result<()>;

    /// Get current strategy metrics
    fn metrics(&self) -> StrategyMetrics;
}

/// Counters reported by a running strategy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StrategyMetrics {
    pub candles_processed: u64,
    pub signals_generated: u64,
    pub trades_executed: u64,
    /// Signals the risk gate or venue turned away
    pub trades_rejected: u64,
    pub errors: u64,
    pub uptime_secs: u64,
}
