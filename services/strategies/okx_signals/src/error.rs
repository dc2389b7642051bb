//! Error types for the OKX signal strategy

use adapter_service::AdapterError;
use signal_config::ConfigError;
use thiserror::Error;
use types::InstrumentId;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Feed error: {0}")]
    Feed(#[from] AdapterError),

    /// Reconnect budget exhausted; needs an operator restart
    #[error("Feed unavailable: {reason}")]
    FeedUnavailable { reason: String },

    #[error("Position already open for {instrument}")]
    PositionAlreadyOpen { instrument: InstrumentId },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Tick requested after the engine was stopped
    #[error("Engine stopped")]
    Stopped,
}

pub type Result<T> = std::result::Result<T, StrategyError>;
