//! # Signal Pipeline Configuration
//!
//! Typed configuration for the OKX signal pipeline: feed connection
//! parameters, risk limits, venue rules, decision-loop cadence and
//! credentials.
//!
//! ## Features
//!
//! - **Defaults everywhere**: every section deserializes from an empty file
//! - **Layered loading**: optional TOML file, then `OKX_SIGNALS_*`
//!   environment overrides, then `${VAR}` expansion in credentials
//! - **Strategy presets**: conservative / balanced / aggressive risk limits
//!   and derivation of the mode from explicit limits
//!
//! ## Usage
//!
//! ```rust,no_run
//! use signal_config::TradingConfig;
//!
//! let config = TradingConfig::load(Some("configs/okx_signals.toml".as_ref()))?;
//! let mode = config.resolved_mode();
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod defaults;
pub mod strategy;
pub mod trading_config;

pub use strategy::StrategyMode;
pub use trading_config::{
    ConfigError, Credentials, EngineConfig, FeedConfig, RiskLimits, StrategySettings,
    TradingConfig, VenueConfig,
};
