//! Trading configuration
//!
//! Loads the pipeline configuration from an optional TOML file with
//! `OKX_SIGNALS_*` environment overrides. Nested keys use a double
//! underscore, e.g. `OKX_SIGNALS_RISK__TRADING_ENABLED=true`.

use crate::defaults;
use crate::strategy::StrategyMode;
use anyhow::{Context, Result};
use config_crate::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use types::InstrumentId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Root configuration for the signal pipeline
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub feed: FeedConfig,
    pub risk: RiskLimits,
    pub venue: VenueConfig,
    pub strategy: StrategySettings,
    pub engine: EngineConfig,
    pub credentials: Credentials,
}

/// Streaming feed parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub ws_url: String,
    pub instrument: InstrumentId,
    /// Candle interval in venue notation (`1m`, `5m`, `1H`, ...)
    pub bar: String,
    pub max_points: usize,
    pub connect_timeout_ms: u64,
    pub subscribe_timeout_ms: u64,
    pub message_timeout_ms: u64,
    pub keepalive_interval_ms: u64,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub max_reconnect_attempts: u32,
    pub queue_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ws_url: defaults::okx::WS_URL.to_string(),
            instrument: InstrumentId::from_parts(
                defaults::feed::BASE_CURRENCY,
                defaults::feed::QUOTE_CURRENCY,
            ),
            bar: defaults::feed::BAR.to_string(),
            max_points: defaults::feed::MAX_POINTS,
            connect_timeout_ms: defaults::feed::CONNECT_TIMEOUT_MS,
            subscribe_timeout_ms: defaults::feed::SUBSCRIBE_TIMEOUT_MS,
            message_timeout_ms: defaults::feed::MESSAGE_TIMEOUT_MS,
            keepalive_interval_ms: defaults::feed::KEEPALIVE_INTERVAL_MS,
            base_backoff_ms: defaults::feed::BASE_BACKOFF_MS,
            max_backoff_ms: defaults::feed::MAX_BACKOFF_MS,
            max_reconnect_attempts: defaults::feed::MAX_RECONNECT_ATTEMPTS,
            queue_capacity: defaults::feed::QUEUE_CAPACITY,
        }
    }
}

impl FeedConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn subscribe_timeout(&self) -> Duration {
        Duration::from_millis(self.subscribe_timeout_ms)
    }

    pub fn message_timeout(&self) -> Duration {
        Duration::from_millis(self.message_timeout_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }
}

/// Trade frequency, capital and exit limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Target quote-currency notional per buy
    pub per_trade_notional: Decimal,
    pub min_trade_interval_secs: u64,
    pub max_trades_per_day: u32,
    pub stop_loss_percent: Decimal,
    pub take_profit_percent: Decimal,
    pub trading_enabled: bool,
    pub sandbox_mode: bool,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            per_trade_notional: Decimal::from(150),
            min_trade_interval_secs: 300,
            max_trades_per_day: 5,
            stop_loss_percent: Decimal::from(5),
            take_profit_percent: Decimal::from(10),
            trading_enabled: false,
            sandbox_mode: true,
        }
    }
}

/// Venue rules the exchange does not publish authoritatively
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueConfig {
    pub rest_url: String,
    pub trade_mode: String,
    pub min_order_notional_sandbox: Decimal,
    pub min_order_notional_live: Decimal,
    /// Percent of available balance one order may consume
    pub balance_utilization_percent: Decimal,
    pub sandbox_price_offset_percent: Decimal,
    pub request_timeout_ms: u64,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            rest_url: defaults::okx::REST_URL.to_string(),
            trade_mode: defaults::okx::TRADE_MODE.to_string(),
            min_order_notional_sandbox: Decimal::from(defaults::venue::MIN_ORDER_NOTIONAL_SANDBOX),
            min_order_notional_live: Decimal::from(defaults::venue::MIN_ORDER_NOTIONAL_LIVE),
            balance_utilization_percent: Decimal::from(
                defaults::venue::BALANCE_UTILIZATION_PERCENT,
            ),
            sandbox_price_offset_percent: Decimal::new(
                defaults::venue::SANDBOX_PRICE_OFFSET_BPS,
                2,
            ),
            request_timeout_ms: defaults::venue::REQUEST_TIMEOUT_MS,
        }
    }
}

impl VenueConfig {
    pub fn min_order_notional(&self, sandbox: bool) -> Decimal {
        if sandbox {
            self.min_order_notional_sandbox
        } else {
            self.min_order_notional_live
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Strategy selection. Without an explicit mode it is derived from the risk
/// limits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    pub mode: Option<StrategyMode>,
}

/// Decision loop cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tick_interval_ms: u64,
    pub health_check_every_ticks: u32,
    pub min_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: defaults::engine::TICK_INTERVAL_MS,
            health_check_every_ticks: defaults::engine::HEALTH_CHECK_EVERY_TICKS,
            min_history: defaults::engine::MIN_HISTORY,
        }
    }
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// API credentials for signed REST calls
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub api_key: String,
    pub secret_key: String,
    pub passphrase: String,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.secret_key.is_empty() && !self.passphrase.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &redact(&self.api_key))
            .field("secret_key", &redact(&self.secret_key))
            .field("passphrase", &redact(&self.passphrase))
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl TradingConfig {
    pub const ENV_PREFIX: &'static str = "OKX_SIGNALS";

    /// Load from an optional TOML file plus `OKX_SIGNALS_*` overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, Self::ENV_PREFIX)
    }

    /// Load with a custom environment prefix
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading trading config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: TradingConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.expand_env_vars()?;
        config.validate()?;

        debug!(
            "Config loaded: instrument={} bar={} mode={}",
            config.feed.instrument,
            config.feed.bar,
            config.resolved_mode()
        );
        Ok(config)
    }

    /// Expand `${VAR}` references in credentials and endpoints
    pub fn expand_env_vars(&mut self) -> Result<()> {
        let fields: [(&mut String, &str); 5] = [
            (&mut self.credentials.api_key, "api key"),
            (&mut self.credentials.secret_key, "secret key"),
            (&mut self.credentials.passphrase, "passphrase"),
            (&mut self.feed.ws_url, "websocket URL"),
            (&mut self.venue.rest_url, "REST URL"),
        ];
        for (value, label) in fields {
            let expanded = shellexpand::env(value.as_str())
                .with_context(|| format!("Failed to expand {}", label))?
                .into_owned();
            *value = expanded;
        }
        Ok(())
    }

    /// Strategy mode in force: explicit if configured, otherwise derived
    pub fn resolved_mode(&self) -> StrategyMode {
        self.strategy
            .mode
            .unwrap_or_else(|| StrategyMode::derive(&self.risk))
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let feed = &self.feed;
        if feed.max_points == 0 {
            return Err(invalid("feed.max_points", "must be at least 1"));
        }
        if feed.queue_capacity == 0 {
            return Err(invalid("feed.queue_capacity", "must be at least 1"));
        }
        if feed.base_backoff_ms == 0 || feed.base_backoff_ms > feed.max_backoff_ms {
            return Err(invalid(
                "feed.base_backoff_ms",
                format!(
                    "must be positive and not exceed max_backoff_ms ({})",
                    feed.max_backoff_ms
                ),
            ));
        }
        if feed.max_reconnect_attempts == 0 {
            return Err(invalid("feed.max_reconnect_attempts", "must be at least 1"));
        }
        if feed.bar.trim().is_empty() {
            return Err(invalid("feed.bar", "must not be empty"));
        }

        let risk = &self.risk;
        if risk.per_trade_notional <= Decimal::ZERO {
            return Err(invalid("risk.per_trade_notional", "must be positive"));
        }
        if risk.stop_loss_percent <= Decimal::ZERO {
            return Err(invalid("risk.stop_loss_percent", "must be positive"));
        }
        if risk.take_profit_percent <= Decimal::ZERO {
            return Err(invalid("risk.take_profit_percent", "must be positive"));
        }

        let venue = &self.venue;
        if venue.balance_utilization_percent <= Decimal::ZERO
            || venue.balance_utilization_percent > Decimal::ONE_HUNDRED
        {
            return Err(invalid(
                "venue.balance_utilization_percent",
                "must be in (0, 100]",
            ));
        }
        if venue.min_order_notional_sandbox < Decimal::ZERO
            || venue.min_order_notional_live < Decimal::ZERO
        {
            return Err(invalid("venue.min_order_notional", "must not be negative"));
        }

        if self.engine.tick_interval_ms == 0 {
            return Err(invalid("engine.tick_interval_ms", "must be positive"));
        }
        if self.engine.health_check_every_ticks == 0 {
            return Err(invalid("engine.health_check_every_ticks", "must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = TradingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.feed.instrument.as_str(), "BTC-USDT");
        assert_eq!(config.resolved_mode(), StrategyMode::Conservative);
        assert_eq!(config.venue.min_order_notional(true), dec!(50));
        assert_eq!(config.venue.min_order_notional(false), dec!(5));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("okx_signals.toml");
        fs::write(
            &path,
            r#"
[feed]
instrument = "eth-usdt"
bar = "5m"
max_points = 1000

[risk]
per_trade_notional = 300
min_trade_interval_secs = 180
max_trades_per_day = 10
stop_loss_percent = 3.0
take_profit_percent = 6.0
trading_enabled = true

[credentials]
api_key = "key"
"#,
        )
        .unwrap();

        let config = TradingConfig::load_with_prefix(Some(&path), "OKX_SIGNALS_TEST_FILE").unwrap();
        assert_eq!(config.feed.instrument.as_str(), "ETH-USDT");
        assert_eq!(config.feed.bar, "5m");
        assert_eq!(config.feed.max_points, 1000);
        assert_eq!(config.risk.per_trade_notional, dec!(300));
        assert_eq!(config.risk.stop_loss_percent, dec!(3));
        assert!(config.risk.trading_enabled);
        assert!(config.risk.sandbox_mode);
        assert_eq!(config.resolved_mode(), StrategyMode::Balanced);
        assert!(!config.credentials.is_complete());
        // Untouched sections keep defaults
        assert_eq!(config.feed.keepalive_interval_ms, 25_000);
    }

    #[test]
    fn test_explicit_mode_wins_over_derivation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mode.toml");
        fs::write(&path, "[strategy]\nmode = \"aggressive\"\n").unwrap();

        let config = TradingConfig::load_with_prefix(Some(&path), "OKX_SIGNALS_TEST_MODE").unwrap();
        assert_eq!(config.resolved_mode(), StrategyMode::Aggressive);
    }

    #[test]
    fn test_environment_override() {
        std::env::set_var("OKX_SIGNALS_TEST_ENV_RISK__MAX_TRADES_PER_DAY", "7");
        std::env::set_var("OKX_SIGNALS_TEST_ENV_ENGINE__MIN_HISTORY", "40");

        let config = TradingConfig::load_with_prefix(None, "OKX_SIGNALS_TEST_ENV").unwrap();
        assert_eq!(config.risk.max_trades_per_day, 7);
        assert_eq!(config.engine.min_history, 40);

        std::env::remove_var("OKX_SIGNALS_TEST_ENV_RISK__MAX_TRADES_PER_DAY");
        std::env::remove_var("OKX_SIGNALS_TEST_ENV_ENGINE__MIN_HISTORY");
    }

    #[test]
    fn test_credentials_expand_from_environment() {
        std::env::set_var("OKX_SIGNALS_TEST_SECRET", "s3cret");
        let mut config = TradingConfig::default();
        config.credentials.secret_key = "${OKX_SIGNALS_TEST_SECRET}".to_string();
        config.expand_env_vars().unwrap();
        assert_eq!(config.credentials.secret_key, "s3cret");
        assert!(!format!("{:?}", config.credentials).contains("s3cret"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = TradingConfig::default();
        config.risk.per_trade_notional = Decimal::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "risk.per_trade_notional", .. })
        ));

        let mut config = TradingConfig::default();
        config.feed.base_backoff_ms = 120_000;
        assert!(config.validate().is_err());

        let mut config = TradingConfig::default();
        config.venue.balance_utilization_percent = dec!(120);
        assert!(config.validate().is_err());
    }
}
