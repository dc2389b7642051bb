//! OKX Signal Strategy entry point
//!
//! ```text
//! okx_signals --config configs/okx_signals.toml --mode balanced --json-logs
//! ```
//!
//! Trading starts disabled unless `risk.trading_enabled` is set or
//! `--enable-trading` is passed. Orders go to simulated trading unless
//! `--live` is given.

use adapter_service::{OkxCandleCollector, OkxRestClient};
use anyhow::{Context, Result};
use clap::Parser;
use okx_signals::logging::{init_logging, LogEmoji};
use okx_signals::{SignalEngine, StrategyError};
use signal_config::{StrategyMode, TradingConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "okx_signals", about = "Indicator-driven OKX spot signal strategy")]
struct Args {
    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,

    /// Trade against the live venue instead of simulated trading
    #[arg(long)]
    live: bool,

    /// Apply a strategy preset (conservative, balanced, aggressive)
    #[arg(short, long)]
    mode: Option<StrategyMode>,

    /// Enable order placement at startup
    #[arg(long)]
    enable_trading: bool,

    /// Seconds between status reports
    #[arg(long, default_value_t = 60)]
    status_interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs)?;

    let config = load_config(&args).context("Failed to load configuration")?;
    let sandbox = config.risk.sandbox_mode;

    info!("📋 Strategy configuration:");
    info!("   Instrument: {} ({})", config.feed.instrument, config.feed.bar);
    info!("   Mode: {}", config.resolved_mode());
    info!(
        "   Per trade: {} | interval {}s | {} trades/day",
        config.risk.per_trade_notional,
        config.risk.min_trade_interval_secs,
        config.risk.max_trades_per_day
    );
    info!(
        "   Stop-loss {}% | take-profit {}%",
        config.risk.stop_loss_percent, config.risk.take_profit_percent
    );
    info!(
        "   Trading {} on {}",
        if config.risk.trading_enabled { "enabled" } else { "disabled" },
        if sandbox { "simulated venue" } else { "LIVE venue" }
    );

    if !config.credentials.is_complete() {
        warn!("API credentials incomplete; balance and order calls will fail");
    }

    let exchange = OkxRestClient::new(&config.venue, config.credentials.clone(), sandbox)
        .context("Failed to build REST client")?;
    let (collector, candles) = OkxCandleCollector::with_queue(config.feed.clone());

    let status_every = Duration::from_secs(args.status_interval.max(1));
    let mut engine = SignalEngine::new(config, Box::new(collector), candles, Arc::new(exchange))
        .context("Invalid engine configuration")?;
    let handle = engine.handle();

    let shutdown = handle.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => error!("Failed to listen for ctrl-c: {}", e),
        }
        shutdown.stop();
    });

    let reporter = handle.clone();
    let json_status = args.json_logs;
    let status_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(status_every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let status = reporter.snapshot();
            if json_status {
                match serde_json::to_string(&status) {
                    Ok(json) => info!(snapshot = %json, "status"),
                    Err(e) => warn!("Failed to serialize status: {}", e),
                }
                continue;
            }
            okx_signals::log_metrics!("{}", status.summary());
        }
    });

    let outcome = engine.run().await;
    status_task.abort();

    match outcome {
        Ok(()) => {
            okx_signals::log_success!("Strategy stopped cleanly");
            Ok(())
        }
        Err(StrategyError::FeedUnavailable { reason }) => {
            error!("{} Feed unavailable, restart required: {}", LogEmoji::ERROR, reason);
            Err(anyhow::anyhow!("feed unavailable: {}", reason))
        }
        Err(e) => Err(e).context("Strategy execution failed"),
    }
}

fn load_config(args: &Args) -> Result<TradingConfig> {
    let mut config = TradingConfig::load(args.config.as_deref())?;

    if let Some(mode) = args.mode {
        let preset = mode.preset();
        config.risk = signal_config::RiskLimits {
            trading_enabled: config.risk.trading_enabled,
            sandbox_mode: config.risk.sandbox_mode,
            ..preset
        };
        config.strategy.mode = Some(mode);
    }
    if args.live {
        config.risk.sandbox_mode = false;
    }
    if args.enable_trading {
        config.risk.trading_enabled = true;
    }

    config.validate()?;
    Ok(config)
}
