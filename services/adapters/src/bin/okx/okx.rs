//! # OKX Candle Feed Monitor
//!
//! Standalone runner for the candle connector: subscribes to one instrument,
//! logs every candle update and reports feed health on an interval. Useful
//! for checking connectivity and reconnect behaviour without the strategy.
//!
//! ```text
//! okx_feed --config okx_signals.toml --instrument ETH-USDT --bar 5m
//! ```

use adapter_service::{InputAdapter, OkxCandleCollector};
use anyhow::{Context, Result};
use clap::Parser;
use signal_config::TradingConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use types::InstrumentId;

#[derive(Debug, Parser)]
#[command(name = "okx_feed", about = "Stream OKX candles and report feed health")]
struct Args {
    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Instrument override, e.g. ETH-USDT
    #[arg(short, long)]
    instrument: Option<InstrumentId>,

    /// Candle interval override, e.g. 1m, 5m, 1H
    #[arg(short, long)]
    bar: Option<String>,

    /// Seconds between health reports
    #[arg(long, default_value_t = 30)]
    health_interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("okx_feed=info,adapter_service=info")),
        )
        .init();

    let args = Args::parse();
    let mut config =
        TradingConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(instrument) = args.instrument {
        config.feed.instrument = instrument;
    }
    if let Some(bar) = args.bar {
        config.feed.bar = bar;
    }

    info!("📋 Feed configuration:");
    info!("   WebSocket: {}", config.feed.ws_url);
    info!("   Instrument: {} ({})", config.feed.instrument, config.feed.bar);

    let (mut collector, mut candles) = OkxCandleCollector::with_queue(config.feed.clone());
    collector.start().await.context("Failed to start feed")?;

    let mut health_ticker =
        tokio::time::interval(Duration::from_secs(args.health_interval.max(1)));
    health_ticker.tick().await;

    loop {
        tokio::select! {
            candle = candles.recv() => match candle {
                Some(c) => info!(
                    "🕯️ {} o={} h={} l={} c={} v={}",
                    c.timestamp_ms, c.open, c.high, c.low, c.close, c.volume
                ),
                None => {
                    warn!("Candle queue closed");
                    break;
                }
            },
            _ = health_ticker.tick() => {
                let health = collector.check_health();
                info!(
                    "📊 {:?} state={:?} messages={} malformed={} dropped={} attempts={}",
                    health.level,
                    health.state,
                    health.messages_received,
                    health.malformed_frames,
                    health.dropped_candles,
                    health.reconnect_attempts
                );
                if health.feed_unavailable {
                    error!("🔥 Feed unavailable: {:?}", health.last_error);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("📡 Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    collector.stop().await.context("Failed to stop feed")?;
    info!("✅ Feed stopped");
    Ok(())
}
