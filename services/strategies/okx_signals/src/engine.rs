//! # Signal Engine - Decision Loop
//!
//! ## Architecture Role
//!
//! ```text
//! Feed read loop ──candles──► [drain queue] → PriceSeries → IndicatorSet
//!                                                  │
//!                     ┌────────────────────────────┤
//!                     ▼                            ▼
//!            [stop-loss / take-profit]     [SignalDetector]
//!                     │                            │ buy        │ sell
//!                     │                  [gate] → [sizer]       │
//!                     ▼                            ▼            ▼
//!                              [OrderExecutor + PositionLedger]
//! ```
//!
//! The engine owns the series, the ledger and the session outright. It runs
//! on a fixed tick: each tick drains whatever candles arrived, recomputes
//! indicators only when the series changed, and publishes an
//! [`EngineSnapshot`] for outside readers. Control arrives over an
//! [`EngineHandle`], never by sharing the engine's state.
//!
//! ## Tick Order
//!
//! 1. Drain decoded candles into the series
//! 2. Every `health_check_every_ticks` ticks, poll feed health; an exhausted
//!    reconnect budget ends the loop with [`StrategyError::FeedUnavailable`]
//! 3. Stop-loss / take-profit on the open position; a forced exit skips
//!    signal evaluation for this tick
//! 4. Signal evaluation on new data once `min_history` candles exist

use crate::detector::SignalDetector;
use crate::error::{Result, StrategyError};
use crate::executor::{ExecutionResult, OrderExecutor};
use crate::indicators::{IndicatorSet, IndicatorValues};
use crate::ledger::PositionLedger;
use crate::risk::{check_exit, SizingDecision, SizingRejected};
use crate::session::{GateRejection, TradingSession};
use crate::signals::{Signal, SignalStats};
use adapter_service::{ExchangeClient, FeedHealth, InputAdapter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use signal_config::{RiskLimits, StrategyMode, TradingConfig};
use std::sync::Arc;
use strategy_shared::{MetricsCollector, Strategy, StrategyMetrics};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use types::{to_decimal, Candle, InstrumentId, Position, PriceSeries, TradeRecord, TradeTrigger};

/// Runtime control messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    EnableTrading,
    DisableTrading,
    /// Change retained history, truncating to the newest candles
    SetCapacity(usize),
    Stop,
}

/// Read-only status published after every tick
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineSnapshot {
    pub instrument: String,
    pub mode: String,
    /// Feed connection health; `None` until the first publish
    pub feed: Option<FeedHealth>,
    pub last_price: Option<f64>,
    pub series_len: usize,
    pub indicators: Option<IndicatorValues>,
    /// Description of the most recent accepted signal
    pub last_signal: Option<String>,
    pub positions: Vec<Position>,
    pub trade_count: usize,
    pub last_trade: Option<TradeRecord>,
    pub daily_trades: u32,
    pub trading_enabled: bool,
    pub metrics: StrategyMetrics,
    pub signal_stats: SignalStats,
}

impl EngineSnapshot {
    /// One-line status for periodic logging
    pub fn summary(&self) -> String {
        let feed = self
            .feed
            .as_ref()
            .map(|f| format!("{:?}/{:?}", f.state, f.level))
            .unwrap_or_else(|| "unknown".to_string());
        let price = self
            .last_price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "{} {} | feed {} | price {} | series {} | positions {} | trades {} (today {}) | trading {} | last signal {}",
            self.instrument,
            self.mode,
            feed,
            price,
            self.series_len,
            self.positions.len(),
            self.trade_count,
            self.daily_trades,
            if self.trading_enabled { "on" } else { "off" },
            self.last_signal.as_deref().unwrap_or("none")
        )
    }
}

/// Cloneable control surface for a running engine
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<EngineCommand>,
    snapshot: Arc<RwLock<EngineSnapshot>>,
}

impl EngineHandle {
    fn send(&self, command: EngineCommand) {
        // A closed channel means the engine already exited
        if self.commands.send(command).is_err() {
            debug!("Engine gone, dropping {:?}", command);
        }
    }

    pub fn enable_trading(&self) {
        self.send(EngineCommand::EnableTrading);
    }

    pub fn disable_trading(&self) {
        self.send(EngineCommand::DisableTrading);
    }

    pub fn set_capacity(&self, capacity: usize) {
        self.send(EngineCommand::SetCapacity(capacity));
    }

    /// Idempotent
    pub fn stop(&self) {
        self.send(EngineCommand::Stop);
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshot.read().clone()
    }
}

/// What one tick did, for logs and tests
#[derive(Debug, Default)]
pub struct TickReport {
    pub candles_applied: usize,
    pub forced_exit: Option<ExecutionResult>,
    pub signal: Option<Signal>,
    pub gate_rejection: Option<GateRejection>,
    pub sizing_rejection: Option<SizingRejected>,
    pub execution: Option<ExecutionResult>,
}

pub struct SignalEngine {
    config: TradingConfig,
    instrument: InstrumentId,
    limits: RiskLimits,
    feed: Box<dyn InputAdapter>,
    candles: mpsc::Receiver<Candle>,
    executor: OrderExecutor,
    series: PriceSeries,
    indicators: IndicatorSet,
    detector: SignalDetector,
    session: TradingSession,
    ledger: PositionLedger,
    metrics: Arc<MetricsCollector>,
    snapshot: Arc<RwLock<EngineSnapshot>>,
    command_tx: mpsc::UnboundedSender<EngineCommand>,
    command_rx: mpsc::UnboundedReceiver<EngineCommand>,
    dirty: bool,
    ticks: u64,
    last_signal: Option<String>,
    stopped: bool,
}

impl SignalEngine {
    pub fn new(
        config: TradingConfig,
        feed: Box<dyn InputAdapter>,
        candles: mpsc::Receiver<Candle>,
        exchange: Arc<dyn ExchangeClient>,
    ) -> Result<Self> {
        config.validate()?;
        let mode = config.resolved_mode();
        let limits = config.risk.clone();
        let instrument = config.feed.instrument.clone();
        let executor = OrderExecutor::new(exchange, config.venue.clone(), limits.sandbox_mode);
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        Ok(Self {
            instrument,
            series: PriceSeries::new(config.feed.max_points),
            indicators: IndicatorSet::default(),
            detector: SignalDetector::new(mode),
            session: TradingSession::from_limits(&limits, Utc::now()),
            ledger: PositionLedger::new(),
            metrics: Arc::new(MetricsCollector::new()),
            snapshot: Arc::new(RwLock::new(EngineSnapshot::default())),
            limits,
            feed,
            candles,
            executor,
            command_tx,
            command_rx,
            dirty: false,
            ticks: 0,
            last_signal: None,
            stopped: false,
            config,
        })
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            commands: self.command_tx.clone(),
            snapshot: self.snapshot.clone(),
        }
    }

    pub fn mode(&self) -> StrategyMode {
        self.detector.mode()
    }

    pub fn series(&self) -> &PriceSeries {
        &self.series
    }

    pub fn indicators(&self) -> &IndicatorSet {
        &self.indicators
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn session(&self) -> &TradingSession {
        &self.session
    }

    pub fn detector(&self) -> &SignalDetector {
        &self.detector
    }

    pub fn metrics_collector(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Seed the series from the historical-candles endpoint. A failure only
    /// means the detector waits for live candles to fill the window.
    pub async fn bootstrap(&mut self) -> usize {
        let exchange = self.executor.exchange().clone();
        let fetched = exchange
            .historical_candles(&self.instrument, &self.config.feed.bar, self.config.feed.max_points)
            .await;

        match fetched {
            Ok(candles) => {
                let fetched = candles.len();
                let applied = self.series.extend_history(candles);
                self.metrics.add_candles(applied as u64);
                self.dirty = applied > 0;
                info!(
                    "Bootstrapped {} with {} historical candles ({} fetched)",
                    self.instrument, applied, fetched
                );
                self.refresh_indicators();
                self.publish_snapshot();
                applied
            }
            Err(e) => {
                warn!("Historical bootstrap for {} failed: {}", self.instrument, e);
                self.metrics.increment_errors();
                0
            }
        }
    }

    pub fn apply_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::EnableTrading => {
                self.session.enable_trading();
                info!("Trading enabled for {}", self.instrument);
            }
            EngineCommand::DisableTrading => {
                self.session.disable_trading();
                info!("Trading disabled for {}", self.instrument);
            }
            EngineCommand::SetCapacity(capacity) => {
                let evicted = self.series.set_capacity(capacity);
                self.config.feed.max_points = capacity;
                if evicted > 0 {
                    self.dirty = true;
                    self.refresh_indicators();
                }
                info!("Series capacity {} ({} evicted)", capacity, evicted);
            }
            EngineCommand::Stop => {
                self.stopped = true;
            }
        }
        self.publish_snapshot();
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            self.apply_command(command);
        }
    }

    fn drain_candles(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(candle) = self.candles.try_recv() {
            if self.series.push(candle).changed() {
                applied += 1;
            }
        }
        if applied > 0 {
            self.dirty = true;
            self.metrics.add_candles(applied as u64);
        }
        applied
    }

    fn refresh_indicators(&mut self) {
        self.indicators = IndicatorSet::compute(&self.series);
    }

    /// One decision-loop iteration at wall time `now`
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<TickReport> {
        if self.stopped {
            return Err(StrategyError::Stopped);
        }
        self.ticks += 1;
        self.drain_commands();
        if self.stopped {
            self.publish_snapshot();
            return Ok(TickReport::default());
        }

        let mut report = TickReport {
            candles_applied: self.drain_candles(),
            ..TickReport::default()
        };

        let every = u64::from(self.config.engine.health_check_every_ticks.max(1));
        if self.ticks % every == 0 {
            let health = self.feed.check_health();
            if health.feed_unavailable {
                self.publish_snapshot();
                let reason = health
                    .last_error
                    .unwrap_or_else(|| "reconnect attempts exhausted".to_string());
                error!("{} Feed for {} unavailable: {}", crate::logging::LogEmoji::STOP, self.instrument, reason);
                return Err(StrategyError::FeedUnavailable { reason });
            }
            if health.has_issues() {
                debug!("Feed health {:?}", health);
            }
        }

        if self.dirty {
            self.refresh_indicators();
        }

        if let Some(result) = self.check_stops(now).await {
            report.forced_exit = Some(result);
            self.dirty = false;
            self.publish_snapshot();
            return Ok(report);
        }

        if self.dirty && self.series.len() >= self.config.engine.min_history {
            let has_position = self.ledger.has_position(&self.instrument);
            if let Some(signal) = self.detector.decide(&self.indicators, has_position) {
                self.metrics.increment_signals();
                let description = signal.describe();
                log_signal!("{} {}", self.instrument, description);
                self.last_signal = Some(description);
                report.signal = Some(signal);
                self.act_on(signal, now, &mut report).await;
            }
        }

        self.dirty = false;
        self.publish_snapshot();
        Ok(report)
    }

    /// Force a sell when the open position crossed its stop-loss or
    /// take-profit level at the latest close
    async fn check_stops(&mut self, now: DateTime<Utc>) -> Option<ExecutionResult> {
        let position = self.ledger.position(&self.instrument)?;
        let current = self.series.last().and_then(|c| to_decimal(c.close))?;
        let exit = check_exit(position, current, &self.limits)?;

        warn!(
            "{} {} on {} at {} (P&L {}%)",
            crate::logging::LogEmoji::STOP,
            exit.trade_trigger(),
            self.instrument,
            current,
            exit.pnl_percent().round_dp(2)
        );
        let result = self
            .executor
            .sell(&self.instrument, exit.trade_trigger(), None, &mut self.ledger, now)
            .await;
        self.count_execution(&result);
        Some(result)
    }

    async fn act_on(&mut self, signal: Signal, now: DateTime<Utc>, report: &mut TickReport) {
        let strength = Some(signal.strength());
        match signal {
            Signal::Buy(_) => {
                if let Err(rejection) = self.session.check_conditions(&self.limits, now) {
                    info!("Buy signal for {} gated: {}", self.instrument, rejection);
                    self.metrics.increment_rejections();
                    report.gate_rejection = Some(rejection);
                    return;
                }

                let size = match self.executor.size_buy(&self.instrument, &self.limits).await {
                    SizingDecision::Sized { size, notional } => {
                        debug!("Sized buy {} ({} notional)", size, notional);
                        size
                    }
                    SizingDecision::Rejected(rejection) => {
                        info!("Buy for {} skipped: {}", self.instrument, rejection);
                        self.metrics.increment_rejections();
                        report.sizing_rejection = Some(rejection);
                        return;
                    }
                };

                let result = self
                    .executor
                    .buy(&self.instrument, size, strength, &mut self.ledger, &mut self.session, now)
                    .await;
                self.count_execution(&result);
                report.execution = Some(result);
            }
            Signal::Sell(_) => {
                let result = self
                    .executor
                    .sell(&self.instrument, TradeTrigger::Signal, strength, &mut self.ledger, now)
                    .await;
                self.count_execution(&result);
                report.execution = Some(result);
            }
        }
    }

    fn count_execution(&self, result: &ExecutionResult) {
        if result.success {
            self.metrics.increment_trades();
        } else {
            self.metrics.increment_rejections();
        }
    }

    fn publish_snapshot(&self) {
        let snapshot = EngineSnapshot {
            instrument: self.instrument.to_string(),
            mode: self.detector.mode().as_str().to_string(),
            feed: Some(self.feed.health()),
            last_price: self.series.last().map(|c| c.close),
            series_len: self.series.len(),
            indicators: self.indicators.latest(),
            last_signal: self.last_signal.clone(),
            positions: self.ledger.positions().cloned().collect(),
            trade_count: self.ledger.history().len(),
            last_trade: self.ledger.history().last().cloned(),
            daily_trades: self.session.daily_trades(),
            trading_enabled: self.session.is_trading_enabled(),
            metrics: self.metrics.get_metrics(),
            signal_stats: self.detector.stats().clone(),
        };
        *self.snapshot.write() = snapshot;
    }

    /// Bootstrap, start the feed and tick until stopped or the feed is
    /// declared unavailable
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "{} Starting {} engine for {} ({} mode, {})",
            crate::logging::LogEmoji::NETWORK,
            self.name(),
            self.instrument,
            self.detector.mode().as_str(),
            if self.limits.sandbox_mode { "sandbox" } else { "live" }
        );

        self.bootstrap().await;
        self.feed.start().await?;

        let mut interval = tokio::time::interval(self.config.engine.tick_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let outcome = loop {
            if self.stopped {
                break Ok(());
            }

            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick(Utc::now()).await {
                        self.metrics.increment_errors();
                        break Err(e);
                    }
                }
                Some(command) = self.command_rx.recv() => {
                    self.apply_command(command);
                }
            }
        };

        self.shutdown().await?;
        outcome
    }

    /// Stop the feed and mark the engine stopped. Idempotent.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stopped = true;
        self.feed.stop().await?;
        self.publish_snapshot();
        info!("{} Engine for {} stopped", crate::logging::LogEmoji::STOP, self.instrument);
        Ok(())
    }
}

#[async_trait]
impl Strategy for SignalEngine {
    fn name(&self) -> &'static str {
        "okx_signals"
    }

    async fn start(&mut self) -> anyhow::Result<()> {
        self.run().await.map_err(anyhow::Error::from)
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        self.shutdown().await.map_err(anyhow::Error::from)
    }

    fn metrics(&self) -> StrategyMetrics {
        self.metrics.get_metrics()
    }
}
