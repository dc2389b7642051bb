//! Scripted venue and feed doubles for engine tests

#![allow(dead_code)]

use adapter_service::{
    AdapterError, ConnectionState, ExchangeClient, FeedHealth, HealthLevel, InputAdapter,
    InstrumentRules, OrderAck, OrderRequest, OrderState, OrderStatus,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use signal_config::{StrategyMode, TradingConfig};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use types::{Candle, InstrumentId};

pub fn btc() -> InstrumentId {
    InstrumentId::new("BTC-USDT").unwrap()
}

/// Candle closing at `close`, minute `minute`
pub fn candle(minute: i64, close: f64) -> Candle {
    Candle::new(minute * 60_000, close - 0.3, close + 0.5, close - 0.5, close, 10.0)
}

/// `count` candles rising one unit per minute from `start`
pub fn uptrend(count: usize, start: f64) -> Vec<Candle> {
    (0..count)
        .map(|i| candle(i as i64, start + i as f64))
        .collect()
}

/// Aggressive profile, trading on, no interval between trades
pub fn trading_config() -> TradingConfig {
    let mut config = TradingConfig::default();
    config.feed.instrument = btc();
    config.strategy.mode = Some(StrategyMode::Aggressive);
    config.risk.trading_enabled = true;
    config.risk.min_trade_interval_secs = 0;
    config.risk.max_trades_per_day = 10;
    config.engine.health_check_every_ticks = 1;
    config
}

pub struct MockExchange {
    pub history: Mutex<Result<Vec<Candle>, String>>,
    pub ticker: Mutex<Decimal>,
    pub balance: Mutex<Option<Decimal>>,
    pub rules: InstrumentRules,
    pub rejections: Mutex<VecDeque<AdapterError>>,
    pub orders: Mutex<Vec<OrderRequest>>,
    pub rules_queries: AtomicU64,
    /// Average fill price reported for placed orders
    pub fill_price: Mutex<Option<Decimal>>,
    next_id: AtomicU64,
}

impl MockExchange {
    pub fn new() -> Self {
        Self {
            history: Mutex::new(Ok(Vec::new())),
            ticker: Mutex::new(dec!(50000)),
            balance: Mutex::new(Some(dec!(10000))),
            rules: InstrumentRules {
                instrument: btc(),
                min_size: dec!(0.0001),
                lot_size: dec!(0.0001),
                tick_size: dec!(0.1),
            },
            rejections: Mutex::new(VecDeque::new()),
            orders: Mutex::new(Vec::new()),
            rules_queries: AtomicU64::new(0),
            fill_price: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_history(self, candles: Vec<Candle>) -> Self {
        *self.history.lock() = Ok(candles);
        self
    }

    pub fn set_ticker(&self, price: Decimal) {
        *self.ticker.lock() = price;
    }

    /// Next order call fails with `error`
    pub fn reject_next(&self, error: AdapterError) {
        self.rejections.lock().push_back(error);
    }

    pub fn placed(&self) -> Vec<OrderRequest> {
        self.orders.lock().clone()
    }
}

#[async_trait]
impl ExchangeClient for MockExchange {
    async fn historical_candles(
        &self,
        _instrument: &InstrumentId,
        _bar: &str,
        limit: usize,
    ) -> adapter_service::Result<Vec<Candle>> {
        match &*self.history.lock() {
            Ok(candles) => {
                let skip = candles.len().saturating_sub(limit);
                Ok(candles[skip..].to_vec())
            }
            Err(reason) => Err(AdapterError::Internal(reason.clone())),
        }
    }

    async fn ticker_price(&self, _instrument: &InstrumentId) -> adapter_service::Result<Decimal> {
        Ok(*self.ticker.lock())
    }

    async fn instrument_rules(
        &self,
        _instrument: &InstrumentId,
    ) -> adapter_service::Result<InstrumentRules> {
        self.rules_queries.fetch_add(1, Ordering::Relaxed);
        Ok(self.rules.clone())
    }

    async fn available_balance(&self, currency: &str) -> adapter_service::Result<Decimal> {
        self.balance.lock().ok_or_else(|| AdapterError::Api {
            code: "50001".to_string(),
            message: format!("balance for {} unavailable", currency),
        })
    }

    async fn place_order(&self, order: &OrderRequest) -> adapter_service::Result<OrderAck> {
        if let Some(error) = self.rejections.lock().pop_front() {
            return Err(error);
        }
        self.orders.lock().push(order.clone());
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(OrderAck {
            order_id: format!("ord-{}", id),
            client_order_id: None,
        })
    }

    async fn cancel_order(&self, _instrument: &InstrumentId, _order_id: &str) -> adapter_service::Result<()> {
        Ok(())
    }

    async fn order_state(
        &self,
        _instrument: &InstrumentId,
        order_id: &str,
    ) -> adapter_service::Result<OrderState> {
        let fill = *self.fill_price.lock();
        Ok(OrderState {
            order_id: order_id.to_string(),
            status: if fill.is_some() {
                OrderStatus::Filled
            } else {
                OrderStatus::Live
            },
            filled_size: Decimal::ZERO,
            average_price: fill,
        })
    }
}

/// Shared switches behind a [`MockFeed`]
#[derive(Default)]
pub struct FeedControl {
    pub unavailable: Mutex<bool>,
    pub started: Mutex<u32>,
    pub stopped: Mutex<u32>,
}

pub struct MockFeed {
    instrument: InstrumentId,
    control: Arc<FeedControl>,
}

impl MockFeed {
    pub fn new() -> (Self, Arc<FeedControl>) {
        let control = Arc::new(FeedControl::default());
        (
            Self {
                instrument: btc(),
                control: control.clone(),
            },
            control,
        )
    }
}

#[async_trait]
impl InputAdapter for MockFeed {
    fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    async fn start(&mut self) -> adapter_service::Result<()> {
        *self.control.started.lock() += 1;
        Ok(())
    }

    async fn stop(&mut self) -> adapter_service::Result<()> {
        *self.control.stopped.lock() += 1;
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        if *self.control.unavailable.lock() {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Connected
        }
    }

    fn check_health(&self) -> FeedHealth {
        self.health()
    }

    fn health(&self) -> FeedHealth {
        let unavailable = *self.control.unavailable.lock();
        FeedHealth {
            level: if unavailable {
                HealthLevel::Unhealthy
            } else {
                HealthLevel::Healthy
            },
            state: self.state(),
            reconnect_attempts: if unavailable { 10 } else { 0 },
            last_error: unavailable.then(|| "connection refused".to_string()),
            silence_ms: 0,
            messages_received: 0,
            malformed_frames: 0,
            dropped_candles: 0,
            feed_unavailable: unavailable,
        }
    }

    async fn reconnect(&self) -> adapter_service::Result<()> {
        Ok(())
    }
}
