//! # Order Executor
//!
//! Turns accepted signals into venue orders and keeps the position ledger in
//! step with what the venue accepted.
//!
//! ## Order Shape
//!
//! - **Live**: market order for the sized quantity
//! - **Sandbox**: limit order priced through the touch (ticker +offset% for
//!   buys, -offset% for sells) and rounded to the tick size, so it fills
//!   inside the simulated venue's price band
//!
//! ## State Changes
//!
//! Trades are recorded at the venue's average fill price. An order with no
//! fill reported yet (a resting sandbox limit) falls back to the ticker
//! price the order was built from.
//!
//! Only an acknowledged order mutates anything. A rejected buy leaves the
//! ledger and session untouched; a rejected sell leaves the position open so
//! the next cycle can retry.

use crate::ledger::PositionLedger;
use crate::risk::{compute_size, SizingDecision, SizingRejected};
use crate::session::TradingSession;
use adapter_service::{AdapterError, ExchangeClient, InstrumentRules, OrderRequest};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;
use signal_config::{RiskLimits, VenueConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use types::{round_to_step, InstrumentId, Position, Side, TradeRecord, TradeTrigger};

/// Structured order failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderError {
    pub code: String,
    pub message: String,
}

impl OrderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&AdapterError> for OrderError {
    fn from(error: &AdapterError) -> Self {
        match error {
            AdapterError::Api { code, message } => OrderError::new(code.clone(), message.clone()),
            AdapterError::RateLimitExceeded(_) => OrderError::new("rate_limited", error.to_string()),
            AdapterError::AuthenticationFailed { .. } => {
                OrderError::new("authentication", error.to_string())
            }
            _ => OrderError::new("request_failed", error.to_string()),
        }
    }
}

/// Outcome of one buy or sell attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub side: Side,
    pub order_id: Option<String>,
    /// Price the trade was recorded at
    pub price: Option<Decimal>,
    pub size: Decimal,
    pub error: Option<OrderError>,
    /// Realised P&L percent, sells only
    pub profit_percent: Option<Decimal>,
}

impl ExecutionResult {
    fn filled(side: Side, order_id: String, price: Decimal, size: Decimal) -> Self {
        Self {
            success: true,
            side,
            order_id: Some(order_id),
            price: Some(price),
            size,
            error: None,
            profit_percent: None,
        }
    }

    fn failed(side: Side, size: Decimal, error: OrderError) -> Self {
        Self {
            success: false,
            side,
            order_id: None,
            price: None,
            size,
            error: Some(error),
            profit_percent: None,
        }
    }
}

pub struct OrderExecutor {
    exchange: Arc<dyn ExchangeClient>,
    venue: VenueConfig,
    sandbox: bool,
    rules_cache: RwLock<HashMap<InstrumentId, InstrumentRules>>,
}

impl OrderExecutor {
    pub fn new(exchange: Arc<dyn ExchangeClient>, venue: VenueConfig, sandbox: bool) -> Self {
        Self {
            exchange,
            venue,
            sandbox,
            rules_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_sandbox(&self) -> bool {
        self.sandbox
    }

    pub fn exchange(&self) -> &Arc<dyn ExchangeClient> {
        &self.exchange
    }

    /// Instrument rules, fetched once per instrument
    pub async fn rules(&self, instrument: &InstrumentId) -> adapter_service::Result<InstrumentRules> {
        let cached = self.rules_cache.read().get(instrument).cloned();
        if let Some(rules) = cached {
            return Ok(rules);
        }

        let rules = self.exchange.instrument_rules(instrument).await?;
        debug!(
            "Rules for {}: min {} lot {} tick {}",
            instrument, rules.min_size, rules.lot_size, rules.tick_size
        );
        self.rules_cache
            .write()
            .insert(instrument.clone(), rules.clone());
        Ok(rules)
    }

    /// Size a buy from the quote balance, ticker and instrument rules. Any
    /// failed query yields a rejection, never an error.
    pub async fn size_buy(&self, instrument: &InstrumentId, limits: &RiskLimits) -> SizingDecision {
        let queried = async {
            let balance = self
                .exchange
                .available_balance(instrument.quote_currency())
                .await?;
            let price = self.exchange.ticker_price(instrument).await?;
            let rules = self.rules(instrument).await?;
            Ok::<_, AdapterError>((balance, price, rules))
        }
        .await;

        match queried {
            Ok((balance, price, rules)) => compute_size(
                limits.per_trade_notional,
                balance,
                price,
                &rules,
                self.venue.min_order_notional(self.sandbox),
                self.venue.balance_utilization_percent,
            ),
            Err(e) => {
                warn!("Sizing query for {} failed: {}", instrument, e);
                SizingDecision::Rejected(SizingRejected::QueryFailed(e.to_string()))
            }
        }
    }

    /// Market order live, offset limit order in sandbox
    pub fn build_order(
        &self,
        instrument: &InstrumentId,
        side: Side,
        size: Decimal,
        reference_price: Decimal,
        rules: &InstrumentRules,
    ) -> OrderRequest {
        if !self.sandbox {
            return OrderRequest::market(instrument.clone(), &self.venue.trade_mode, side, size);
        }

        let offset = self.venue.sandbox_price_offset_percent / Decimal::ONE_HUNDRED;
        let factor = match side {
            Side::Buy => Decimal::ONE + offset,
            Side::Sell => Decimal::ONE - offset,
        };
        let price = round_to_step(reference_price * factor, rules.tick_size);
        OrderRequest::limit(instrument.clone(), &self.venue.trade_mode, side, size, price)
    }

    async fn submit(
        &self,
        instrument: &InstrumentId,
        side: Side,
        size: Decimal,
    ) -> Result<(String, Decimal), OrderError> {
        let reference_price = self
            .exchange
            .ticker_price(instrument)
            .await
            .map_err(|e| OrderError::from(&e))?;
        let rules = self
            .rules(instrument)
            .await
            .map_err(|e| OrderError::from(&e))?;

        let order = self.build_order(instrument, side, size, reference_price, &rules);
        log_execution!(
            "Submitting {} {} {} ({:?}{})",
            side.as_str(),
            order.size,
            instrument,
            order.order_type,
            order
                .price
                .map(|p| format!(" @ {}", p))
                .unwrap_or_default()
        );

        let ack = self
            .exchange
            .place_order(&order)
            .await
            .map_err(|e| OrderError::from(&e))?;
        let price = self
            .fill_price(instrument, &ack.order_id, reference_price)
            .await;
        Ok((ack.order_id, price))
    }

    /// Average fill price of an acknowledged order, or `reference` when the
    /// venue reports none
    async fn fill_price(&self, instrument: &InstrumentId, order_id: &str, reference: Decimal) -> Decimal {
        match self.exchange.order_state(instrument, order_id).await {
            Ok(state) => match state.average_price.filter(|p| *p > Decimal::ZERO) {
                Some(average) => {
                    debug!(
                        "Order {} {:?}, {} filled @ {}",
                        order_id, state.status, state.filled_size, average
                    );
                    average
                }
                None => {
                    debug!(
                        "Order {} {:?} without fills, recording reference {}",
                        order_id, state.status, reference
                    );
                    reference
                }
            },
            Err(e) => {
                warn!(
                    "Fill query for order {} failed: {}, recording reference {}",
                    order_id, e, reference
                );
                reference
            }
        }
    }

    /// Buy `size` and open a position. The session records the trade only
    /// when the venue acknowledged the order.
    pub async fn buy(
        &self,
        instrument: &InstrumentId,
        size: Decimal,
        signal_strength: Option<u8>,
        ledger: &mut PositionLedger,
        session: &mut TradingSession,
        now: DateTime<Utc>,
    ) -> ExecutionResult {
        if ledger.has_position(instrument) {
            return ExecutionResult::failed(
                Side::Buy,
                size,
                OrderError::new("position_open", format!("position already open for {}", instrument)),
            );
        }

        let (order_id, price) = match self.submit(instrument, Side::Buy, size).await {
            Ok(filled) => filled,
            Err(error) => {
                log_rejected!("Buy {} rejected ({}): {}", instrument, error.code, error.message);
                return ExecutionResult::failed(Side::Buy, size, error);
            }
        };

        let position = Position {
            instrument: instrument.clone(),
            entry_price: price,
            size,
            entry_time: now,
            order_id: order_id.clone(),
        };
        if let Err(e) = ledger.open(position) {
            return ExecutionResult::failed(Side::Buy, size, OrderError::new("position_open", e.to_string()));
        }
        ledger.record(TradeRecord {
            timestamp: now,
            instrument: instrument.clone(),
            side: Side::Buy,
            size,
            price,
            order_id: order_id.clone(),
            trigger: TradeTrigger::Signal,
            signal_strength,
            entry_price: None,
            profit_percent: None,
        });
        session.record_trade(now);

        log_success!("Bought {} {} @ {} (order {})", size, instrument, price, order_id);
        ExecutionResult::filled(Side::Buy, order_id, price, size)
    }

    /// Sell the full open position. The position stays open when the venue
    /// refuses the order.
    pub async fn sell(
        &self,
        instrument: &InstrumentId,
        trigger: TradeTrigger,
        signal_strength: Option<u8>,
        ledger: &mut PositionLedger,
        now: DateTime<Utc>,
    ) -> ExecutionResult {
        let Some(position) = ledger.position(instrument).cloned() else {
            debug!("Sell for {} ignored, no open position", instrument);
            return ExecutionResult::failed(
                Side::Sell,
                Decimal::ZERO,
                OrderError::new("no_position", format!("no open position for {}", instrument)),
            );
        };

        let (order_id, price) = match self.submit(instrument, Side::Sell, position.size).await {
            Ok(filled) => filled,
            Err(error) => {
                log_rejected!(
                    "Sell {} rejected ({}): {}, position kept",
                    instrument, error.code, error.message
                );
                return ExecutionResult::failed(Side::Sell, position.size, error);
            }
        };

        let profit_percent = position.pnl_percent(price);
        ledger.record(TradeRecord {
            timestamp: now,
            instrument: instrument.clone(),
            side: Side::Sell,
            size: position.size,
            price,
            order_id: order_id.clone(),
            trigger,
            signal_strength,
            entry_price: Some(position.entry_price),
            profit_percent,
        });
        ledger.close(instrument);

        log_profit!(
            "Sold {} {} @ {} ({}, P&L {}%)",
            position.size,
            instrument,
            price,
            trigger,
            profit_percent
                .map(|p| p.round_dp(2).to_string())
                .unwrap_or_else(|| "n/a".to_string())
        );
        ExecutionResult {
            profit_percent,
            ..ExecutionResult::filled(Side::Sell, order_id, price, position.size)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapter_service::{OrderAck, OrderState, OrderType};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use types::Candle;

    struct FixedVenue;

    #[async_trait]
    impl ExchangeClient for FixedVenue {
        async fn historical_candles(
            &self,
            _instrument: &InstrumentId,
            _bar: &str,
            _limit: usize,
        ) -> adapter_service::Result<Vec<Candle>> {
            Ok(Vec::new())
        }

        async fn ticker_price(&self, _instrument: &InstrumentId) -> adapter_service::Result<Decimal> {
            Ok(dec!(50000))
        }

        async fn instrument_rules(
            &self,
            instrument: &InstrumentId,
        ) -> adapter_service::Result<InstrumentRules> {
            Ok(rules(instrument))
        }

        async fn available_balance(&self, _currency: &str) -> adapter_service::Result<Decimal> {
            Ok(dec!(1000))
        }

        async fn place_order(&self, _order: &OrderRequest) -> adapter_service::Result<OrderAck> {
            Err(AdapterError::Api {
                code: "51008".to_string(),
                message: "Insufficient balance".to_string(),
            })
        }

        async fn cancel_order(&self, _instrument: &InstrumentId, _order_id: &str) -> adapter_service::Result<()> {
            Ok(())
        }

        async fn order_state(
            &self,
            _instrument: &InstrumentId,
            _order_id: &str,
        ) -> adapter_service::Result<OrderState> {
            Err(AdapterError::Internal("unused".to_string()))
        }
    }

    fn btc() -> InstrumentId {
        InstrumentId::new("BTC-USDT").unwrap()
    }

    fn rules(instrument: &InstrumentId) -> InstrumentRules {
        InstrumentRules {
            instrument: instrument.clone(),
            min_size: dec!(0.0001),
            lot_size: dec!(0.0001),
            tick_size: dec!(0.1),
        }
    }

    fn executor(sandbox: bool) -> OrderExecutor {
        OrderExecutor::new(Arc::new(FixedVenue), VenueConfig::default(), sandbox)
    }

    #[test]
    fn test_sandbox_orders_are_offset_limits() {
        let exec = executor(true);
        let buy = exec.build_order(&btc(), Side::Buy, dec!(0.003), dec!(50000), &rules(&btc()));
        assert_eq!(buy.order_type, OrderType::Limit);
        assert_eq!(buy.price, Some(dec!(50250)));

        let sell = exec.build_order(&btc(), Side::Sell, dec!(0.003), dec!(50000.03), &rules(&btc()));
        assert_eq!(sell.price, Some(dec!(49750.0)));
    }

    #[test]
    fn test_live_orders_are_market() {
        let order = executor(false).build_order(&btc(), Side::Buy, dec!(0.003), dec!(50000), &rules(&btc()));
        assert_eq!(order.order_type, OrderType::Market);
        assert_eq!(order.price, None);
    }

    #[test]
    fn test_order_error_from_api_rejection() {
        let error = OrderError::from(&AdapterError::Api {
            code: "51008".to_string(),
            message: "Insufficient balance".to_string(),
        });
        assert_eq!(error, OrderError::new("51008", "Insufficient balance"));
    }

    #[tokio::test]
    async fn test_rejected_buy_changes_nothing() {
        let exec = executor(true);
        let now = Utc::now();
        let mut ledger = PositionLedger::new();
        let mut session = TradingSession::new(true, now);

        let result = exec
            .buy(&btc(), dec!(0.003), Some(4), &mut ledger, &mut session, now)
            .await;

        assert!(!result.success);
        assert_eq!(result.error.unwrap().code, "51008");
        assert!(!ledger.has_position(&btc()));
        assert!(ledger.history().is_empty());
        assert_eq!(session.daily_trades(), 0);
    }

    #[tokio::test]
    async fn test_sell_without_position_is_noop() {
        let exec = executor(true);
        let mut ledger = PositionLedger::new();
        let result = exec
            .sell(&btc(), TradeTrigger::Signal, Some(3), &mut ledger, Utc::now())
            .await;
        assert!(!result.success);
        assert_eq!(result.error.unwrap().code, "no_position");
    }

    #[tokio::test]
    async fn test_size_buy_uses_cached_rules() {
        let exec = executor(true);
        let limits = RiskLimits::default();
        let decision = exec.size_buy(&btc(), &limits).await;
        assert_eq!(decision.size(), dec!(0.0030));
        assert!(exec.rules_cache.read().contains_key(&btc()));
    }
}
