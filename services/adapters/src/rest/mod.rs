//! REST collaborators: market data bootstrap, instrument rules, balances and
//! order lifecycle
//!
//! The decision loop only sees [`ExchangeClient`]; [`OkxRestClient`] is the
//! production implementation and tests substitute scripted fakes.

pub mod okx;
pub mod signing;

use crate::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use types::{format_decimal, Candle, InstrumentId, Side};

pub use okx::OkxRestClient;

/// Venue operations the strategy depends on
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Up to `limit` most recent candles, oldest first
    async fn historical_candles(
        &self,
        instrument: &InstrumentId,
        bar: &str,
        limit: usize,
    ) -> Result<Vec<Candle>>;

    /// Last traded price
    async fn ticker_price(&self, instrument: &InstrumentId) -> Result<Decimal>;

    /// Size and price increments for an instrument
    async fn instrument_rules(&self, instrument: &InstrumentId) -> Result<InstrumentRules>;

    /// Available balance of one currency; zero when the account holds none
    async fn available_balance(&self, currency: &str) -> Result<Decimal>;

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck>;

    async fn cancel_order(&self, instrument: &InstrumentId, order_id: &str) -> Result<()>;

    async fn order_state(&self, instrument: &InstrumentId, order_id: &str) -> Result<OrderState>;
}

/// Exchange-published size and price constraints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentRules {
    pub instrument: InstrumentId,
    /// Smallest order size in base units
    pub min_size: Decimal,
    /// Order sizes must be a multiple of this
    pub lot_size: Decimal,
    /// Limit prices must be a multiple of this
    pub tick_size: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
        }
    }
}

/// Spot order as submitted to the venue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub instrument: InstrumentId,
    /// Venue trade mode, `cash` for spot
    pub trade_mode: String,
    pub side: Side,
    pub order_type: OrderType,
    /// Base-currency quantity
    pub size: Decimal,
    /// Limit price; ignored for market orders
    pub price: Option<Decimal>,
}

impl OrderRequest {
    pub fn market(instrument: InstrumentId, trade_mode: &str, side: Side, size: Decimal) -> Self {
        Self {
            instrument,
            trade_mode: trade_mode.to_string(),
            side,
            order_type: OrderType::Market,
            size,
            price: None,
        }
    }

    pub fn limit(
        instrument: InstrumentId,
        trade_mode: &str,
        side: Side,
        size: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            instrument,
            trade_mode: trade_mode.to_string(),
            side,
            order_type: OrderType::Limit,
            size,
            price: Some(price),
        }
    }

    /// JSON body for `POST /api/v5/trade/order`
    pub fn to_payload(&self) -> Value {
        let mut payload = json!({
            "instId": self.instrument.as_str(),
            "tdMode": self.trade_mode,
            "side": self.side.as_str(),
            "ordType": self.order_type.as_str(),
            "sz": format_decimal(self.size),
        });
        if let (OrderType::Limit, Some(price)) = (self.order_type, self.price) {
            payload["px"] = Value::String(format_decimal(price));
        }
        payload
    }
}

/// Venue acknowledgement of an accepted order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    pub order_id: String,
    pub client_order_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    Live,
    PartiallyFilled,
    Filled,
    Canceled,
    Other(String),
}

impl OrderStatus {
    pub fn from_venue(state: &str) -> Self {
        match state {
            "live" => OrderStatus::Live,
            "partially_filled" => OrderStatus::PartiallyFilled,
            "filled" => OrderStatus::Filled,
            "canceled" | "mmp_canceled" => OrderStatus::Canceled,
            other => OrderStatus::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Canceled)
    }
}

/// Fill progress of one order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderState {
    pub order_id: String,
    pub status: OrderStatus,
    pub filled_size: Decimal,
    pub average_price: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn btc() -> InstrumentId {
        InstrumentId::new("BTC-USDT").unwrap()
    }

    #[test]
    fn test_market_payload_has_no_price() {
        let order = OrderRequest::market(btc(), "cash", Side::Sell, dec!(0.00300));
        let payload = order.to_payload();
        assert_eq!(payload["instId"], "BTC-USDT");
        assert_eq!(payload["tdMode"], "cash");
        assert_eq!(payload["side"], "sell");
        assert_eq!(payload["ordType"], "market");
        assert_eq!(payload["sz"], "0.003");
        assert!(payload.get("px").is_none());
    }

    #[test]
    fn test_limit_payload_carries_price() {
        let order = OrderRequest::limit(btc(), "cash", Side::Buy, dec!(0.003), dec!(50250.0));
        let payload = order.to_payload();
        assert_eq!(payload["ordType"], "limit");
        assert_eq!(payload["px"], "50250");
    }

    #[test]
    fn test_order_status_mapping() {
        assert_eq!(OrderStatus::from_venue("filled"), OrderStatus::Filled);
        assert!(OrderStatus::from_venue("mmp_canceled").is_terminal());
        assert!(!OrderStatus::from_venue("partially_filled").is_terminal());
        assert_eq!(
            OrderStatus::from_venue("weird"),
            OrderStatus::Other("weird".to_string())
        );
    }
}
