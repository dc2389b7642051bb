//! OKX v5 REST client
//!
//! Every response is wrapped in `{"code": "0", "msg": "", "data": [...]}`;
//! a non-zero code is surfaced as [`AdapterError::Api`]. Private endpoints
//! carry `OK-ACCESS-*` headers signed per [`super::signing`], and sandbox
//! requests add `x-simulated-trading: 1`.

use super::{
    signing, ExchangeClient, InstrumentRules, OrderAck, OrderRequest, OrderState, OrderStatus,
};
use crate::input::collectors::okx::frames::parse_candle_row;
use crate::{AdapterError, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, StatusCode};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use signal_config::defaults::okx::MAX_CANDLES_PER_REQUEST;
use signal_config::{Credentials, VenueConfig};
use std::str::FromStr;
use tracing::{debug, warn};
use types::{Candle, InstrumentId};

const RATE_LIMIT_CODE: &str = "50011";
const AUTH_ERROR_CODES: [&str; 4] = ["50100", "50111", "50113", "50114"];

/// Signed client for the OKX v5 REST API
#[derive(Clone)]
pub struct OkxRestClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
    simulated: bool,
}

impl std::fmt::Debug for OkxRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OkxRestClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("simulated", &self.simulated)
            .finish()
    }
}

impl OkxRestClient {
    pub fn new(venue: &VenueConfig, credentials: Credentials, simulated: bool) -> Result<Self> {
        url::Url::parse(&venue.rest_url).map_err(|e| {
            AdapterError::Configuration(format!("invalid REST URL {}: {}", venue.rest_url, e))
        })?;

        let http = Client::builder().timeout(venue.request_timeout()).build()?;

        Ok(Self {
            http,
            base_url: venue.rest_url.trim_end_matches('/').to_string(),
            credentials,
            simulated,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    async fn get(&self, path: &str, query: &[(&str, &str)], signed: bool) -> Result<Vec<Value>> {
        let envelope = self.send(Method::GET, path, query, None, signed).await?;
        unwrap_envelope(envelope)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.send(Method::POST, path, &[], Some(body), true).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
        signed: bool,
    ) -> Result<Value> {
        let request_path = request_path(path, query);
        let body = body.map(Value::to_string).unwrap_or_default();
        let url = format!("{}{}", self.base_url, request_path);

        let mut request = self.http.request(method.clone(), &url);
        if self.simulated {
            request = request.header("x-simulated-trading", "1");
        }

        if signed {
            if !self.credentials.is_complete() {
                return Err(AdapterError::AuthenticationFailed {
                    reason: "API key, secret and passphrase are required".to_string(),
                });
            }
            let timestamp = signing::timestamp(Utc::now());
            let signature = signing::sign(
                &self.credentials.secret_key,
                &timestamp,
                method.as_str(),
                &request_path,
                &body,
            )?;
            request = request
                .header("OK-ACCESS-KEY", &self.credentials.api_key)
                .header("OK-ACCESS-SIGN", signature)
                .header("OK-ACCESS-TIMESTAMP", timestamp)
                .header("OK-ACCESS-PASSPHRASE", &self.credentials.passphrase);
        }

        if method == Method::POST {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        debug!("{} {}", method, request_path);
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AdapterError::RateLimitExceeded(format!("{} {}", method, path)));
        }

        serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                AdapterError::JsonParse(e)
            } else {
                AdapterError::Api {
                    code: status.as_u16().to_string(),
                    message: text.chars().take(200).collect(),
                }
            }
        })
    }
}

#[async_trait]
impl ExchangeClient for OkxRestClient {
    async fn historical_candles(
        &self,
        instrument: &InstrumentId,
        bar: &str,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let limit = limit.clamp(1, MAX_CANDLES_PER_REQUEST).to_string();
        let rows = self
            .get(
                "/api/v5/market/candles",
                &[("instId", instrument.as_str()), ("bar", bar), ("limit", limit.as_str())],
                false,
            )
            .await?;
        Ok(parse_candles(&rows))
    }

    async fn ticker_price(&self, instrument: &InstrumentId) -> Result<Decimal> {
        let data = self
            .get("/api/v5/market/ticker", &[("instId", instrument.as_str())], false)
            .await?;
        decimal_field(first(&data)?, "last")
    }

    async fn instrument_rules(&self, instrument: &InstrumentId) -> Result<InstrumentRules> {
        let data = self
            .get(
                "/api/v5/public/instruments",
                &[("instType", "SPOT"), ("instId", instrument.as_str())],
                false,
            )
            .await?;
        parse_instrument_rules(instrument, first(&data)?)
    }

    async fn available_balance(&self, currency: &str) -> Result<Decimal> {
        let data = self
            .get("/api/v5/account/balance", &[("ccy", currency)], true)
            .await?;
        parse_available_balance(&data, currency)
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck> {
        let envelope = self.post("/api/v5/trade/order", &order.to_payload()).await?;
        parse_order_ack(envelope)
    }

    async fn cancel_order(&self, instrument: &InstrumentId, order_id: &str) -> Result<()> {
        let body = json!({ "instId": instrument.as_str(), "ordId": order_id });
        let envelope = self.post("/api/v5/trade/cancel-order", &body).await?;
        parse_order_ack(envelope).map(|_| ())
    }

    async fn order_state(&self, instrument: &InstrumentId, order_id: &str) -> Result<OrderState> {
        let data = self
            .get(
                "/api/v5/trade/order",
                &[("instId", instrument.as_str()), ("ordId", order_id)],
                true,
            )
            .await?;
        parse_order_state(first(&data)?)
    }
}

/// Path plus encoded query, exactly as signed
fn request_path(path: &str, query: &[(&str, &str)]) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query)
        .finish();
    format!("{}?{}", path, encoded)
}

fn unwrap_envelope(envelope: Value) -> Result<Vec<Value>> {
    let code = scalar(envelope.get("code"));
    if code != "0" {
        return Err(api_error(code, scalar(envelope.get("msg"))));
    }
    match envelope.get("data") {
        Some(Value::Array(rows)) => Ok(rows.clone()),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(other) => Err(AdapterError::InvalidMessage(format!(
            "data is not an array: {}",
            other
        ))),
    }
}

fn api_error(code: String, message: String) -> AdapterError {
    if code == RATE_LIMIT_CODE {
        AdapterError::RateLimitExceeded(message)
    } else if AUTH_ERROR_CODES.contains(&code.as_str()) {
        AdapterError::AuthenticationFailed {
            reason: format!("{}: {}", code, message),
        }
    } else {
        AdapterError::Api { code, message }
    }
}

fn first(data: &[Value]) -> Result<&Value> {
    data.first()
        .ok_or_else(|| AdapterError::InvalidMessage("empty data array".to_string()))
}

fn parse_candles(rows: &[Value]) -> Vec<Candle> {
    let mut candles: Vec<Candle> = rows
        .iter()
        .filter_map(|row| match parse_candle_row(row) {
            Ok(candle) => Some(candle),
            Err(e) => {
                warn!("Skipping historical candle {}: {}", row, e);
                None
            }
        })
        .collect();
    candles.sort_by_key(|c| c.timestamp_ms);
    candles
}

fn parse_instrument_rules(instrument: &InstrumentId, row: &Value) -> Result<InstrumentRules> {
    let rules = InstrumentRules {
        instrument: instrument.clone(),
        min_size: decimal_field(row, "minSz")?,
        lot_size: decimal_field(row, "lotSz")?,
        tick_size: decimal_field(row, "tickSz")?,
    };
    if rules.lot_size <= Decimal::ZERO || rules.tick_size <= Decimal::ZERO {
        return Err(AdapterError::InvalidMessage(format!(
            "non-positive increments for {}",
            instrument
        )));
    }
    Ok(rules)
}

fn parse_available_balance(data: &[Value], currency: &str) -> Result<Decimal> {
    let details = data
        .first()
        .and_then(|account| account.get("details"))
        .and_then(Value::as_array);

    let Some(details) = details else {
        return Ok(Decimal::ZERO);
    };

    details
        .iter()
        .find(|d| d.get("ccy").and_then(Value::as_str) == Some(currency))
        .map(|d| decimal_field(d, "availBal"))
        .unwrap_or(Ok(Decimal::ZERO))
}

/// Order endpoints report per-order `sCode`/`sMsg` even when the envelope
/// code is non-zero; prefer those.
fn parse_order_ack(envelope: Value) -> Result<OrderAck> {
    let row = envelope
        .get("data")
        .and_then(Value::as_array)
        .and_then(|rows| rows.first());

    if let Some(row) = row {
        let s_code = scalar(row.get("sCode"));
        if !s_code.is_empty() && s_code != "0" {
            return Err(api_error(s_code, scalar(row.get("sMsg"))));
        }
    }

    let code = scalar(envelope.get("code"));
    if code != "0" {
        return Err(api_error(code, scalar(envelope.get("msg"))));
    }

    let row = row.ok_or_else(|| AdapterError::InvalidMessage("empty order response".into()))?;
    let order_id = scalar(row.get("ordId"));
    if order_id.is_empty() {
        return Err(AdapterError::MissingField {
            field: "ordId".to_string(),
        });
    }
    let client_order_id = Some(scalar(row.get("clOrdId"))).filter(|id| !id.is_empty());

    Ok(OrderAck {
        order_id,
        client_order_id,
    })
}

fn parse_order_state(row: &Value) -> Result<OrderState> {
    let average_price = match row.get("avgPx").and_then(Value::as_str) {
        Some("") | None => None,
        Some(_) => Some(decimal_field(row, "avgPx")?),
    };
    let filled_size = match row.get("accFillSz").and_then(Value::as_str) {
        Some("") | None => Decimal::ZERO,
        Some(_) => decimal_field(row, "accFillSz")?,
    };

    Ok(OrderState {
        order_id: scalar(row.get("ordId")),
        status: OrderStatus::from_venue(&scalar(row.get("state"))),
        filled_size,
        average_price,
    })
}

fn decimal_field(row: &Value, field: &str) -> Result<Decimal> {
    let raw = match row.get(field) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            return Err(AdapterError::MissingField {
                field: field.to_string(),
            })
        }
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| AdapterError::InvalidNumeric { value: raw })
}

fn scalar(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn btc() -> InstrumentId {
        InstrumentId::new("BTC-USDT").unwrap()
    }

    #[test]
    fn test_request_path_encodes_query() {
        assert_eq!(request_path("/api/v5/market/ticker", &[]), "/api/v5/market/ticker");
        assert_eq!(
            request_path("/api/v5/account/balance", &[("ccy", "BTC")]),
            "/api/v5/account/balance?ccy=BTC"
        );
        assert_eq!(
            request_path("/x", &[("instId", "BTC-USDT"), ("bar", "1H")]),
            "/x?instId=BTC-USDT&bar=1H"
        );
    }

    #[test]
    fn test_envelope_error_codes() {
        let err = unwrap_envelope(json!({"code": "51000", "msg": "Parameter error", "data": []}))
            .unwrap_err();
        assert!(matches!(err, AdapterError::Api { ref code, .. } if code == "51000"));

        let err = unwrap_envelope(json!({"code": "50011", "msg": "Too Many Requests"})).unwrap_err();
        assert!(matches!(err, AdapterError::RateLimitExceeded(_)));

        let err = unwrap_envelope(json!({"code": "50113", "msg": "Invalid Sign"})).unwrap_err();
        assert!(matches!(err, AdapterError::AuthenticationFailed { .. }));
    }

    #[test]
    fn test_historical_rows_sorted_oldest_first() {
        let rows = vec![
            json!(["3000", "3", "3", "3", "3", "1", "0", "0", "1"]),
            json!(["bad"]),
            json!(["1000", "1", "1", "1", "1", "1", "0", "0", "1"]),
            json!(["2000", "2", "2", "2", "2", "1", "0", "0", "1"]),
        ];
        let candles = parse_candles(&rows);
        let stamps: Vec<i64> = candles.iter().map(|c| c.timestamp_ms).collect();
        assert_eq!(stamps, vec![1000, 2000, 3000]);
    }

    #[test]
    fn test_instrument_rules() {
        let row = json!({"instId": "BTC-USDT", "minSz": "0.00001", "lotSz": "0.00000001", "tickSz": "0.1"});
        let rules = parse_instrument_rules(&btc(), &row).unwrap();
        assert_eq!(rules.min_size, dec!(0.00001));
        assert_eq!(rules.lot_size, dec!(0.00000001));
        assert_eq!(rules.tick_size, dec!(0.1));

        let missing = json!({"minSz": "0.00001", "tickSz": "0.1"});
        assert!(matches!(
            parse_instrument_rules(&btc(), &missing),
            Err(AdapterError::MissingField { .. })
        ));
    }

    #[test]
    fn test_balance_missing_currency_is_zero() {
        let data = vec![json!({"details": [{"ccy": "USDT", "availBal": "1234.5"}]})];
        assert_eq!(parse_available_balance(&data, "USDT").unwrap(), dec!(1234.5));
        assert_eq!(parse_available_balance(&data, "BTC").unwrap(), Decimal::ZERO);
        assert_eq!(parse_available_balance(&[], "BTC").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_order_ack_prefers_per_order_code() {
        let rejected = json!({
            "code": "1",
            "msg": "Operation failed.",
            "data": [{"ordId": "", "sCode": "51008", "sMsg": "Insufficient balance"}]
        });
        match parse_order_ack(rejected) {
            Err(AdapterError::Api { code, message }) => {
                assert_eq!(code, "51008");
                assert_eq!(message, "Insufficient balance");
            }
            other => panic!("expected api error, got {:?}", other),
        }

        let accepted = json!({
            "code": "0",
            "msg": "",
            "data": [{"ordId": "312269865356374016", "clOrdId": "", "sCode": "0", "sMsg": ""}]
        });
        let ack = parse_order_ack(accepted).unwrap();
        assert_eq!(ack.order_id, "312269865356374016");
        assert_eq!(ack.client_order_id, None);
    }

    #[test]
    fn test_order_state_with_empty_fill_fields() {
        let live = json!({"ordId": "1", "state": "live", "accFillSz": "", "avgPx": ""});
        let state = parse_order_state(&live).unwrap();
        assert_eq!(state.status, OrderStatus::Live);
        assert_eq!(state.filled_size, Decimal::ZERO);
        assert_eq!(state.average_price, None);

        let filled = json!({"ordId": "1", "state": "filled", "accFillSz": "0.003", "avgPx": "50010.5"});
        let state = parse_order_state(&filled).unwrap();
        assert_eq!(state.status, OrderStatus::Filled);
        assert_eq!(state.filled_size, dec!(0.003));
        assert_eq!(state.average_price, Some(dec!(50010.5)));
    }

    #[test]
    fn test_signed_call_without_credentials_fails_fast() {
        let client =
            OkxRestClient::new(&VenueConfig::default(), Credentials::default(), true).unwrap();
        let result = tokio_test::block_on(client.available_balance("USDT"));
        assert!(matches!(
            result,
            Err(AdapterError::AuthenticationFailed { .. })
        ));
    }
}
