//! OKX candle channel wire format
//!
//! ## Control frames
//!
//! ```json
//! {"event":"subscribe","arg":{"channel":"candle1m","instId":"BTC-USDT"},"connId":"a4d3ae55"}
//! {"event":"error","code":"60012","msg":"Invalid request","connId":"a4d3ae55"}
//! ```
//!
//! Keepalive replies arrive as the literal text `pong`.
//!
//! ## Data frames
//!
//! ```json
//! {"arg":{"channel":"candle1m","instId":"BTC-USDT"},
//!  "data":[["1597026383085","8533.02","8553.74","8527.17","8548.26","45247","529.5858061","529.58","0"]]}
//! ```
//!
//! Row layout: `[ts, open, high, low, close, vol, volCcy, volCcyQuote, confirm]`.
//! Only the first six fields are consumed. REST candle responses use the same
//! rows, newest first.

use crate::{AdapterError, Result};
use serde_json::{json, Value};
use types::{Candle, InstrumentId};

/// Keepalive text frame the venue expects every < 30s
pub const KEEPALIVE_PING: &str = "ping";

/// Decoded websocket frame
#[derive(Debug, Clone, PartialEq)]
pub enum FeedFrame {
    /// Subscription acknowledged
    SubscribeAck { channel: String, inst_id: String },
    /// Venue-reported error
    Error { code: String, message: String },
    /// Keepalive reply
    Pong,
    /// Any other control event (`unsubscribe`, `notice`, ...)
    Event(String),
    /// Candle updates; `malformed` rows were dropped
    Candles { candles: Vec<Candle>, malformed: usize },
    /// Valid JSON that is neither control nor data
    Unrecognized,
}

/// Build the subscription request for one instrument and bar interval
pub fn subscription_message(instrument: &InstrumentId, bar: &str) -> String {
    json!({
        "op": "subscribe",
        "args": [{
            "channel": format!("candle{}", bar),
            "instId": instrument.as_str(),
        }]
    })
    .to_string()
}

/// Classify and decode one text frame.
///
/// Returns an error only when the frame is not JSON at all. Individual bad
/// candle rows are counted in the `malformed` field of
/// [`FeedFrame::Candles`] instead.
pub fn decode_frame(text: &str) -> Result<FeedFrame> {
    let trimmed = text.trim();
    if trimmed == "pong" {
        return Ok(FeedFrame::Pong);
    }

    let value: Value = serde_json::from_str(trimmed)?;

    if let Some(event) = value.get("event").and_then(Value::as_str) {
        return Ok(match event {
            "subscribe" => {
                let arg = value.get("arg");
                FeedFrame::SubscribeAck {
                    channel: string_at(arg, "channel"),
                    inst_id: string_at(arg, "instId"),
                }
            }
            "error" => FeedFrame::Error {
                code: scalar_to_string(value.get("code")),
                message: scalar_to_string(value.get("msg")),
            },
            "pong" => FeedFrame::Pong,
            other => FeedFrame::Event(other.to_string()),
        });
    }

    if let Some(rows) = value.get("data").and_then(Value::as_array) {
        let mut candles = Vec::with_capacity(rows.len());
        let mut malformed = 0;
        for row in rows {
            match parse_candle_row(row) {
                Ok(candle) => candles.push(candle),
                Err(e) => {
                    tracing::debug!("Dropping candle row {}: {}", row, e);
                    malformed += 1;
                }
            }
        }
        return Ok(FeedFrame::Candles { candles, malformed });
    }

    Ok(FeedFrame::Unrecognized)
}

/// Parse one `[ts, o, h, l, c, vol, ...]` row
pub fn parse_candle_row(row: &Value) -> Result<Candle> {
    let fields = row
        .as_array()
        .ok_or_else(|| AdapterError::InvalidMessage("candle row is not an array".to_string()))?;

    if fields.len() < 6 {
        return Err(AdapterError::InvalidMessage(format!(
            "candle row has {} fields, expected at least 6",
            fields.len()
        )));
    }

    let candle = Candle::new(
        timestamp_field(&fields[0])?,
        float_field(&fields[1], "open")?,
        float_field(&fields[2], "high")?,
        float_field(&fields[3], "low")?,
        float_field(&fields[4], "close")?,
        float_field(&fields[5], "volume")?,
    );

    if !candle.is_valid() {
        return Err(AdapterError::InvalidMessage(format!(
            "inconsistent candle at {}",
            candle.timestamp_ms
        )));
    }
    Ok(candle)
}

fn timestamp_field(value: &Value) -> Result<i64> {
    match value {
        Value::String(s) => s
            .parse::<i64>()
            .map_err(|_| AdapterError::InvalidNumeric { value: s.clone() }),
        Value::Number(n) => n.as_i64().ok_or_else(|| AdapterError::InvalidNumeric {
            value: n.to_string(),
        }),
        _ => Err(AdapterError::MissingField {
            field: "ts".to_string(),
        }),
    }
}

fn float_field(value: &Value, name: &str) -> Result<f64> {
    match value {
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| AdapterError::InvalidNumeric { value: s.clone() }),
        Value::Number(n) => n.as_f64().ok_or_else(|| AdapterError::InvalidNumeric {
            value: n.to_string(),
        }),
        _ => Err(AdapterError::MissingField {
            field: name.to_string(),
        }),
    }
}

fn string_at(parent: Option<&Value>, key: &str) -> String {
    parent
        .and_then(|p| p.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn scalar_to_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_message_shape() {
        let instrument = InstrumentId::new("BTC-USDT").unwrap();
        let message: Value = serde_json::from_str(&subscription_message(&instrument, "1m")).unwrap();
        assert_eq!(message["op"], "subscribe");
        assert_eq!(message["args"][0]["channel"], "candle1m");
        assert_eq!(message["args"][0]["instId"], "BTC-USDT");
    }

    #[test]
    fn test_control_frames() {
        let ack = r#"{"event":"subscribe","arg":{"channel":"candle1m","instId":"BTC-USDT"},"connId":"x"}"#;
        assert_eq!(
            decode_frame(ack).unwrap(),
            FeedFrame::SubscribeAck {
                channel: "candle1m".to_string(),
                inst_id: "BTC-USDT".to_string()
            }
        );

        let error = r#"{"event":"error","code":"60012","msg":"Invalid request"}"#;
        assert_eq!(
            decode_frame(error).unwrap(),
            FeedFrame::Error {
                code: "60012".to_string(),
                message: "Invalid request".to_string()
            }
        );

        assert_eq!(decode_frame("pong").unwrap(), FeedFrame::Pong);
        assert_eq!(decode_frame(r#"{"event":"pong"}"#).unwrap(), FeedFrame::Pong);
        assert_eq!(
            decode_frame(r#"{"event":"notice","msg":"reconnect soon"}"#).unwrap(),
            FeedFrame::Event("notice".to_string())
        );
    }

    #[test]
    fn test_data_frame_decodes_candles() {
        let frame = r#"{"arg":{"channel":"candle1m","instId":"BTC-USDT"},
            "data":[["1597026383085","8533.02","8553.74","8527.17","8548.26","45247","529.58","529.58","0"]]}"#;

        match decode_frame(frame).unwrap() {
            FeedFrame::Candles { candles, malformed } => {
                assert_eq!(malformed, 0);
                assert_eq!(candles.len(), 1);
                let candle = candles[0];
                assert_eq!(candle.timestamp_ms, 1_597_026_383_085);
                assert_eq!(candle.open, 8533.02);
                assert_eq!(candle.close, 8548.26);
                assert_eq!(candle.volume, 45247.0);
            }
            other => panic!("expected candles, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_rows_are_counted_not_fatal() {
        let frame = r#"{"data":[
            ["1000","1","2","0.5","1.5","10"],
            ["1001","abc","2","0.5","1.5","10"],
            ["1002","1","2"],
            ["1003","1","0.5","2","1.5","10"]
        ]}"#;

        match decode_frame(frame).unwrap() {
            FeedFrame::Candles { candles, malformed } => {
                assert_eq!(candles.len(), 1);
                assert_eq!(malformed, 3);
            }
            other => panic!("expected candles, got {:?}", other),
        }
    }

    #[test]
    fn test_non_json_is_an_error() {
        assert!(matches!(
            decode_frame("not json"),
            Err(AdapterError::JsonParse(_))
        ));
        assert_eq!(decode_frame(r#"{"hello":1}"#).unwrap(), FeedFrame::Unrecognized);
    }

    #[test]
    fn test_numeric_row_fields_accepted() {
        let row = json!([1000, 1.0, 2.0, 0.5, 1.5, 10]);
        let candle = parse_candle_row(&row).unwrap();
        assert_eq!(candle.timestamp_ms, 1000);
        assert_eq!(candle.high, 2.0);
    }
}
