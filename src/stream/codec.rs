//! Frame codec for the price-stream protocol.
//!
//! Decoding is pure and side-effect-free. Unknown extra fields are ignored
//! for forward compatibility; missing required fields for a kind are a
//! [`StreamError::MalformedFrame`], and a `type` tag outside the recognized
//! set is a [`StreamError::UnknownKind`].

use crate::error::StreamError;
use crate::shared::serde_util::parse_instant;
use crate::shared::ProductId;
use crate::stream::{PriceData, ScrapeOutcome, StreamMessage};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

/// Decode one frame payload into a [`StreamMessage`].
pub fn decode(raw: &str) -> Result<StreamMessage, StreamError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| StreamError::MalformedFrame(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| StreamError::MalformedFrame("payload is not an object".into()))?;

    let tag = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| StreamError::MalformedFrame("missing \"type\" tag".into()))?;

    match tag {
        "connected" => Ok(StreamMessage::Connected {
            connection_id: require_str(obj, "connection_id")?.to_string(),
            timestamp: require_instant(obj, "timestamp")?,
        }),
        "price_data" => decode_price_data(obj),
        "keepalive" => Ok(StreamMessage::Keepalive {
            timestamp: require_instant(obj, "timestamp")?,
            next_update_in: require_str(obj, "next_update_in")?.to_string(),
        }),
        other => Err(StreamError::UnknownKind(other.to_string())),
    }
}

/// Serialize a [`StreamMessage`] back to its wire shape.
///
/// `decode(&encode(msg))` round-trips every field relevant to the kind.
pub fn encode(message: &StreamMessage) -> String {
    let value = match message {
        StreamMessage::Connected {
            connection_id,
            timestamp,
        } => json!({
            "type": "connected",
            "connection_id": connection_id,
            "timestamp": timestamp.to_rfc3339(),
        }),
        StreamMessage::PriceData(data) => match &data.outcome {
            ScrapeOutcome::Success {
                price,
                selector_used,
            } => json!({
                "type": "price_data",
                "product_id": data.product_id,
                "price": price,
                "selector_used": selector_used,
                "timestamp": data.timestamp.to_rfc3339(),
                "status": "success",
            }),
            ScrapeOutcome::Failed { error } => json!({
                "type": "price_data",
                "product_id": data.product_id,
                "error": error,
                "timestamp": data.timestamp.to_rfc3339(),
                "status": "error",
            }),
        },
        StreamMessage::Keepalive {
            timestamp,
            next_update_in,
        } => json!({
            "type": "keepalive",
            "timestamp": timestamp.to_rfc3339(),
            "next_update_in": next_update_in,
        }),
    };
    value.to_string()
}

fn decode_price_data(obj: &Map<String, Value>) -> Result<StreamMessage, StreamError> {
    let product_id: ProductId = serde_json::from_value(
        obj.get("product_id")
            .cloned()
            .ok_or_else(|| StreamError::MalformedFrame("price_data missing product_id".into()))?,
    )
    .map_err(|e| StreamError::MalformedFrame(format!("invalid product_id: {}", e)))?;
    let timestamp = require_instant(obj, "timestamp")?;

    let outcome = match require_str(obj, "status")? {
        "success" => {
            if obj.contains_key("error") {
                return Err(StreamError::MalformedFrame(
                    "successful price_data carries an error field".into(),
                ));
            }
            ScrapeOutcome::Success {
                price: require_price(obj)?,
                selector_used: require_str(obj, "selector_used")?.to_string(),
            }
        }
        "error" => ScrapeOutcome::Failed {
            error: require_str(obj, "error")?.to_string(),
        },
        other => {
            return Err(StreamError::MalformedFrame(format!(
                "unsupported price_data status: {:?}",
                other
            )))
        }
    };

    Ok(StreamMessage::PriceData(PriceData {
        product_id,
        timestamp,
        outcome,
    }))
}

// ─── Field extraction ────────────────────────────────────────────────────────

fn require_str<'a>(obj: &'a Map<String, Value>, field: &str) -> Result<&'a str, StreamError> {
    obj.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| StreamError::MalformedFrame(format!("missing or non-string {}", field)))
}

fn require_instant(obj: &Map<String, Value>, field: &str) -> Result<DateTime<Utc>, StreamError> {
    let raw = require_str(obj, field)?;
    parse_instant(raw)
        .ok_or_else(|| StreamError::MalformedFrame(format!("invalid {}: {:?}", field, raw)))
}

/// Prices arrive as JSON numbers; numeric strings are tolerated.
fn require_price(obj: &Map<String, Value>) -> Result<Decimal, StreamError> {
    match obj.get("price") {
        Some(Value::Number(n)) => n
            .as_f64()
            .and_then(|f| Decimal::try_from(f).ok())
            .ok_or_else(|| StreamError::MalformedFrame("price out of range".into())),
        Some(Value::String(s)) => s
            .parse::<Decimal>()
            .map_err(|_| StreamError::MalformedFrame(format!("invalid price: {:?}", s))),
        _ => Err(StreamError::MalformedFrame("price_data missing price".into())),
    }
}
