//! The generic payload -> entity parse loop.
//!
//! One routine consumes both mapping shapes: name-keyed (wire object,
//! field-name table) and position-keyed (wire scalar row, ordered list).
//! All per-call context (endpoint, timestamp unit, reference instant) is
//! threaded through [`ParseCx`]; nothing is stored on the converter between
//! calls.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tickwire_core::{
    Candle, Endpoint, ExchangeError, Interval, MarketItem, OrderType, ParamName, Trade,
};
use tracing::warn;

use crate::error::ParseError;
use crate::spec::{EntityKind, FieldMapping, MappingSpec};

/// Call-scoped parse context.
#[derive(Clone, Copy)]
pub struct ParseCx<'a> {
    pub spec: &'a MappingSpec,
    pub endpoint: Endpoint,
    /// Reference instant for truncated time-of-day reconstruction.
    pub now: DateTime<Utc>,
}

/// Parse a decoded payload into canonical entities.
///
/// An empty or null payload is an empty result, never an error: heartbeat
/// and acknowledgment bodies are normal. An object carrying the exchange's
/// error-code field becomes [`ParseError::Api`], never mixed with entities.
pub fn parse_payload(cx: ParseCx<'_>, payload: &Value) -> Result<Vec<MarketItem>, ParseError> {
    if payload.is_null() {
        return Ok(Vec::new());
    }
    if let Some(err) = extract_error(cx.spec, payload) {
        return Err(ParseError::Api(err));
    }
    let mapping = cx
        .spec
        .field_mapping(EntityKind::of(cx.endpoint))
        .map_err(|e| ParseError::Protocol(e.to_string()))?;

    match payload {
        Value::Array(rows) if rows.is_empty() => Ok(Vec::new()),
        Value::Array(rows) => {
            // A position-keyed payload may be a single row of scalars rather
            // than a list of rows.
            let single_row = matches!(mapping, FieldMapping::PositionKeyed(_))
                && !rows[0].is_array();
            if single_row {
                Ok(vec![parse_item(cx, mapping, payload)?])
            } else {
                rows.iter().map(|row| parse_item(cx, mapping, row)).collect()
            }
        }
        Value::Object(map) if map.is_empty() => Ok(Vec::new()),
        Value::Object(_) => Ok(vec![parse_item(cx, mapping, payload)?]),
        other => Err(ParseError::Protocol(format!(
            "expected object or array payload, got {other}"
        ))),
    }
}

/// An exchange error payload, when the wire object carries the declared
/// error-code field.
pub fn extract_error(spec: &MappingSpec, payload: &Value) -> Option<ExchangeError> {
    let obj = payload.as_object()?;
    let code = obj.get(spec.error_fields.code)?;
    let message = obj
        .get(spec.error_fields.message)
        .map(scalar_string)
        .unwrap_or_default();
    Some(ExchangeError {
        code: scalar_string(code),
        message,
    })
}

fn parse_item(
    cx: ParseCx<'_>,
    mapping: &FieldMapping,
    row: &Value,
) -> Result<MarketItem, ParseError> {
    let field = |name: ParamName| -> Option<&Value> {
        match mapping {
            FieldMapping::NameKeyed(map) => map
                .iter()
                .find(|(_, pname)| **pname == name)
                .and_then(|(wire, _)| row.get(*wire)),
            FieldMapping::PositionKeyed(order) => {
                let pos = order.iter().position(|n| *n == name)?;
                row.get(pos)
            }
        }
    };

    // Arity check up front for position-keyed rows; longer rows are fine
    // (Binance klines carry 12 slots, adapters map the first 6).
    if let FieldMapping::PositionKeyed(order) = mapping {
        let arity = row
            .as_array()
            .ok_or_else(|| {
                ParseError::Protocol(format!("expected array row, got {row}"))
            })?
            .len();
        if arity < order.len() {
            return Err(ParseError::Protocol(format!(
                "row has {arity} fields, mapping needs {}",
                order.len()
            )));
        }
    } else if !row.is_object() {
        return Err(ParseError::Protocol(format!(
            "expected object row, got {row}"
        )));
    }

    let timestamp = {
        let raw = field(ParamName::Timestamp)
            .ok_or_else(|| ParseError::Protocol("missing timestamp field".into()))?;
        crate::time::convert_timestamp(
            raw,
            cx.spec.unit_for(cx.endpoint),
            cx.spec.time_format_for(cx.endpoint),
            cx.now,
        )?
    };
    let symbol = field(ParamName::Symbol).map(scalar_string);

    match EntityKind::of(cx.endpoint) {
        EntityKind::Trade => {
            let direction = field(ParamName::Direction).and_then(|v| {
                let token = scalar_string(v);
                let parsed = cx.spec.direction_tokens.get(token.as_str()).copied();
                if parsed.is_none() {
                    warn!(%token, "unrecognized direction token, dropping field");
                }
                parsed
            });
            Ok(MarketItem::Trade(Trade {
                id: scalar_string(
                    field(ParamName::ItemId)
                        .ok_or_else(|| ParseError::Protocol("missing trade id field".into()))?,
                ),
                price: required_decimal(field(ParamName::Price), "price")?,
                amount: required_decimal(field(ParamName::Amount), "amount")?,
                timestamp,
                direction,
                symbol,
                order_type: field(ParamName::OrderType).and_then(order_type_token),
            }))
        }
        EntityKind::Candle => Ok(MarketItem::Candle(Candle {
            timestamp,
            open: required_decimal(field(ParamName::PriceOpen), "open")?,
            high: required_decimal(field(ParamName::PriceHigh), "high")?,
            low: required_decimal(field(ParamName::PriceLow), "low")?,
            close: required_decimal(field(ParamName::PriceClose), "close")?,
            amount: required_decimal(field(ParamName::Amount), "amount")?,
            symbol,
            interval: field(ParamName::Interval)
                .and_then(|v| cx.spec.interval_from_value(&scalar_string(v))),
        })),
    }
}

fn required_decimal(value: Option<&Value>, what: &str) -> Result<Decimal, ParseError> {
    let value = value.ok_or_else(|| ParseError::Protocol(format!("missing {what} field")))?;
    let parsed = decimal_of(value)
        .ok_or_else(|| ParseError::Protocol(format!("unparseable {what}: {value}")))?;
    if parsed.is_sign_negative() {
        return Err(ParseError::Protocol(format!("negative {what}: {value}")));
    }
    Ok(parsed)
}

/// Decimal from a wire scalar that may be a string or a number. Numbers go
/// through their JSON text so no float round-trip is introduced.
fn decimal_of(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

/// Stringify a wire scalar verbatim (no quotes around strings).
pub fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn order_type_token(value: &Value) -> Option<OrderType> {
    match scalar_string(value).to_ascii_lowercase().as_str() {
        "limit" => Some(OrderType::Limit),
        "market" => Some(OrderType::Market),
        _ => None,
    }
}

/// Attach channel-derived context to every entity in a batch. All entities
/// parsed from one frame share the same symbol/interval; fields the entity
/// does not carry (trade intervals) are a no-op.
pub fn propagate(items: &mut [MarketItem], symbol: Option<&str>, interval: Option<Interval>) {
    for item in items {
        match item {
            MarketItem::Trade(t) => {
                if t.symbol.is_none() {
                    t.symbol = symbol.map(str::to_string);
                }
            }
            MarketItem::Candle(c) => {
                if c.symbol.is_none() {
                    c.symbol = symbol.map(str::to_string);
                }
                if c.interval.is_none() {
                    c.interval = interval;
                }
            }
        }
    }
}
