//! Binance adapter: lookup tables and channel templates only.
//!
//! Covers the wire shapes OKX does not: name-keyed WS payloads (objects,
//! not arrays), a per-endpoint nested envelope (`k` on kline events),
//! boolean direction tokens (`isBuyerMaker`), uncompressed frames, and
//! position-keyed rows longer than the mapping (12-slot klines).

use std::collections::HashMap;

use serde_json::{json, Value};
use tickwire_converter::{
    ChannelSpec, Compression, EntityKind, ErrorFields, FieldMapping, MappingSpec, RestSpec,
    TimestampUnit, WsSpec,
};
use tickwire_core::{Direction, Endpoint, Interval, ParamName, Platform, Sorting};

fn interval_values() -> HashMap<Interval, Option<&'static str>> {
    HashMap::from([
        (Interval::Min1, Some("1m")),
        (Interval::Min3, Some("3m")),
        (Interval::Min5, Some("5m")),
        (Interval::Min15, Some("15m")),
        (Interval::Min30, Some("30m")),
        (Interval::Hour1, Some("1h")),
        (Interval::Hour2, Some("2h")),
        (Interval::Hour4, Some("4h")),
        (Interval::Hour6, Some("6h")),
        (Interval::Hour8, Some("8h")),
        (Interval::Hour12, Some("12h")),
        (Interval::Day1, Some("1d")),
        (Interval::Day3, Some("3d")),
        (Interval::Week1, Some("1w")),
        (Interval::Month1, Some("1M")),
    ])
}

/// `isBuyerMaker: true` means the taker sold into a resting bid.
fn direction_tokens() -> HashMap<&'static str, Direction> {
    HashMap::from([
        ("true", Direction::Sell),
        ("false", Direction::Buy),
        ("buy", Direction::Buy),
        ("sell", Direction::Sell),
    ])
}

const ERROR_FIELDS: ErrorFields = ErrorFields {
    code: "code",
    message: "msg",
};

fn candle_row() -> Vec<ParamName> {
    // Klines carry 12 slots; everything past volume is ignored.
    vec![
        ParamName::Timestamp,
        ParamName::PriceOpen,
        ParamName::PriceHigh,
        ParamName::PriceLow,
        ParamName::PriceClose,
        ParamName::Amount,
    ]
}

/// REST configuration (api/v3).
pub fn rest_spec() -> RestSpec {
    RestSpec {
        platform: Platform::Binance,
        base_url: "https://api.binance.com/api/v3/",
        endpoints: HashMap::from([
            (Endpoint::TradeHistory, "trades"),
            (Endpoint::Trade, "trades"),
            (Endpoint::Candle, "klines"),
        ]),
        param_names: HashMap::from([
            (ParamName::Symbol, "symbol"),
            (ParamName::Interval, "interval"),
            (ParamName::Limit, "limit"),
            (ParamName::FromTime, "startTime"),
            (ParamName::ToTime, "endTime"),
            (ParamName::FromItem, "fromId"),
        ]),
        max_limits: HashMap::from([
            (Endpoint::TradeHistory, 1000),
            (Endpoint::Trade, 1000),
            (Endpoint::Candle, 1000),
        ]),
        mapping: MappingSpec {
            interval_values: interval_values(),
            sorting_values: HashMap::from([(Sorting::Ascending, "asc")]),
            direction_tokens: direction_tokens(),
            field_mappings: HashMap::from([
                (
                    EntityKind::Trade,
                    FieldMapping::NameKeyed(HashMap::from([
                        ("id", ParamName::ItemId),
                        ("price", ParamName::Price),
                        ("qty", ParamName::Amount),
                        ("time", ParamName::Timestamp),
                        ("isBuyerMaker", ParamName::Direction),
                    ])),
                ),
                (EntityKind::Candle, FieldMapping::PositionKeyed(candle_row())),
            ]),
            error_fields: ERROR_FIELDS,
            timestamp_units: HashMap::new(),
            default_unit: TimestampUnit::Milliseconds,
            time_formats: HashMap::new(),
        },
    }
}

fn subscribe_message(channels: &[String]) -> Value {
    json!({
        "method": "SUBSCRIBE",
        "params": channels,
        "id": 1,
    })
}

/// WS configuration (stream.binance.com).
pub fn ws_spec() -> WsSpec {
    WsSpec {
        platform: Platform::Binance,
        base_url: "wss://stream.binance.com:9443/ws",
        event_field: "e",
        // Subscribe acks ({"result":null,"id":1}) carry no event field at
        // all and are skipped by the engine without being listed here.
        ack_events: &[],
        envelope_field: None,
        channels: HashMap::from([
            (
                Endpoint::Trade,
                ChannelSpec {
                    template: "{symbol}@trade",
                    event_name: Some("trade"),
                    data_field: None,
                },
            ),
            (
                Endpoint::Candle,
                ChannelSpec {
                    template: "{symbol}@kline_{interval}",
                    event_name: Some("kline"),
                    data_field: Some("k"),
                },
            ),
        ]),
        subscribe_encoder: subscribe_message,
        compression: Compression::Identity,
        mapping: MappingSpec {
            interval_values: interval_values(),
            sorting_values: HashMap::new(),
            direction_tokens: direction_tokens(),
            field_mappings: HashMap::from([
                (
                    EntityKind::Trade,
                    FieldMapping::NameKeyed(HashMap::from([
                        ("t", ParamName::ItemId),
                        ("p", ParamName::Price),
                        ("q", ParamName::Amount),
                        ("T", ParamName::Timestamp),
                        ("m", ParamName::Direction),
                        ("s", ParamName::Symbol),
                    ])),
                ),
                (
                    EntityKind::Candle,
                    FieldMapping::NameKeyed(HashMap::from([
                        ("t", ParamName::Timestamp),
                        ("o", ParamName::PriceOpen),
                        ("h", ParamName::PriceHigh),
                        ("l", ParamName::PriceLow),
                        ("c", ParamName::PriceClose),
                        ("v", ParamName::Amount),
                        ("s", ParamName::Symbol),
                        ("i", ParamName::Interval),
                    ])),
                ),
            ]),
            error_fields: ERROR_FIELDS,
            timestamp_units: HashMap::new(),
            default_unit: TimestampUnit::Milliseconds,
            time_formats: HashMap::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use tickwire_core::{MarketItem, Params};
    use tickwire_converter::{ParseError, RestConverter, WsConverter};

    #[test]
    fn interval_table_round_trips_every_supported_value() {
        let spec = rest_spec();
        for interval in Interval::ALL {
            let Ok(value) = spec.mapping.interval_value(interval) else {
                continue; // declared unsupported
            };
            assert_eq!(spec.mapping.interval_from_value(value), Some(interval));
        }
    }

    #[test]
    fn builds_trade_history_request() {
        let conv = RestConverter::new(rest_spec()).unwrap();
        let params = Params::new().symbol("BTCUSDT").limit(500).from_item("42");
        let req = conv.build_request(Endpoint::TradeHistory, &params).unwrap();
        assert_eq!(req.url, "https://api.binance.com/api/v3/trades");
        assert_eq!(
            req.query,
            vec![
                ("fromId".to_string(), "42".to_string()),
                ("limit".to_string(), "500".to_string()),
                ("symbol".to_string(), "BTCUSDT".to_string()),
            ]
        );
    }

    #[test]
    fn time_range_renders_in_milliseconds() {
        let conv = RestConverter::new(rest_spec()).unwrap();
        let from = chrono::DateTime::from_timestamp(1_610_000_000, 0).unwrap();
        let params = Params::new().symbol("BTCUSDT").interval(Interval::Hour1).from_time(from);
        let req = conv.build_request(Endpoint::Candle, &params).unwrap();
        assert!(req
            .query
            .contains(&("startTime".to_string(), "1610000000000".to_string())));
        assert!(req.query.contains(&("interval".to_string(), "1h".to_string())));
    }

    #[test]
    fn parses_rest_trades_with_boolean_direction() {
        let conv = RestConverter::new(rest_spec()).unwrap();
        let payload = json!([
            {"id": 28457, "price": "4.00000100", "qty": "12.0", "time": 1_610_000_000_000_i64, "isBuyerMaker": true},
            {"id": 28458, "price": "4.00000200", "qty": "1.0", "time": 1_610_000_001_000_i64, "isBuyerMaker": false}
        ]);
        let items = conv.parse(Endpoint::TradeHistory, &payload).unwrap();
        let MarketItem::Trade(first) = &items[0] else {
            panic!("expected trade");
        };
        assert_eq!(first.id, "28457");
        assert_eq!(first.direction, Some(Direction::Sell));
        assert_eq!(first.timestamp.timestamp(), 1_610_000_000);
        let MarketItem::Trade(second) = &items[1] else {
            panic!("expected trade");
        };
        assert_eq!(second.direction, Some(Direction::Buy));
    }

    #[test]
    fn parses_rest_klines_ignoring_extra_slots() {
        let conv = RestConverter::new(rest_spec()).unwrap();
        // Real klines carry 12 slots; only the first six are mapped.
        let payload = json!([[
            1_610_000_000_000_i64,
            "100.0", "105.0", "95.0", "102.0", "50.0",
            1_610_000_059_999_i64, "5100.0", 308, "25.0", "2550.0", "0"
        ]]);
        let items = conv.parse(Endpoint::Candle, &payload).unwrap();
        let MarketItem::Candle(candle) = &items[0] else {
            panic!("expected candle");
        };
        assert_eq!(candle.open, dec!(100.0));
        assert_eq!(candle.amount, dec!(50.0));
    }

    #[test]
    fn rest_error_payload_becomes_api_error() {
        let conv = RestConverter::new(rest_spec()).unwrap();
        let payload = json!({"code": -1121, "msg": "Invalid symbol."});
        let Err(ParseError::Api(err)) = conv.parse(Endpoint::TradeHistory, &payload) else {
            panic!("expected api error");
        };
        assert_eq!(err.code, "-1121");
        assert_eq!(err.message, "Invalid symbol.");
    }

    #[test]
    fn builds_subscription_channels_and_message() {
        let conv = WsConverter::new(ws_spec()).unwrap();
        let trade = conv
            .build_subscription(Endpoint::Trade, "btcusdt", &Params::new())
            .unwrap();
        let kline = conv
            .build_subscription(
                Endpoint::Candle,
                "btcusdt",
                &Params::new().interval(Interval::Min1),
            )
            .unwrap();
        assert_eq!(trade, "btcusdt@trade");
        assert_eq!(kline, "btcusdt@kline_1m");
        assert_eq!(
            conv.subscribe_message(&[trade, kline]),
            json!({
                "method": "SUBSCRIBE",
                "params": ["btcusdt@trade", "btcusdt@kline_1m"],
                "id": 1,
            })
        );
    }

    #[test]
    fn parses_trade_event_name_keyed() {
        let conv = WsConverter::new(ws_spec()).unwrap();
        let frame = json!({
            "e": "trade", "E": 1_610_000_000_123_i64, "s": "BTCUSDT",
            "t": 12345, "p": "0.001", "q": "100", "T": 1_610_000_000_000_i64, "m": true
        });
        let items = conv.parse(&frame).unwrap();
        assert_eq!(items.len(), 1);
        let MarketItem::Trade(trade) = &items[0] else {
            panic!("expected trade");
        };
        assert_eq!(trade.symbol.as_deref(), Some("BTCUSDT"));
        assert_eq!(trade.price, dec!(0.001));
        assert_eq!(trade.direction, Some(Direction::Sell));
    }

    #[test]
    fn parses_kline_event_through_nested_envelope() {
        let conv = WsConverter::new(ws_spec()).unwrap();
        let frame = json!({
            "e": "kline", "E": 1_610_000_030_000_i64, "s": "BTCUSDT",
            "k": {
                "t": 1_610_000_000_000_i64, "s": "BTCUSDT", "i": "1m",
                "o": "100.0", "h": "105.0", "l": "95.0", "c": "102.0", "v": "50.0"
            }
        });
        let items = conv.parse(&frame).unwrap();
        let MarketItem::Candle(candle) = &items[0] else {
            panic!("expected candle");
        };
        assert_eq!(candle.interval, Some(Interval::Min1));
        assert_eq!(candle.symbol.as_deref(), Some("BTCUSDT"));
        assert_eq!(candle.low, dec!(95.0));
    }

    #[test]
    fn subscribe_ack_without_event_field_is_skipped() {
        let conv = WsConverter::new(ws_spec()).unwrap();
        assert!(conv.parse(&json!({"result": null, "id": 1})).unwrap().is_empty());
    }
}
