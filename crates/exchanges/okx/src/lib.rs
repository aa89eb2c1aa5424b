//! OKX adapter: lookup tables and channel templates only. The converter
//! engine does all request building and parsing.
//!
//! Wire quirks absorbed here: REST trades stamp in seconds while REST
//! candles stamp in milliseconds; WS frames arrive raw-deflate compressed;
//! WS trade rows carry a truncated time-of-day string instead of an epoch;
//! the symbol (and kline interval) live only in the channel name.

use std::collections::HashMap;

use serde_json::{json, Value};
use tickwire_converter::{
    ChannelSpec, Compression, EntityKind, ErrorFields, FieldMapping, MappingSpec, RestSpec,
    TimeFormat, TimestampUnit, WsSpec,
};
use tickwire_core::{Direction, Endpoint, Interval, ParamName, Platform, Sorting};

fn interval_values() -> HashMap<Interval, Option<&'static str>> {
    HashMap::from([
        (Interval::Min1, Some("1min")),
        (Interval::Min3, Some("3min")),
        (Interval::Min5, Some("5min")),
        (Interval::Min15, Some("15min")),
        (Interval::Min30, Some("30min")),
        (Interval::Hour1, Some("1hour")),
        (Interval::Hour2, Some("2hour")),
        (Interval::Hour4, Some("4hour")),
        (Interval::Hour6, Some("6hour")),
        (Interval::Hour8, None),
        (Interval::Hour12, Some("12hour")),
        (Interval::Day1, Some("1day")),
        (Interval::Day3, None),
        (Interval::Week1, Some("1week")),
        (Interval::Month1, None),
    ])
}

fn direction_tokens() -> HashMap<&'static str, Direction> {
    HashMap::from([
        ("buy", Direction::Buy),
        ("sell", Direction::Sell),
        ("bid", Direction::Buy),
        ("ask", Direction::Sell),
    ])
}

const ERROR_FIELDS: ErrorFields = ErrorFields {
    code: "error_code",
    message: "error_msg",
};

fn candle_row() -> Vec<ParamName> {
    vec![
        ParamName::Timestamp,
        ParamName::PriceOpen,
        ParamName::PriceHigh,
        ParamName::PriceLow,
        ParamName::PriceClose,
        ParamName::Amount,
    ]
}

/// REST configuration (v1 API).
pub fn rest_spec() -> RestSpec {
    RestSpec {
        platform: Platform::Okx,
        base_url: "https://www.okex.com/api/v1/",
        endpoints: HashMap::from([
            (Endpoint::TradeHistory, "trades.do"),
            (Endpoint::Trade, "trades.do"),
            (Endpoint::Candle, "kline.do"),
        ]),
        param_names: HashMap::from([
            (ParamName::Symbol, "symbol"),
            (ParamName::FromTime, "since"),
            (ParamName::Limit, "size"),
            (ParamName::Interval, "type"),
        ]),
        max_limits: HashMap::from([
            (Endpoint::TradeHistory, 600),
            (Endpoint::Trade, 600),
            (Endpoint::Candle, 600),
        ]),
        mapping: MappingSpec {
            interval_values: interval_values(),
            sorting_values: HashMap::from([(Sorting::Ascending, "asc")]),
            direction_tokens: direction_tokens(),
            field_mappings: HashMap::from([
                (
                    EntityKind::Trade,
                    FieldMapping::NameKeyed(HashMap::from([
                        ("date", ParamName::Timestamp),
                        ("tid", ParamName::ItemId),
                        ("price", ParamName::Price),
                        ("amount", ParamName::Amount),
                        ("type", ParamName::Direction),
                    ])),
                ),
                (EntityKind::Candle, FieldMapping::PositionKeyed(candle_row())),
            ]),
            error_fields: ERROR_FIELDS,
            // Trades stamp in seconds; candles in milliseconds.
            timestamp_units: HashMap::from([(Endpoint::Candle, TimestampUnit::Milliseconds)]),
            default_unit: TimestampUnit::Seconds,
            time_formats: HashMap::new(),
        },
    }
}

fn subscribe_message(channels: &[String]) -> Value {
    // The v1 protocol accepts an array of addChannel commands per message.
    Value::Array(
        channels
            .iter()
            .map(|c| json!({"event": "addChannel", "channel": c}))
            .collect(),
    )
}

/// WS configuration (v1 streaming API).
pub fn ws_spec() -> WsSpec {
    WsSpec {
        platform: Platform::Okx,
        base_url: "wss://real.okex.com:10440/ws/v1/",
        event_field: "channel",
        ack_events: &["addChannel"],
        envelope_field: Some("data"),
        channels: HashMap::from([
            (
                Endpoint::Trade,
                ChannelSpec {
                    template: "ok_sub_spot_{symbol}_deals",
                    event_name: None,
                    data_field: None,
                },
            ),
            (
                Endpoint::Candle,
                ChannelSpec {
                    template: "ok_sub_spot_{symbol}_kline_{interval}",
                    event_name: None,
                    data_field: None,
                },
            ),
        ]),
        subscribe_encoder: subscribe_message,
        compression: Compression::RawDeflate,
        mapping: MappingSpec {
            interval_values: interval_values(),
            sorting_values: HashMap::new(),
            direction_tokens: direction_tokens(),
            field_mappings: HashMap::from([
                (
                    EntityKind::Trade,
                    FieldMapping::PositionKeyed(vec![
                        ParamName::ItemId,
                        ParamName::Price,
                        ParamName::Amount,
                        ParamName::Timestamp,
                        ParamName::Direction,
                    ]),
                ),
                (EntityKind::Candle, FieldMapping::PositionKeyed(candle_row())),
            ]),
            error_fields: ERROR_FIELDS,
            timestamp_units: HashMap::new(),
            default_unit: TimestampUnit::Milliseconds,
            // Deal rows stream "HH:MM:SS" instead of an epoch value.
            time_formats: HashMap::from([(Endpoint::Trade, TimeFormat::TimeOfDay)]),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use tickwire_core::{MarketItem, Params};
    use tickwire_converter::{ConfigError, ParseError, RestConverter, WsConverter};

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn builds_candle_request() {
        let conv = RestConverter::new(rest_spec()).unwrap();
        let params = Params::new().symbol("ltc_btc").interval(Interval::Min1).limit(100);
        let req = conv.build_request(Endpoint::Candle, &params).unwrap();
        assert_eq!(req.url, "https://www.okex.com/api/v1/kline.do");
        assert_eq!(
            req.query,
            vec![
                ("size".to_string(), "100".to_string()),
                ("symbol".to_string(), "ltc_btc".to_string()),
                ("type".to_string(), "1min".to_string()),
            ]
        );
    }

    #[test]
    fn unsupported_interval_fails_before_any_network_call() {
        let conv = RestConverter::new(rest_spec()).unwrap();
        let params = Params::new().symbol("ltc_btc").interval(Interval::Hour8);
        assert!(matches!(
            conv.build_request(Endpoint::Candle, &params),
            Err(ConfigError::UnsupportedValue(_))
        ));
    }

    #[test]
    fn unmapped_parameter_is_a_config_error() {
        let conv = RestConverter::new(rest_spec()).unwrap();
        let params = Params::new().symbol("ltc_btc").to_time(Utc::now());
        assert!(matches!(
            conv.build_request(Endpoint::TradeHistory, &params),
            Err(ConfigError::UnsupportedParam(ParamName::ToTime))
        ));
    }

    #[test]
    fn parses_rest_trades() {
        let conv = RestConverter::new(rest_spec()).unwrap();
        let payload = json!([
            {"date": 1610000000, "tid": 101, "price": "2463.86", "amount": "0.052", "type": "buy"},
            {"date": 1610000001, "tid": 102, "price": "2463.90", "amount": "1.5", "type": "sell"}
        ]);
        let items = conv.parse(Endpoint::TradeHistory, &payload).unwrap();
        assert_eq!(items.len(), 2);
        let MarketItem::Trade(trade) = &items[0] else {
            panic!("expected trade");
        };
        assert_eq!(trade.id, "101");
        assert_eq!(trade.price, dec!(2463.86));
        assert_eq!(trade.direction, Some(Direction::Buy));
        assert_eq!(trade.timestamp.timestamp(), 1_610_000_000);
    }

    #[test]
    fn parses_rest_candles_position_keyed_in_milliseconds() {
        // The kline endpoint stamps in milliseconds even though trades
        // stamp in seconds.
        let conv = RestConverter::new(rest_spec()).unwrap();
        let payload = json!([[1_610_000_000_000_i64, 100.0, 105.0, 95.0, 102.0, 50.0]]);
        let items = conv.parse(Endpoint::Candle, &payload).unwrap();
        assert_eq!(items.len(), 1);
        let MarketItem::Candle(candle) = &items[0] else {
            panic!("expected candle");
        };
        assert_eq!(candle.timestamp.timestamp(), 1_610_000_000);
        assert_eq!(candle.open, dec!(100));
        assert_eq!(candle.high, dec!(105));
        assert_eq!(candle.low, dec!(95));
        assert_eq!(candle.close, dec!(102));
        assert_eq!(candle.amount, dec!(50));
    }

    #[test]
    fn short_candle_row_is_a_protocol_error() {
        let conv = RestConverter::new(rest_spec()).unwrap();
        let payload = json!([[1_610_000_000_000_i64, 100.0, 105.0]]);
        assert!(matches!(
            conv.parse(Endpoint::Candle, &payload),
            Err(ParseError::Protocol(_))
        ));
    }

    #[test]
    fn rest_error_payload_becomes_api_error() {
        let conv = RestConverter::new(rest_spec()).unwrap();
        let payload = json!({"error_code": 10000, "result": false});
        let Err(ParseError::Api(err)) = conv.parse(Endpoint::TradeHistory, &payload) else {
            panic!("expected api error");
        };
        assert_eq!(err.code, "10000");
    }

    #[test]
    fn empty_payload_is_empty_result() {
        let conv = RestConverter::new(rest_spec()).unwrap();
        assert!(conv.parse(Endpoint::TradeHistory, &json!([])).unwrap().is_empty());
        assert!(conv.parse(Endpoint::TradeHistory, &Value::Null).unwrap().is_empty());
    }

    #[test]
    fn builds_subscription_channels() {
        let conv = WsConverter::new(ws_spec()).unwrap();
        assert_eq!(
            conv.build_subscription(Endpoint::Trade, "ltc_btc", &Params::new()).unwrap(),
            "ok_sub_spot_ltc_btc_deals"
        );
        assert_eq!(
            conv.build_subscription(
                Endpoint::Candle,
                "ltc_btc",
                &Params::new().interval(Interval::Min1)
            )
            .unwrap(),
            "ok_sub_spot_ltc_btc_kline_1min"
        );
    }

    #[test]
    fn subscription_with_unsupported_interval_fails_fast() {
        let conv = WsConverter::new(ws_spec()).unwrap();
        assert!(matches!(
            conv.build_subscription(
                Endpoint::Candle,
                "ltc_btc",
                &Params::new().interval(Interval::Day3)
            ),
            Err(ConfigError::UnsupportedValue(_))
        ));
    }

    #[test]
    fn subscribe_message_batches_channels() {
        let conv = WsConverter::new(ws_spec()).unwrap();
        let msg = conv.subscribe_message(&[
            "ok_sub_spot_ltc_btc_deals".to_string(),
            "ok_sub_spot_ltc_btc_kline_1min".to_string(),
        ]);
        assert_eq!(
            msg,
            json!([
                {"event": "addChannel", "channel": "ok_sub_spot_ltc_btc_deals"},
                {"event": "addChannel", "channel": "ok_sub_spot_ltc_btc_kline_1min"}
            ])
        );
    }

    #[test]
    fn ack_frame_yields_empty_result() {
        let conv = WsConverter::new(ws_spec()).unwrap();
        let frame = json!({"channel": "addChannel", "data": {"result": true, "channel": "ok_sub_spot_ltc_btc_deals"}});
        assert!(conv.parse(&frame).unwrap().is_empty());
    }

    #[test]
    fn parses_deal_frame_with_channel_context_and_time_of_day() {
        let conv = WsConverter::new(ws_spec()).unwrap();
        let frame = json!([{
            "channel": "ok_sub_spot_ltc_btc_deals",
            "data": [["1001", "2463.86", "0.052", "12:34:56", "ask"]]
        }]);
        let now = at("2021-01-07T12:40:00Z");
        let items = conv.parse_at(&frame, now).unwrap();
        assert_eq!(items.len(), 1);
        let MarketItem::Trade(trade) = &items[0] else {
            panic!("expected trade");
        };
        assert_eq!(trade.symbol.as_deref(), Some("ltc_btc"));
        assert_eq!(trade.direction, Some(Direction::Sell));
        assert_eq!(trade.price, dec!(2463.86));
        assert_eq!(trade.timestamp, at("2021-01-07T12:34:56Z"));
    }

    #[test]
    fn parses_kline_frame_and_recovers_interval() {
        let conv = WsConverter::new(ws_spec()).unwrap();
        let frame = json!([{
            "channel": "ok_sub_spot_ltc_btc_kline_1min",
            "data": [["1610000000000", "100.0", "105.0", "95.0", "102.0", "50.0"]]
        }]);
        let items = conv.parse(&frame).unwrap();
        assert_eq!(items.len(), 1);
        let MarketItem::Candle(candle) = &items[0] else {
            panic!("expected candle");
        };
        assert_eq!(candle.symbol.as_deref(), Some("ltc_btc"));
        assert_eq!(candle.interval, Some(Interval::Min1));
        assert_eq!(candle.timestamp.timestamp(), 1_610_000_000);
    }

    #[test]
    fn batch_order_is_preserved() {
        let conv = WsConverter::new(ws_spec()).unwrap();
        let frame = json!([{
            "channel": "ok_sub_spot_ltc_btc_deals",
            "data": [
                ["1", "100", "1", "12:00:01", "bid"],
                ["2", "101", "1", "12:00:02", "ask"],
                ["3", "102", "1", "12:00:03", "bid"]
            ]
        }]);
        let items = conv.parse_at(&frame, at("2021-01-07T12:05:00Z")).unwrap();
        let ids: Vec<&str> = items
            .iter()
            .map(|i| match i {
                MarketItem::Trade(t) => t.id.as_str(),
                _ => panic!("expected trades"),
            })
            .collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn ws_error_frame_becomes_api_error() {
        let conv = WsConverter::new(ws_spec()).unwrap();
        let frame = json!({"error_code": "10001", "error_msg": "bad channel"});
        let Err(ParseError::Api(err)) = conv.parse(&frame) else {
            panic!("expected api error");
        };
        assert_eq!(err.code, "10001");
        assert_eq!(err.message, "bad channel");
    }
}
