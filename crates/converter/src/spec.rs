//! Declarative per-exchange specification.
//!
//! Everything that differs between exchanges is expressed as data in these
//! structs: endpoint paths, channel templates, parameter name/value tables,
//! field mappings, timestamp units, compression. The generic engine in
//! [`crate::rest`] and [`crate::ws`] consumes them; adding an exchange means
//! filling in tables, not writing parse code.

use std::collections::HashMap;

use tickwire_core::{Direction, Endpoint, Interval, ParamName, Platform, Sorting};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Field mapping
// ---------------------------------------------------------------------------

/// Which canonical entity an endpoint yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Trade,
    Candle,
}

impl EntityKind {
    pub fn of(endpoint: Endpoint) -> EntityKind {
        match endpoint {
            Endpoint::TradeHistory | Endpoint::Trade => EntityKind::Trade,
            Endpoint::Candle => EntityKind::Candle,
        }
    }
}

/// How wire fields map onto canonical [`ParamName`]s.
///
/// `NameKeyed` indexes a JSON object by wire field name; `PositionKeyed`
/// indexes an ordered scalar row by position (exchanges that stream arrays
/// instead of objects). Rows longer than a position-keyed list are accepted
/// with the extra slots ignored; shorter rows are a protocol error.
#[derive(Debug, Clone)]
pub enum FieldMapping {
    NameKeyed(HashMap<&'static str, ParamName>),
    PositionKeyed(Vec<ParamName>),
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Unit of epoch timestamps on the wire. Declared per endpoint: the same
/// exchange can serve candles in milliseconds and trades in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampUnit {
    Seconds,
    Milliseconds,
}

/// Shape of the timestamp field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    /// Numeric epoch value, converted via [`TimestampUnit`].
    Epoch,
    /// Truncated time-of-day string ("HH:MM:SS"); reconstructed against a
    /// reference instant, best effort. See [`crate::time`].
    TimeOfDay,
}

// ---------------------------------------------------------------------------
// Compression
// ---------------------------------------------------------------------------

/// Per-exchange WS frame encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Identity,
    /// Raw deflate stream without a zlib header.
    RawDeflate,
}

// ---------------------------------------------------------------------------
// Shared mapping spec
// ---------------------------------------------------------------------------

/// Wire field names of the exchange's error payload.
#[derive(Debug, Clone, Copy)]
pub struct ErrorFields {
    pub code: &'static str,
    pub message: &'static str,
}

/// The lookup tables shared by the REST and WS variants of one exchange.
#[derive(Debug, Clone)]
pub struct MappingSpec {
    /// Canonical interval -> platform encoding. An explicit `None` entry
    /// means the exchange does not offer that granularity; request building
    /// fails fast instead of sending a null.
    pub interval_values: HashMap<Interval, Option<&'static str>>,
    pub sorting_values: HashMap<Sorting, &'static str>,
    /// Inbound direction tokens (matched on the stringified scalar, so both
    /// `"bid"` and a bare `true` work).
    pub direction_tokens: HashMap<&'static str, Direction>,
    pub field_mappings: HashMap<EntityKind, FieldMapping>,
    pub error_fields: ErrorFields,
    /// Per-endpoint epoch unit; endpoints not listed use `default_unit`.
    pub timestamp_units: HashMap<Endpoint, TimestampUnit>,
    pub default_unit: TimestampUnit,
    /// Endpoints whose timestamp arrives as a truncated time-of-day string.
    pub time_formats: HashMap<Endpoint, TimeFormat>,
}

impl MappingSpec {
    pub fn unit_for(&self, endpoint: Endpoint) -> TimestampUnit {
        self.timestamp_units
            .get(&endpoint)
            .copied()
            .unwrap_or(self.default_unit)
    }

    pub fn time_format_for(&self, endpoint: Endpoint) -> TimeFormat {
        self.time_formats
            .get(&endpoint)
            .copied()
            .unwrap_or(TimeFormat::Epoch)
    }

    /// Platform encoding of a canonical interval. Fails fast on gaps.
    pub fn interval_value(&self, interval: Interval) -> Result<&'static str, ConfigError> {
        match self.interval_values.get(&interval) {
            Some(Some(v)) => Ok(v),
            Some(None) => Err(ConfigError::UnsupportedValue(format!("{interval:?}"))),
            None => Err(ConfigError::MissingValue(format!("{interval:?}"))),
        }
    }

    /// Reverse lookup: platform interval encoding -> canonical interval.
    pub fn interval_from_value(&self, value: &str) -> Option<Interval> {
        self.interval_values
            .iter()
            .find(|(_, v)| **v == Some(value))
            .map(|(k, _)| *k)
    }

    pub fn field_mapping(&self, kind: EntityKind) -> Result<&FieldMapping, ConfigError> {
        self.field_mappings
            .get(&kind)
            .ok_or_else(|| ConfigError::InvalidSpec(format!("no field mapping for {kind:?}")))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.field_mappings.is_empty() {
            return Err(ConfigError::InvalidSpec(
                "no field mappings declared".into(),
            ));
        }
        for (kind, mapping) in &self.field_mappings {
            let names: Vec<ParamName> = match mapping {
                FieldMapping::NameKeyed(m) => m.values().copied().collect(),
                FieldMapping::PositionKeyed(v) => v.clone(),
            };
            let required: &[ParamName] = match kind {
                EntityKind::Trade => &[ParamName::Timestamp, ParamName::Price, ParamName::Amount],
                EntityKind::Candle => &[
                    ParamName::Timestamp,
                    ParamName::PriceOpen,
                    ParamName::PriceHigh,
                    ParamName::PriceLow,
                    ParamName::PriceClose,
                    ParamName::Amount,
                ],
            };
            for name in required {
                if !names.contains(name) {
                    return Err(ConfigError::InvalidSpec(format!(
                        "{kind:?} mapping is missing {name:?}"
                    )));
                }
            }
        }
        if self.error_fields.code.is_empty() {
            return Err(ConfigError::InvalidSpec("empty error code field".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// REST spec
// ---------------------------------------------------------------------------

/// Everything a REST adapter declares.
#[derive(Debug, Clone)]
pub struct RestSpec {
    pub platform: Platform,
    pub base_url: &'static str,
    /// Endpoint -> URL path relative to `base_url`.
    pub endpoints: HashMap<Endpoint, &'static str>,
    /// Canonical parameter -> platform query-parameter name.
    pub param_names: HashMap<ParamName, &'static str>,
    /// Documented maximum page size per endpoint.
    pub max_limits: HashMap<Endpoint, u32>,
    pub mapping: MappingSpec,
}

impl RestSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::InvalidSpec("no endpoints declared".into()));
        }
        for endpoint in self.endpoints.keys() {
            // Every reachable endpoint must have a mapping for its entity.
            self.mapping.field_mapping(EntityKind::of(*endpoint))?;
        }
        self.mapping.validate()
    }
}

// ---------------------------------------------------------------------------
// WS spec
// ---------------------------------------------------------------------------

/// Per-endpoint subscription channel declaration.
#[derive(Debug, Clone)]
pub struct ChannelSpec {
    /// Channel-name template with `{symbol}` / `{interval}` placeholders.
    pub template: &'static str,
    /// Event value the payload carries when it is not the channel echo
    /// (e.g. Binance's `"e": "kline"`).
    pub event_name: Option<&'static str>,
    /// Per-endpoint nested data field, unwrapped after the global envelope.
    pub data_field: Option<&'static str>,
}

/// Everything a WS adapter declares.
#[derive(Clone)]
pub struct WsSpec {
    pub platform: Platform,
    pub base_url: &'static str,
    /// Wire field carrying the frame's routing key.
    pub event_field: &'static str,
    /// Event values that are protocol-level acknowledgments: parsed to an
    /// empty result, not an entity and not an error.
    pub ack_events: &'static [&'static str],
    /// Global data envelope unwrapped before field mapping, when present.
    pub envelope_field: Option<&'static str>,
    pub channels: HashMap<Endpoint, ChannelSpec>,
    /// Encodes a batch of channel names into one outbound subscribe message.
    pub subscribe_encoder: fn(&[String]) -> serde_json::Value,
    pub compression: Compression,
    pub mapping: MappingSpec,
}

impl WsSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_field.is_empty() {
            return Err(ConfigError::InvalidSpec("empty event field".into()));
        }
        if self.channels.is_empty() {
            return Err(ConfigError::InvalidSpec("no channels declared".into()));
        }
        for endpoint in self.channels.keys() {
            self.mapping.field_mapping(EntityKind::of(*endpoint))?;
        }
        self.mapping.validate()
    }
}

impl std::fmt::Debug for WsSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsSpec")
            .field("platform", &self.platform)
            .field("base_url", &self.base_url)
            .field("event_field", &self.event_field)
            .field("channels", &self.channels)
            .field("compression", &self.compression)
            .finish()
    }
}
