//! Stream-side translation: channel building, event routing, and
//! channel-context recovery for WebSocket frames.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tickwire_core::{Endpoint, MarketItem, ParamName, ParamValue, Params};
use tracing::{debug, trace};

use crate::error::{ConfigError, ParseError};
use crate::mapping::{self, ParseCx};
use crate::spec::{Compression, WsSpec};
use crate::template::{ChannelParams, ChannelTemplate};

pub struct WsConverter {
    spec: WsSpec,
    templates: HashMap<Endpoint, ChannelTemplate>,
}

impl WsConverter {
    pub fn new(spec: WsSpec) -> Result<Self, ConfigError> {
        spec.validate()?;
        let mut templates = HashMap::new();
        for (endpoint, channel) in &spec.channels {
            templates.insert(*endpoint, ChannelTemplate::parse(channel.template)?);
        }
        debug!(platform = ?spec.platform, "WS converter ready");
        Ok(Self { spec, templates })
    }

    pub fn spec(&self) -> &WsSpec {
        &self.spec
    }

    pub fn url(&self) -> &'static str {
        self.spec.base_url
    }

    pub fn compression(&self) -> Compression {
        self.spec.compression
    }

    /// Render the subscription channel for `(endpoint, symbol)`. Interval
    /// values translate through the platform table; a granularity the
    /// exchange does not offer fails here, before anything hits the wire.
    pub fn build_subscription(
        &self,
        endpoint: Endpoint,
        symbol: &str,
        params: &Params,
    ) -> Result<String, ConfigError> {
        let template = self
            .templates
            .get(&endpoint)
            .ok_or(ConfigError::UnsupportedEndpoint(endpoint))?;
        let interval = match params.get(ParamName::Interval) {
            Some(ParamValue::Interval(i)) => Some(self.spec.mapping.interval_value(*i)?),
            Some(other) => {
                return Err(ConfigError::InvalidSpec(format!(
                    "interval parameter holds {other:?}"
                )))
            }
            None => None,
        };
        template.render(symbol, interval)
    }

    /// One outbound subscribe message covering `channels`, in the
    /// exchange's own syntax (batched where the protocol allows it).
    pub fn subscribe_message(&self, channels: &[String]) -> Value {
        (self.spec.subscribe_encoder)(channels)
    }

    /// Parse an inbound frame using the wall clock as the reference instant
    /// for truncated time-of-day reconstruction.
    pub fn parse(&self, frame: &Value) -> Result<Vec<MarketItem>, ParseError> {
        self.parse_at(frame, Utc::now())
    }

    /// Parse an inbound frame against an explicit reference instant.
    ///
    /// Acknowledgment events, frames without the event field, and unknown
    /// events all yield an empty result: absence of data is normal on a
    /// stream. The routing key is read from the spec's event field, matched
    /// first against declared payload event names, then against the channel
    /// templates (recovering the embedded symbol/interval as a side effect).
    pub fn parse_at(
        &self,
        frame: &Value,
        now: DateTime<Utc>,
    ) -> Result<Vec<MarketItem>, ParseError> {
        if frame.is_null() {
            return Ok(Vec::new());
        }
        // Some venues wrap every message in a one-element array.
        if let Value::Array(messages) = frame {
            let mut items = Vec::new();
            for message in messages {
                items.extend(self.parse_at(message, now)?);
            }
            return Ok(items);
        }
        let Some(obj) = frame.as_object() else {
            return Err(ParseError::Protocol(format!(
                "expected object frame, got {frame}"
            )));
        };
        if obj.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(err) = mapping::extract_error(&self.spec.mapping, frame) {
            return Err(ParseError::Api(err));
        }

        let Some(event) = obj.get(self.spec.event_field).and_then(Value::as_str) else {
            // Subscription acks on some venues carry no event field at all.
            trace!("frame without event field, skipping");
            return Ok(Vec::new());
        };
        if self.spec.ack_events.contains(&event) {
            trace!(event, "acknowledgment event");
            return Ok(Vec::new());
        }
        let Some((endpoint, channel_params)) = self.route(event) else {
            debug!(event, "unroutable event, skipping frame");
            return Ok(Vec::new());
        };

        let mut data = frame;
        if let Some(envelope) = self.spec.envelope_field {
            if let Some(inner) = data.get(envelope) {
                data = inner;
            }
        }
        if let Some(field) = self.spec.channels[&endpoint].data_field {
            if let Some(inner) = data.get(field) {
                data = inner;
            }
        }
        if let Some(err) = mapping::extract_error(&self.spec.mapping, data) {
            return Err(ParseError::Api(err));
        }

        let mut items = mapping::parse_payload(
            ParseCx {
                spec: &self.spec.mapping,
                endpoint,
                now,
            },
            data,
        )?;

        // Symbol and interval live in the channel name, not the payload
        // body; tag every entity in the batch with what the template
        // recovered.
        if let Some(params) = channel_params {
            let interval = params
                .interval
                .as_deref()
                .and_then(|v| self.spec.mapping.interval_from_value(v));
            mapping::propagate(&mut items, params.symbol.as_deref(), interval);
        }
        Ok(items)
    }

    /// Resolve an event value to an endpoint: exact payload event names win,
    /// then channel-template matching (which also recovers the placeholder
    /// substrings).
    fn route(&self, event: &str) -> Option<(Endpoint, Option<ChannelParams>)> {
        for (endpoint, channel) in &self.spec.channels {
            if channel.event_name == Some(event) {
                return Some((*endpoint, None));
            }
        }
        for (endpoint, template) in &self.templates {
            if let Some(params) = template.extract(event) {
                return Some((*endpoint, Some(params)));
            }
        }
        None
    }
}
