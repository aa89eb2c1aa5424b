//! Stateless per-request REST translation: canonical parameters out, wire
//! request descriptor back; raw payload in, canonical entities out.

use chrono::Utc;
use serde_json::Value;
use tickwire_core::{Endpoint, MarketItem, ParamValue, Params};
use tracing::debug;

use crate::error::{ConfigError, ParseError};
use crate::mapping::{self, ParseCx};
use crate::spec::{RestSpec, TimestampUnit};

/// Transport-level request descriptor. The HTTP collaborator consumes it;
/// this crate never performs network calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub method: &'static str,
    pub url: String,
    pub query: Vec<(String, String)>,
}

pub struct RestConverter {
    spec: RestSpec,
}

impl RestConverter {
    /// Validates the adapter's tables up front so configuration gaps fail
    /// at construction, not mid-request.
    pub fn new(spec: RestSpec) -> Result<Self, ConfigError> {
        spec.validate()?;
        debug!(platform = ?spec.platform, "REST converter ready");
        Ok(Self { spec })
    }

    pub fn spec(&self) -> &RestSpec {
        &self.spec
    }

    /// Build the outbound request for a canonical endpoint + parameter set.
    /// Every parameter present must have a platform name, and enum values
    /// must have a platform encoding; anything else is a [`ConfigError`].
    pub fn build_request(
        &self,
        endpoint: Endpoint,
        params: &Params,
    ) -> Result<WireRequest, ConfigError> {
        let path = self
            .spec
            .endpoints
            .get(&endpoint)
            .ok_or(ConfigError::UnsupportedEndpoint(endpoint))?;

        let mut query = Vec::new();
        for (name, value) in params.iter() {
            let wire_name = self
                .spec
                .param_names
                .get(name)
                .ok_or(ConfigError::UnsupportedParam(*name))?;
            query.push((wire_name.to_string(), self.render_value(endpoint, value)?));
        }
        // Params iterates a hash map; keep the wire order deterministic.
        query.sort();

        Ok(WireRequest {
            method: "GET",
            url: format!("{}{}", self.spec.base_url, path),
            query,
        })
    }

    /// Parse a decoded REST payload for `endpoint`.
    pub fn parse(&self, endpoint: Endpoint, payload: &Value) -> Result<Vec<MarketItem>, ParseError> {
        mapping::parse_payload(
            ParseCx {
                spec: &self.spec.mapping,
                endpoint,
                now: Utc::now(),
            },
            payload,
        )
    }

    fn render_value(&self, endpoint: Endpoint, value: &ParamValue) -> Result<String, ConfigError> {
        Ok(match value {
            ParamValue::Str(s) => s.clone(),
            ParamValue::Int(i) => i.to_string(),
            ParamValue::Decimal(d) => d.to_string(),
            ParamValue::Time(t) => match self.spec.mapping.unit_for(endpoint) {
                TimestampUnit::Seconds => t.timestamp().to_string(),
                TimestampUnit::Milliseconds => t.timestamp_millis().to_string(),
            },
            ParamValue::Interval(i) => self.spec.mapping.interval_value(*i)?.to_string(),
            ParamValue::Direction(d) => format!("{d:?}").to_ascii_lowercase(),
            ParamValue::Sorting(s) => self
                .spec
                .mapping
                .sorting_values
                .get(s)
                .ok_or_else(|| ConfigError::MissingValue(format!("{s:?}")))?
                .to_string(),
        })
    }
}
