use tickwire_core::{Endpoint, ExchangeError, ParamName};

/// A gap in an adapter's declarative configuration. Fatal: raised at
/// converter construction or on first use of the missing mapping, never
/// silently ignored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("endpoint {0:?} is not supported by this platform")]
    UnsupportedEndpoint(Endpoint),
    #[error("parameter {0:?} has no platform name on this platform")]
    UnsupportedParam(ParamName),
    #[error("{0} is declared unsupported by this platform")]
    UnsupportedValue(String),
    #[error("no platform value declared for {0}")]
    MissingValue(String),
    #[error("invalid converter spec: {0}")]
    InvalidSpec(String),
}

/// Inbound payload failures. `Protocol` is a malformed payload (the venue
/// may legitimately vary its schema over time, so callers treat it as data,
/// not a panic); `Api` is the exchange's own error response, code and
/// message preserved verbatim.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("malformed payload: {0}")]
    Protocol(String),
    #[error("{0}")]
    Api(ExchangeError),
}
