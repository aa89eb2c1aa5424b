//! Exchange-agnostic converter engine.
//!
//! Per-exchange behavior is declared as data ([`spec`]); the engine here
//! does the work: request building ([`rest`]), subscription channels and
//! frame routing ([`ws`]), the shared field-mapping loop ([`mapping`]),
//! and timestamp normalization ([`time`]).

pub mod error;
pub mod mapping;
pub mod rest;
pub mod spec;
pub mod template;
pub mod time;
pub mod ws;

pub use error::{ConfigError, ParseError};
pub use rest::{RestConverter, WireRequest};
pub use spec::{
    ChannelSpec, Compression, EntityKind, ErrorFields, FieldMapping, MappingSpec, RestSpec,
    TimeFormat, TimestampUnit, WsSpec,
};
pub use template::{ChannelParams, ChannelTemplate};
pub use ws::WsConverter;
