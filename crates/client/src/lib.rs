//! REST and WebSocket clients driving the converter engine.

pub mod error;
pub mod rest;
pub mod ws;

pub use error::FeedError;
pub use rest::RestClient;
pub use ws::{decode_frame, decompress, ConnectionStatus, WsClient};
