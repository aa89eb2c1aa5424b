use tickwire_core::ExchangeError;
use tickwire_converter::{ConfigError, ParseError};

/// Failures surfaced to callers of the REST and WS clients.
///
/// `Exchange` is the venue's own application error (code verbatim) and is
/// always distinguishable from `Transport` problems, which the surrounding
/// system may retry.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed payload: {0}")]
    Protocol(String),
    #[error("{0}")]
    Exchange(ExchangeError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<ParseError> for FeedError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Protocol(msg) => FeedError::Protocol(msg),
            ParseError::Api(err) => FeedError::Exchange(err),
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::Transport(err.to_string())
    }
}
