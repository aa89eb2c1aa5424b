//! Channel-name templates.
//!
//! WS subscription channels embed the symbol (and sometimes the interval)
//! inside an otherwise opaque string, e.g. `ok_sub_spot_{symbol}_kline_{interval}`.
//! A [`ChannelTemplate`] renders such a template outbound and, on the way
//! back in, reverse-extracts the placeholder substrings from an
//! instantiated channel name so parsed entities can be tagged with the
//! symbol/interval they belong to.

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Symbol,
    Interval,
}

/// Values recovered from an instantiated channel name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelParams {
    pub symbol: Option<String>,
    pub interval: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChannelTemplate {
    tokens: Vec<Token>,
}

impl ChannelTemplate {
    /// Parse a template string. Placeholders other than `{symbol}` and
    /// `{interval}`, or two placeholders with no literal between them
    /// (which would make extraction ambiguous), are configuration errors.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut tokens = Vec::new();
        let mut rest = raw;
        while let Some(open) = rest.find('{') {
            let close = rest[open..].find('}').ok_or_else(|| {
                ConfigError::InvalidSpec(format!("unclosed placeholder in {raw:?}"))
            })? + open;
            if open > 0 {
                tokens.push(Token::Literal(rest[..open].to_string()));
            }
            match &rest[open + 1..close] {
                "symbol" => tokens.push(Token::Symbol),
                "interval" => tokens.push(Token::Interval),
                other => {
                    return Err(ConfigError::InvalidSpec(format!(
                        "unknown placeholder {{{other}}} in {raw:?}"
                    )))
                }
            }
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            tokens.push(Token::Literal(rest.to_string()));
        }
        for pair in tokens.windows(2) {
            if !matches!(pair[0], Token::Literal(_)) && !matches!(pair[1], Token::Literal(_)) {
                return Err(ConfigError::InvalidSpec(format!(
                    "adjacent placeholders in {raw:?}"
                )));
            }
        }
        Ok(Self { tokens })
    }

    pub fn has_interval(&self) -> bool {
        self.tokens.contains(&Token::Interval)
    }

    /// Instantiate the template. `interval` is required only when the
    /// template carries an `{interval}` placeholder.
    pub fn render(&self, symbol: &str, interval: Option<&str>) -> Result<String, ConfigError> {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(lit) => out.push_str(lit),
                Token::Symbol => out.push_str(symbol),
                Token::Interval => out.push_str(interval.ok_or_else(|| {
                    ConfigError::MissingValue("interval for channel template".into())
                })?),
            }
        }
        Ok(out)
    }

    /// Recover placeholder substrings from an instantiated channel name.
    /// Returns `None` when the channel does not match this template.
    ///
    /// Literal separators are located left-to-right with `find`, so a
    /// symbol containing a separator as a substring would mis-split; no
    /// supported exchange names channels that way.
    pub fn extract(&self, channel: &str) -> Option<ChannelParams> {
        let mut params = ChannelParams::default();
        let mut rest = channel;
        let mut iter = self.tokens.iter().peekable();
        while let Some(token) = iter.next() {
            match token {
                Token::Literal(lit) => {
                    rest = rest.strip_prefix(lit.as_str())?;
                }
                placeholder => {
                    let captured = match iter.peek() {
                        Some(Token::Literal(lit)) => {
                            let at = rest.find(lit.as_str())?;
                            let (head, tail) = rest.split_at(at);
                            rest = tail;
                            head
                        }
                        // Placeholder is the final token: it takes the rest.
                        None => std::mem::take(&mut rest),
                        Some(_) => unreachable!("adjacent placeholders rejected at parse"),
                    };
                    if captured.is_empty() {
                        return None;
                    }
                    match placeholder {
                        Token::Symbol => params.symbol = Some(captured.to_string()),
                        Token::Interval => params.interval = Some(captured.to_string()),
                        Token::Literal(_) => unreachable!(),
                    }
                }
            }
        }
        if rest.is_empty() {
            Some(params)
        } else {
            None
        }
    }
}
