use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{Direction, Interval, OrderType};

// ---------------------------------------------------------------------------
// Trade
// ---------------------------------------------------------------------------

/// One executed transaction as reported by an exchange.
///
/// `price` and `amount` are non-negative; `timestamp` is the canonical UTC
/// instant (exchanges reporting milliseconds or truncated time strings are
/// normalized during parsing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Exchange-native trade identifier, kept verbatim.
    pub id: String,
    pub price: Decimal,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    /// Taker side. Not every exchange reports it.
    pub direction: Option<Direction>,
    /// Trading pair, when known (WS streams carry it in the channel name).
    pub symbol: Option<String>,
    pub order_type: Option<OrderType>,
}

// ---------------------------------------------------------------------------
// Candle
// ---------------------------------------------------------------------------

/// One OHLCV bar. `timestamp` is the bar open time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    /// Base-asset volume.
    pub amount: Decimal,
    pub symbol: Option<String>,
    pub interval: Option<Interval>,
}

// ---------------------------------------------------------------------------
// Exchange error
// ---------------------------------------------------------------------------

/// An application-level failure reported by the exchange itself.
///
/// `code` is preserved verbatim (stringified when the wire sends a number).
/// Never mixed with successful entities in one parse result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeError {
    pub code: String,
    pub message: String,
}

impl std::fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "exchange error {}: {}", self.code, self.message)
    }
}

// ---------------------------------------------------------------------------
// MarketItem
// ---------------------------------------------------------------------------

/// Tagged union of every canonical entity a parse can yield.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketItem {
    Trade(Trade),
    Candle(Candle),
}

impl MarketItem {
    pub fn symbol(&self) -> Option<&str> {
        match self {
            MarketItem::Trade(t) => t.symbol.as_deref(),
            MarketItem::Candle(c) => c.symbol.as_deref(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            MarketItem::Trade(t) => t.timestamp,
            MarketItem::Candle(c) => c.timestamp,
        }
    }
}
