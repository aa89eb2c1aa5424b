//! One-shot REST fetches: converter builds the request, reqwest performs
//! it, the converter parses the body back into canonical entities.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tickwire_core::{Endpoint, Interval, MarketItem, Params, Sorting};
use tickwire_converter::{ParseError, RestConverter, RestSpec};
use tracing::debug;

use crate::error::FeedError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RestClient {
    converter: RestConverter,
    http: reqwest::Client,
}

impl RestClient {
    pub fn new(spec: RestSpec) -> Result<Self, FeedError> {
        let converter = RestConverter::new(spec)?;
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| FeedError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self { converter, http })
    }

    pub fn converter(&self) -> &RestConverter {
        &self.converter
    }

    /// Fetch one endpoint: build the wire request, perform the call, parse
    /// the body. Exchange-reported failures surface as
    /// [`FeedError::Exchange`]; network and status problems as
    /// [`FeedError::Transport`] / [`FeedError::Status`].
    pub async fn fetch(
        &self,
        endpoint: Endpoint,
        params: &Params,
    ) -> Result<Vec<MarketItem>, FeedError> {
        let request = self.converter.build_request(endpoint, params)?;
        debug!(?endpoint, url = %request.url, "fetching");

        let response = self
            .http
            .get(&request.url)
            .query(&request.query)
            .send()
            .await?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| FeedError::Transport(format!("undecodable body: {e}")))?;

        if !status.is_success() {
            // Non-2xx bodies often still carry the venue's error payload.
            if let Err(ParseError::Api(err)) = self.converter.parse(endpoint, &body) {
                return Err(FeedError::Exchange(err));
            }
            return Err(FeedError::Status {
                status: status.as_u16(),
                body: body.to_string(),
            });
        }

        let items = self.converter.parse(endpoint, &body)?;
        debug!(?endpoint, count = items.len(), "fetched");
        Ok(items)
    }

    /// Fetch executed trades. `from_item` (pagination cursor) and a time
    /// range are mutually exclusive.
    pub async fn fetch_trade_history(
        &self,
        symbol: &str,
        limit: Option<u32>,
        from_item: Option<&str>,
        from_time: Option<DateTime<Utc>>,
        to_time: Option<DateTime<Utc>>,
        sorting: Option<Sorting>,
    ) -> Result<Vec<MarketItem>, FeedError> {
        let endpoint = Endpoint::TradeHistory;
        validate_page_args(symbol, limit, self.max_limit(endpoint), from_item, from_time, to_time)?;

        let mut params = Params::new().symbol(symbol);
        if let Some(limit) = limit {
            params = params.limit(limit);
        }
        if let Some(id) = from_item {
            params = params.from_item(id);
        }
        if let Some(t) = from_time {
            params = params.from_time(t);
        }
        if let Some(t) = to_time {
            params = params.to_time(t);
        }
        if let Some(s) = sorting {
            params = params.sorting(s);
        }
        self.fetch(endpoint, &params).await
    }

    /// Fetch OHLCV bars. With `use_max_limit` and no explicit limit, the
    /// platform's documented maximum page size is requested.
    pub async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        limit: Option<u32>,
        from_time: Option<DateTime<Utc>>,
        to_time: Option<DateTime<Utc>>,
        use_max_limit: bool,
    ) -> Result<Vec<MarketItem>, FeedError> {
        let endpoint = Endpoint::Candle;
        let max = self.max_limit(endpoint);
        validate_page_args(symbol, limit, max, None, from_time, to_time)?;

        let limit = match (limit, use_max_limit) {
            (Some(l), _) => Some(l),
            (None, true) => max,
            (None, false) => None,
        };

        let mut params = Params::new().symbol(symbol).interval(interval);
        if let Some(limit) = limit {
            params = params.limit(limit);
        }
        if let Some(t) = from_time {
            params = params.from_time(t);
        }
        if let Some(t) = to_time {
            params = params.to_time(t);
        }
        self.fetch(endpoint, &params).await
    }

    fn max_limit(&self, endpoint: Endpoint) -> Option<u32> {
        self.converter.spec().max_limits.get(&endpoint).copied()
    }
}

fn validate_page_args(
    symbol: &str,
    limit: Option<u32>,
    max_limit: Option<u32>,
    from_item: Option<&str>,
    from_time: Option<DateTime<Utc>>,
    to_time: Option<DateTime<Utc>>,
) -> Result<(), FeedError> {
    if symbol.trim().is_empty() {
        return Err(FeedError::InvalidArgument("symbol must not be empty".into()));
    }
    if let (Some(limit), Some(max)) = (limit, max_limit) {
        if limit == 0 || limit > max {
            return Err(FeedError::InvalidArgument(format!(
                "limit {limit} outside 1..={max}"
            )));
        }
    }
    if from_item.is_some() && (from_time.is_some() || to_time.is_some()) {
        return Err(FeedError::InvalidArgument(
            "pagination cursor and time range are mutually exclusive".into(),
        ));
    }
    Ok(())
}
