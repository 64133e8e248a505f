//! Data source traits and the historical fetch contract.

use std::future::Future;

use charter_core::{aggregate_candles, Candle, Timeframe};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Trait for types that can load a complete candle history synchronously.
///
/// This trait uses `anyhow::Result` for flexible error handling.
pub trait DataSource {
    fn load(&self) -> anyhow::Result<Vec<Candle>>;
}

/// A historical range request.
///
/// `from` is inclusive, `to` exclusive. With neither set the request means
/// "the most recent `limit` candles".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub limit: usize,
}

impl FetchRequest {
    /// The most recent `limit` candles.
    pub fn latest(symbol: impl Into<String>, timeframe: Timeframe, limit: usize) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            from: None,
            to: None,
            limit,
        }
    }

    /// Up to `limit` candles strictly before `to`.
    pub fn before(symbol: impl Into<String>, timeframe: Timeframe, to: i64, limit: usize) -> Self {
        Self {
            to: Some(to),
            ..Self::latest(symbol, timeframe, limit)
        }
    }

    pub fn with_from(mut self, from: i64) -> Self {
        self.from = Some(from);
        self
    }

    /// Whether `timestamp` falls inside the requested range.
    pub fn contains(&self, timestamp: i64) -> bool {
        self.from.map_or(true, |from| timestamp >= from) && self.to.map_or(true, |to| timestamp < to)
    }
}

/// One page of history, oldest first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub candles: Vec<Candle>,
    #[serde(default)]
    pub has_more: bool,
}

impl HistoryPage {
    pub fn new(candles: Vec<Candle>, has_more: bool) -> Self {
        Self { candles, has_more }
    }

    /// Decode the `{"candles": [...], "hasMore": bool}` wire shape.
    pub fn from_json(body: &str) -> Result<Self, FetchError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Slice an ordered history down to a request: range filter, then the newest
    /// `limit` entries. `has_more` reports whether older candles were left out.
    pub fn slice(history: &[Candle], request: &FetchRequest) -> Self {
        let in_range: Vec<&Candle> = history
            .iter()
            .filter(|c| request.contains(c.timestamp))
            .collect();
        let skip = in_range.len().saturating_sub(request.limit);
        let candles: Vec<Candle> = in_range[skip..].iter().map(|c| **c).collect();

        let has_more = match candles.first() {
            Some(first) => history.iter().any(|c| c.timestamp < first.timestamp),
            None => false,
        };
        Self { candles, has_more }
    }
}

/// Asynchronous historical range fetch.
///
/// Implementations may complete in any order relative to each other; callers
/// are responsible for discarding stale results.
pub trait HistoricalSource: Send + Sync {
    fn fetch(
        &self,
        request: FetchRequest,
    ) -> impl Future<Output = Result<HistoryPage, FetchError>> + Send;
}

/// An in-memory history served through [`HistoricalSource`].
///
/// Stored candles are the finest resolution available; each fetch resamples
/// them to the requested timeframe before slicing.
#[derive(Debug, Clone, Default)]
pub struct CandleStore {
    candles: Vec<Candle>,
}

impl CandleStore {
    pub fn new(mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by_key(|c| c.timestamp);
        Self { candles }
    }

    /// Load a full history from a synchronous source.
    pub fn from_source(source: &impl DataSource) -> anyhow::Result<Self> {
        Ok(Self::new(source.load()?))
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

impl HistoricalSource for CandleStore {
    async fn fetch(&self, request: FetchRequest) -> Result<HistoryPage, FetchError> {
        let resampled = aggregate_candles(&self.candles, request.timeframe);
        Ok(HistoryPage::slice(&resampled, &request))
    }
}
