//! Deterministic synthetic market data.
//!
//! Candles are a closed-form function of their bucket index, so any two pages
//! requested from the same [`MockSource`] line up exactly.

use std::time::Duration;

use charter_core::{Candle, Tick, Timeframe};
use tokio::task::JoinHandle;

use crate::error::FetchError;
use crate::live::TickHub;
use crate::source::{FetchRequest, HistoricalSource, HistoryPage};

/// Base price for a symbol: BTC 45 000, ETH 3 000, otherwise 100.
pub fn base_price(symbol: &str) -> f64 {
    let symbol = symbol.to_uppercase();
    if symbol.contains("BTC") {
        45_000.0
    } else if symbol.contains("ETH") {
        3_000.0
    } else {
        100.0
    }
}

/// Relative price level at bucket `n`. Steps between neighbours average about 0.2 %.
fn level(n: i64) -> f64 {
    let x = n as f64;
    1.0 + 0.03 * (x * 0.011).sin() + 0.01 * (x * 0.097).sin() + 0.004 * (x * 0.61).sin()
}

/// Synthetic candle for the bucket starting at `bucket_start`.
pub fn mock_candle(symbol: &str, timeframe: Timeframe, bucket_start: i64) -> Candle {
    let base = base_price(symbol);
    let n = bucket_start.div_euclid(timeframe.millis());

    let open = base * level(n - 1);
    let close = base * level(n);
    let wick = base * 0.002 * (n as f64 * 1.7).sin().abs();
    let volume = 500_000.0 + 400_000.0 * (n as f64 * 0.37).sin();

    Candle::new(
        bucket_start,
        open,
        open.max(close) + wick,
        open.min(close) - wick,
        close,
        volume,
    )
}

/// `count` consecutive mock candles ending with the bucket containing `end`.
pub fn generate_candles(symbol: &str, timeframe: Timeframe, end: i64, count: usize) -> Vec<Candle> {
    let width = timeframe.millis();
    let last = timeframe.bucket_start(end);
    (0..count as i64)
        .rev()
        .map(|i| mock_candle(symbol, timeframe, last - i * width))
        .collect()
}

/// Historical source that never fails and always has more history.
#[derive(Debug, Clone)]
pub struct MockSource {
    anchor: i64,
}

impl MockSource {
    /// `anchor` stands in for "now": the newest candle is the bucket containing it.
    pub fn new(anchor: i64) -> Self {
        Self { anchor }
    }

    pub fn anchor(&self) -> i64 {
        self.anchor
    }

    pub fn page(&self, request: &FetchRequest) -> HistoryPage {
        let end = match request.to {
            Some(to) => to - 1,
            None => self.anchor,
        };
        let mut candles = generate_candles(&request.symbol, request.timeframe, end, request.limit);
        candles.retain(|c| request.contains(c.timestamp));
        HistoryPage::new(candles, request.from.is_none())
    }
}

impl HistoricalSource for MockSource {
    async fn fetch(&self, request: FetchRequest) -> Result<HistoryPage, FetchError> {
        Ok(self.page(&request))
    }
}

/// Deterministic tick stream walking around a candle series.
#[derive(Debug, Clone)]
pub struct MockTickGenerator {
    symbol: String,
    timeframe: Timeframe,
    timestamp: i64,
    step_ms: i64,
}

impl MockTickGenerator {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, start: i64, step_ms: i64) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            timestamp: start,
            step_ms: step_ms.max(1),
        }
    }
}

impl Iterator for MockTickGenerator {
    type Item = Tick;

    fn next(&mut self) -> Option<Tick> {
        let bucket = self.timeframe.bucket_start(self.timestamp);
        let candle = mock_candle(&self.symbol, self.timeframe, bucket);
        let progress = (self.timestamp - bucket) as f64 / self.timeframe.millis() as f64;
        let jitter = (self.timestamp as f64 * 0.001).sin() * (candle.high - candle.low) * 0.25;
        let price = (candle.open + (candle.close - candle.open) * progress + jitter).max(f64::EPSILON);
        let volume = candle.volume / 1_000.0;

        let tick = Tick::new(self.symbol.clone(), price, volume, self.timestamp);
        self.timestamp += self.step_ms;
        Some(tick)
    }
}

/// Publish `count` generated ticks to `topic`, one per `interval`.
pub fn spawn_mock_feed(
    hub: TickHub,
    topic: String,
    generator: MockTickGenerator,
    interval: Duration,
    count: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        for tick in generator.take(count) {
            ticker.tick().await;
            if hub.publish(&topic, tick) == 0 {
                log::debug!("mock feed: no subscribers on {topic}");
            }
        }
        log::info!("mock feed on {topic} finished");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_prices() {
        assert_eq!(base_price("BTCUSDT"), 45_000.0);
        assert_eq!(base_price("eth-usd"), 3_000.0);
        assert_eq!(base_price("AAPL"), 100.0);
    }

    #[test]
    fn test_candles_are_consistent_and_aligned() {
        let candles = generate_candles("BTCUSDT", Timeframe::Min5, 1_700_000_123_456, 200);
        assert_eq!(candles.len(), 200);
        for pair in candles.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, Timeframe::Min5.millis());
            assert!((pair[1].open - pair[0].close).abs() < 1e-9);
        }
        assert!(candles.iter().all(|c| c.is_consistent() && c.low > 0.0 && c.volume > 0.0));
    }

    #[test]
    fn test_pages_line_up() {
        let source = MockSource::new(10 * 60_000);
        let latest = source.page(&FetchRequest::latest("X", Timeframe::Min1, 4));
        let first = latest.candles[0].timestamp;
        let older = source.page(&FetchRequest::before("X", Timeframe::Min1, first, 3));

        assert_eq!(latest.candles.last().map(|c| c.timestamp), Some(600_000));
        assert_eq!(older.candles.len(), 3);
        assert_eq!(older.candles.last().map(|c| c.timestamp), Some(first - 60_000));
        assert_eq!(
            older.candles[2],
            mock_candle("X", Timeframe::Min1, first - 60_000)
        );
    }

    #[test]
    fn test_tick_generator_is_well_formed() {
        let ticks: Vec<Tick> = MockTickGenerator::new("ETH", Timeframe::Min1, 0, 7_000)
            .take(50)
            .collect();
        assert!(ticks.iter().all(Tick::is_well_formed));
        assert_eq!(ticks[1].timestamp, 7_000);
    }
}
