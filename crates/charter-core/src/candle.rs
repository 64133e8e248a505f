//! Candle data structures for OHLCV data.

use serde::{Deserialize, Serialize};

/// OHLCV candle. `timestamp` is the bucket start in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Open a fresh bucket from a single trade: `open = high = low = close = price`.
    pub fn from_trade(bucket_start: i64, price: f64, volume: f64) -> Self {
        Self::new(bucket_start, price, price, price, price, volume)
    }

    /// Fold one more trade into this candle.
    pub fn fold_trade(&mut self, price: f64, volume: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume += volume;
    }

    /// Whether the candle closed at or above its open.
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }

    /// `low <= min(open, close) <= max(open, close) <= high`
    pub fn is_consistent(&self) -> bool {
        let body_low = self.open.min(self.close);
        let body_high = self.open.max(self.close);
        self.low <= body_low && body_high <= self.high
    }

    /// Span between high and low.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Trait for types that provide OHLCV data.
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

impl OHLCV for Candle {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

/// Convert regular candles into Heikin-Ashi candles.
///
/// The first HA candle opens at the midpoint of the source body; every later one
/// opens at the midpoint of the previous HA body. Timestamps and volumes are kept.
pub fn heikin_ashi(candles: &[Candle]) -> Vec<Candle> {
    let mut out: Vec<Candle> = Vec::with_capacity(candles.len());

    for candle in candles {
        let ha_close = (candle.open + candle.high + candle.low + candle.close) / 4.0;
        let ha_open = match out.last() {
            Some(prev) => (prev.open + prev.close) / 2.0,
            None => (candle.open + candle.close) / 2.0,
        };
        out.push(Candle {
            timestamp: candle.timestamp,
            open: ha_open,
            high: candle.high.max(ha_open).max(ha_close),
            low: candle.low.min(ha_open).min(ha_close),
            close: ha_close,
            volume: candle.volume,
        });
    }

    out
}
