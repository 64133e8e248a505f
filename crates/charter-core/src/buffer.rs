//! Bounded candle storage for one (symbol, timeframe) series.

use crate::candle::Candle;

/// Default number of candles retained per series.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1000;

/// Ordered candles capped at `capacity`; the oldest are evicted first.
///
/// The last candle is the open ("current") one. Everything before it is closed.
#[derive(Debug, Clone)]
pub struct CandleBuffer {
    candles: Vec<Candle>,
    capacity: usize,
}

impl CandleBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "candle buffer capacity must be positive");
        Self {
            candles: Vec::with_capacity(capacity.min(DEFAULT_BUFFER_CAPACITY)),
            capacity,
        }
    }

    /// Build a buffer from candles, keeping only the newest `capacity`.
    pub fn with_candles(capacity: usize, candles: Vec<Candle>) -> Self {
        let mut buffer = Self::new(capacity);
        buffer.replace(candles);
        buffer
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn to_vec(&self) -> Vec<Candle> {
        self.candles.clone()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    /// The open candle.
    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut Candle> {
        self.candles.last_mut()
    }

    /// Append a candle and evict from the front if over capacity.
    ///
    /// Returns the number of evicted candles.
    pub fn push(&mut self, candle: Candle) -> usize {
        self.candles.push(candle);
        self.evict_overflow()
    }

    /// Replace all contents. Input is sorted, de-duplicated by timestamp
    /// (later entries win) and trimmed to the newest `capacity` candles.
    pub fn replace(&mut self, mut candles: Vec<Candle>) -> usize {
        candles.sort_by_key(|c| c.timestamp);
        candles.reverse();
        candles.dedup_by_key(|c| c.timestamp);
        candles.reverse();
        self.candles = candles;
        self.evict_overflow()
    }

    /// Prepend older candles.
    ///
    /// Candles at or after the current first timestamp are ignored. Only as many
    /// as fit below `capacity` are kept, nearest-in-time first. Returns the number
    /// actually prepended.
    pub fn prepend(&mut self, mut older: Vec<Candle>) -> usize {
        if let Some(first) = self.candles.first() {
            let cutoff = first.timestamp;
            older.retain(|c| c.timestamp < cutoff);
        }
        older.sort_by_key(|c| c.timestamp);
        older.dedup_by_key(|c| c.timestamp);

        let room = self.capacity.saturating_sub(self.candles.len());
        if older.len() > room {
            older.drain(..older.len() - room);
        }

        let added = older.len();
        older.append(&mut self.candles);
        self.candles = older;
        added
    }

    /// Drop every candle.
    pub fn clear(&mut self) {
        self.candles.clear();
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    fn evict_overflow(&mut self) -> usize {
        let overflow = self.candles.len().saturating_sub(self.capacity);
        if overflow > 0 {
            self.candles.drain(..overflow);
        }
        overflow
    }
}

impl Default for CandleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}
