//! Tick to candle aggregation.
//!
//! [`SeriesAggregator`] folds ticks into one (symbol, timeframe) buffer.
//! [`CandleAggregator`] is an explicit map of those keyed by [`SeriesKey`].

use std::collections::HashMap;

use crate::buffer::CandleBuffer;
use crate::candle::Candle;
use crate::tick::Tick;
use crate::timeframe::Timeframe;

/// Identifies one candle series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub symbol: String,
    pub timeframe: Timeframe,
}

impl SeriesKey {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
        }
    }
}

/// Why a tick was not folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Non-finite or non-positive price, bad volume or negative timestamp.
    Malformed,
    /// Belongs to a bucket older than the open candle.
    Late,
    /// Tick for a symbol this series does not track.
    OtherSymbol,
}

/// Result of applying one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// First candle of an empty series.
    Opened { candle: Candle, evicted: usize },
    /// The open candle was mutated in place.
    Updated { candle: Candle },
    /// A new bucket opened, finalising the previous candle.
    Closed {
        closed: Candle,
        opened: Candle,
        evicted: usize,
    },
    Dropped(DropReason),
}

impl TickOutcome {
    /// Whether the buffer changed.
    pub fn is_applied(&self) -> bool {
        !matches!(self, TickOutcome::Dropped(_))
    }

    /// Whether the buffer changed shape (a candle was appended).
    pub fn appended(&self) -> bool {
        matches!(self, TickOutcome::Opened { .. } | TickOutcome::Closed { .. })
    }

    /// Candles evicted from the front by this tick.
    pub fn evicted(&self) -> usize {
        match self {
            TickOutcome::Opened { evicted, .. } | TickOutcome::Closed { evicted, .. } => *evicted,
            _ => 0,
        }
    }
}

/// Folds ticks for a single timeframe into a [`CandleBuffer`].
#[derive(Debug, Clone)]
pub struct SeriesAggregator {
    timeframe: Timeframe,
    buffer: CandleBuffer,
}

impl SeriesAggregator {
    pub fn new(timeframe: Timeframe, capacity: usize) -> Self {
        Self {
            timeframe,
            buffer: CandleBuffer::new(capacity),
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn buffer(&self) -> &CandleBuffer {
        &self.buffer
    }

    pub fn candles(&self) -> &[Candle] {
        self.buffer.as_slice()
    }

    /// The open candle, if any.
    pub fn current(&self) -> Option<&Candle> {
        self.buffer.last()
    }

    /// Replace the buffer with historical candles.
    pub fn seed(&mut self, candles: Vec<Candle>) -> usize {
        self.buffer.replace(candles)
    }

    /// Prepend older historical candles.
    pub fn prepend(&mut self, candles: Vec<Candle>) -> usize {
        self.buffer.prepend(candles)
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Fold one tick. The symbol is not checked here.
    pub fn apply(&mut self, tick: &Tick) -> TickOutcome {
        if !tick.is_well_formed() {
            return TickOutcome::Dropped(DropReason::Malformed);
        }

        let bucket = self.timeframe.bucket_start(tick.timestamp);

        let current_ts = match self.buffer.last() {
            None => {
                let candle = Candle::from_trade(bucket, tick.price, tick.volume);
                let evicted = self.buffer.push(candle);
                return TickOutcome::Opened { candle, evicted };
            }
            Some(current) => current.timestamp,
        };

        if bucket < current_ts {
            return TickOutcome::Dropped(DropReason::Late);
        }

        if bucket == current_ts {
            return match self.buffer.last_mut() {
                Some(current) => {
                    current.fold_trade(tick.price, tick.volume);
                    TickOutcome::Updated { candle: *current }
                }
                None => TickOutcome::Dropped(DropReason::Late),
            };
        }

        let closed = self.buffer.last().copied();
        let opened = Candle::from_trade(bucket, tick.price, tick.volume);
        let evicted = self.buffer.push(opened);
        match closed {
            Some(closed) => TickOutcome::Closed {
                closed,
                opened,
                evicted,
            },
            None => TickOutcome::Opened {
                candle: opened,
                evicted,
            },
        }
    }
}

/// Candle series for every tracked (symbol, timeframe).
#[derive(Debug, Clone)]
pub struct CandleAggregator {
    capacity: usize,
    series: HashMap<SeriesKey, SeriesAggregator>,
}

impl CandleAggregator {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            series: HashMap::new(),
        }
    }

    /// Start tracking a series. No-op if already tracked.
    pub fn track(&mut self, key: SeriesKey) -> &mut SeriesAggregator {
        let capacity = self.capacity;
        self.series
            .entry(key)
            .or_insert_with_key(|key| SeriesAggregator::new(key.timeframe, capacity))
    }

    /// Stop tracking a series, dropping its candles.
    pub fn untrack(&mut self, key: &SeriesKey) -> Option<SeriesAggregator> {
        self.series.remove(key)
    }

    pub fn series(&self, key: &SeriesKey) -> Option<&SeriesAggregator> {
        self.series.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &SeriesKey> {
        self.series.keys()
    }

    /// Seed a series with historical candles, tracking it if needed.
    pub fn seed(&mut self, key: SeriesKey, candles: Vec<Candle>) -> usize {
        self.track(key).seed(candles)
    }

    /// Fold a tick into one series.
    pub fn apply(&mut self, key: &SeriesKey, tick: &Tick) -> TickOutcome {
        if key.symbol != tick.symbol {
            return TickOutcome::Dropped(DropReason::OtherSymbol);
        }
        match self.series.get_mut(key) {
            Some(series) => series.apply(tick),
            None => self.track(key.clone()).apply(tick),
        }
    }

    /// Fold a tick into every tracked timeframe of its symbol.
    pub fn apply_all(&mut self, tick: &Tick) -> Vec<(Timeframe, TickOutcome)> {
        let mut outcomes: Vec<(Timeframe, TickOutcome)> = self
            .series
            .iter_mut()
            .filter(|(key, _)| key.symbol == tick.symbol)
            .map(|(key, series)| (key.timeframe, series.apply(tick)))
            .collect();
        outcomes.sort_by_key(|(tf, _)| *tf);
        outcomes
    }
}
