//! Core types for the charter engine.
//!
//! - `Candle` - OHLCV candle data
//! - `Tick` - a single trade from the live feed
//! - `Timeframe` - bucket widths and candle resampling
//! - `CandleBuffer` - bounded per-series candle storage
//! - `SeriesAggregator` / `CandleAggregator` - tick folding
//! - `TimeSeries` - container for indicator output

pub mod aggregator;
pub mod buffer;
pub mod candle;
pub mod series;
pub mod tick;
pub mod timeframe;

pub use aggregator::{CandleAggregator, DropReason, SeriesAggregator, SeriesKey, TickOutcome};
pub use buffer::{CandleBuffer, DEFAULT_BUFFER_CAPACITY};
pub use candle::{heikin_ashi, Candle, OHLCV};
pub use series::TimeSeries;
pub use tick::Tick;
pub use timeframe::{aggregate_candles, ParseTimeframeError, Timeframe};
