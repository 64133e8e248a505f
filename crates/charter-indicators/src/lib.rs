//! Indicator framework for technical analysis.
//!
//! Every indicator is a pure function over a candle slice that returns series
//! aligned index-for-index with its input. [`IndicatorKind`] is the
//! configurable dispatch over the concrete [`Indicator`] implementations.

pub mod atr;
pub mod bollinger;
pub mod fibonacci;
pub mod indicator;
pub mod ma;
pub mod macd;
pub mod patterns;
pub mod rsi;
pub mod stochastic;
pub mod volume;

pub use atr::{atr, true_range, Atr, AtrConfig};
pub use bollinger::{bollinger, BollingerBands, BollingerConfig, BollingerOutput};
pub use fibonacci::{fibonacci_levels, FibonacciLevel, FIBONACCI_RATIOS};
pub use indicator::{
    compute_all, Indicator, IndicatorConfig, IndicatorKind, IndicatorMap, IndicatorOutput,
    PriceSource,
};
pub use ma::{ema, ema_opt, sma, sma_opt, wma, Ema, MovingAverageConfig, Sma, Wma};
pub use macd::{Macd, MacdConfig, MacdOutput};
pub use rsi::{rsi, Rsi, RsiConfig};
pub use patterns::{find_double_tops_bottoms, ChartPattern, PatternMatch};
pub use stochastic::{stochastic, Stochastic, StochasticConfig, StochasticOutput};
pub use volume::{volume, Volume, VolumeConfig};
