//! MACD (Moving Average Convergence Divergence) indicator.

use charter_core::{Candle, TimeSeries};

use crate::indicator::{Indicator, IndicatorConfig, IndicatorOutput, PriceSource};
use crate::ma::{ema, ema_opt};

/// MACD indicator configuration.
#[derive(Debug, Clone)]
pub struct MacdConfig {
    /// Fast EMA period (default: 12).
    pub fast_period: usize,
    /// Slow EMA period (default: 26).
    pub slow_period: usize,
    /// Signal line EMA period (default: 9).
    pub signal_period: usize,
    /// Price source for calculation.
    pub price_source: PriceSource,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
            price_source: PriceSource::Close,
        }
    }
}

impl IndicatorConfig for MacdConfig {}

/// MACD indicator output.
#[derive(Debug, Clone)]
pub struct MacdOutput {
    /// MACD line values (fast EMA - slow EMA).
    pub macd_line: TimeSeries<f64>,
    /// Signal line values (EMA of MACD line).
    pub signal_line: TimeSeries<f64>,
    /// Histogram values (MACD - Signal).
    pub histogram: TimeSeries<f64>,
}

/// MACD indicator.
pub struct Macd {
    config: MacdConfig,
}

impl Indicator for Macd {
    type Config = MacdConfig;

    fn new(config: Self::Config) -> Self {
        Self { config }
    }

    fn calculate(&self, candles: &[Candle]) -> IndicatorOutput {
        let output = self.calculate_macd(candles);

        IndicatorOutput::MultiLine(vec![
            ("MACD".to_string(), output.macd_line),
            ("MACD_SIGNAL".to_string(), output.signal_line),
            ("MACD_HISTOGRAM".to_string(), output.histogram),
        ])
    }

    fn min_periods(&self) -> usize {
        // slow_period for the first MACD value, then signal_period more for the signal line
        self.config.slow_period + self.config.signal_period - 1
    }

    fn is_overlay(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "MACD"
    }
}

impl Macd {
    /// Calculate MACD values and return structured output.
    ///
    /// The MACD line is present where both EMAs are, the signal line is an EMA
    /// over the present MACD values, so it warms up on top of the MACD warm-up.
    pub fn calculate_macd(&self, candles: &[Candle]) -> MacdOutput {
        let prices = self.config.price_source.extract_all(candles);

        let fast = ema(&prices, self.config.fast_period);
        let slow = ema(&prices, self.config.slow_period);

        let macd_line: TimeSeries<f64> = fast
            .values()
            .iter()
            .zip(slow.values())
            .map(|(f, s)| Some((*f)? - (*s)?))
            .collect();

        let signal_line = ema_opt(macd_line.values(), self.config.signal_period);

        let histogram: TimeSeries<f64> = macd_line
            .values()
            .iter()
            .zip(signal_line.values())
            .map(|(m, s)| Some((*m)? - (*s)?))
            .collect();

        MacdOutput {
            macd_line,
            signal_line,
            histogram,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &MacdConfig {
        &self.config
    }
}
