//! RSI (Relative Strength Index) with Wilder smoothing.

use charter_core::{Candle, TimeSeries};

use crate::indicator::{Indicator, IndicatorConfig, IndicatorOutput, PriceSource};

/// RSI over `values`. The first value sits at index `period`.
///
/// A zero average loss yields 100.
pub fn rsi(values: &[f64], period: usize) -> TimeSeries<f64> {
    assert!(period > 0, "RSI period must be positive");
    let mut out: Vec<Option<f64>> = vec![None; values.len()];
    if values.len() <= period {
        return TimeSeries::from_options(out);
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = values[i] - values[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    let p = period as f64;
    for i in period + 1..values.len() {
        let change = values[i] - values[i - 1];
        let (gain, loss) = if change > 0.0 { (change, 0.0) } else { (0.0, -change) };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        out[i] = Some(rsi_value(avg_gain, avg_loss));
    }

    TimeSeries::from_options(out)
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

/// RSI indicator configuration.
#[derive(Debug, Clone)]
pub struct RsiConfig {
    pub period: usize,
    pub price_source: PriceSource,
    /// Overbought guide level (default: 70).
    pub overbought: f64,
    /// Oversold guide level (default: 30).
    pub oversold: f64,
}

impl Default for RsiConfig {
    fn default() -> Self {
        Self {
            period: 14,
            price_source: PriceSource::Close,
            overbought: 70.0,
            oversold: 30.0,
        }
    }
}

impl IndicatorConfig for RsiConfig {}

/// RSI indicator.
pub struct Rsi {
    config: RsiConfig,
    name: String,
}

impl Indicator for Rsi {
    type Config = RsiConfig;

    fn new(config: Self::Config) -> Self {
        let name = format!("RSI{}", config.period);
        Self { config, name }
    }

    fn calculate(&self, candles: &[Candle]) -> IndicatorOutput {
        let prices = self.config.price_source.extract_all(candles);
        IndicatorOutput::Oscillator {
            values: rsi(&prices, self.config.period),
            upper_bound: self.config.overbought,
            lower_bound: self.config.oversold,
        }
    }

    fn min_periods(&self) -> usize {
        self.config.period + 1
    }

    fn is_overlay(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        &self.name
    }
}
