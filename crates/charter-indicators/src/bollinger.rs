//! Bollinger Bands.

use charter_core::{Candle, TimeSeries};

use crate::indicator::{Indicator, IndicatorConfig, IndicatorOutput, PriceSource};
use crate::ma::sma;

#[derive(Debug, Clone)]
pub struct BollingerOutput {
    pub upper: TimeSeries<f64>,
    pub middle: TimeSeries<f64>,
    pub lower: TimeSeries<f64>,
}

/// `middle = SMA(period)`, bands at `middle ± std_dev * σ` with population σ.
pub fn bollinger(values: &[f64], period: usize, std_dev: f64) -> BollingerOutput {
    let middle = sma(values, period);
    let mut upper = Vec::with_capacity(values.len());
    let mut lower = Vec::with_capacity(values.len());

    for (i, mean) in middle.values().iter().enumerate() {
        match mean {
            Some(mean) => {
                let window = &values[i + 1 - period..=i];
                let variance =
                    window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
                let band = std_dev * variance.sqrt();
                upper.push(Some(mean + band));
                lower.push(Some(mean - band));
            }
            None => {
                upper.push(None);
                lower.push(None);
            }
        }
    }

    BollingerOutput {
        upper: TimeSeries::from_options(upper),
        middle,
        lower: TimeSeries::from_options(lower),
    }
}

#[derive(Debug, Clone)]
pub struct BollingerConfig {
    pub period: usize,
    pub std_dev: f64,
    pub price_source: PriceSource,
}

impl Default for BollingerConfig {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev: 2.0,
            price_source: PriceSource::Close,
        }
    }
}

impl IndicatorConfig for BollingerConfig {}

pub struct BollingerBands {
    config: BollingerConfig,
}

impl Indicator for BollingerBands {
    type Config = BollingerConfig;

    fn new(config: Self::Config) -> Self {
        Self { config }
    }

    fn calculate(&self, candles: &[Candle]) -> IndicatorOutput {
        let prices = self.config.price_source.extract_all(candles);
        let bands = bollinger(&prices, self.config.period, self.config.std_dev);
        IndicatorOutput::MultiLine(vec![
            ("BB_UPPER".to_string(), bands.upper),
            ("BB_MIDDLE".to_string(), bands.middle),
            ("BB_LOWER".to_string(), bands.lower),
        ])
    }

    fn min_periods(&self) -> usize {
        self.config.period
    }

    fn is_overlay(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "BB"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_std_dev() {
        // mean 5, population variance 4
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let bands = bollinger(&values, 8, 2.0);

        assert_eq!(bands.middle.get(7), Some(&5.0));
        assert_eq!(bands.upper.get(7), Some(&9.0));
        assert_eq!(bands.lower.get(7), Some(&1.0));
        assert_eq!(bands.upper.get(6), None);
    }

    #[test]
    fn test_flat_input_collapses_bands() {
        let bands = bollinger(&[3.0; 25], 20, 2.0);
        assert_eq!(bands.upper.last(), Some(&3.0));
        assert_eq!(bands.lower.last(), Some(&3.0));
        assert_eq!(bands.upper.start_index(), Some(19));
    }
}
