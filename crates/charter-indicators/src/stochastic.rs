//! Stochastic oscillator (%K / %D).

use charter_core::{Candle, TimeSeries};

use crate::indicator::{Indicator, IndicatorConfig, IndicatorOutput};
use crate::ma::sma_opt;

#[derive(Debug, Clone)]
pub struct StochasticOutput {
    pub k: TimeSeries<f64>,
    pub d: TimeSeries<f64>,
}

/// Raw `%K = 100 * (close - LL) / (HH - LL)` over `k_period`, smoothed by
/// `k_smooth`; `%D = SMA(%K, d_period)`. A flat window gives `%K = 0`.
pub fn stochastic(
    candles: &[Candle],
    k_period: usize,
    k_smooth: usize,
    d_period: usize,
) -> StochasticOutput {
    assert!(k_period > 0, "stochastic period must be positive");

    let raw: Vec<Option<f64>> = (0..candles.len())
        .map(|i| {
            if i + 1 < k_period {
                return None;
            }
            let window = &candles[i + 1 - k_period..=i];
            let highest = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
            let lowest = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
            let range = highest - lowest;
            if range == 0.0 {
                Some(0.0)
            } else {
                Some(100.0 * (candles[i].close - lowest) / range)
            }
        })
        .collect();

    let k = sma_opt(&raw, k_smooth);
    let d = sma_opt(k.values(), d_period);
    StochasticOutput { k, d }
}

#[derive(Debug, Clone)]
pub struct StochasticConfig {
    pub k_period: usize,
    pub k_smooth: usize,
    pub d_period: usize,
}

impl Default for StochasticConfig {
    fn default() -> Self {
        Self {
            k_period: 14,
            k_smooth: 3,
            d_period: 3,
        }
    }
}

impl IndicatorConfig for StochasticConfig {}

pub struct Stochastic {
    config: StochasticConfig,
}

impl Indicator for Stochastic {
    type Config = StochasticConfig;

    fn new(config: Self::Config) -> Self {
        Self { config }
    }

    fn calculate(&self, candles: &[Candle]) -> IndicatorOutput {
        let out = stochastic(
            candles,
            self.config.k_period,
            self.config.k_smooth,
            self.config.d_period,
        );
        IndicatorOutput::MultiLine(vec![
            ("STOCH_K".to_string(), out.k),
            ("STOCH_D".to_string(), out.d),
        ])
    }

    fn min_periods(&self) -> usize {
        self.config.k_period + self.config.k_smooth + self.config.d_period - 2
    }

    fn is_overlay(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "STOCH"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(i: i64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(i * 60_000, close, high, low, close, 1.0)
    }

    #[test]
    fn test_warm_up_offsets() {
        let candles: Vec<Candle> = (0..30)
            .map(|i| {
                let p = 50.0 + (i as f64 * 0.5).sin() * 5.0;
                candle(i, p + 1.0, p - 1.0, p)
            })
            .collect();
        let out = stochastic(&candles, 14, 3, 3);
        assert_eq!(out.k.start_index(), Some(15));
        assert_eq!(out.d.start_index(), Some(17));
        assert!(out.k.iter().all(|(_, v)| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn test_flat_range_is_zero() {
        let candles: Vec<Candle> = (0..5).map(|i| candle(i, 10.0, 10.0, 10.0)).collect();
        let out = stochastic(&candles, 3, 1, 1);
        assert_eq!(out.k.get(2), Some(&0.0));
        assert_eq!(out.d.get(4), Some(&0.0));
    }

    #[test]
    fn test_close_at_high_is_100() {
        let candles = vec![
            candle(0, 10.0, 5.0, 6.0),
            candle(1, 12.0, 6.0, 7.0),
            candle(2, 14.0, 8.0, 14.0),
        ];
        let out = stochastic(&candles, 3, 1, 1);
        assert_eq!(out.k.get(2), Some(&100.0));
    }
}
