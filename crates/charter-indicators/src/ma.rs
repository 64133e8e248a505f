//! Moving averages: SMA, EMA and WMA.
//!
//! The slice functions are the primitives every other indicator builds on.
//! The `_opt` variants accept gapped input and only emit a value once a full
//! window of present values is available.

use charter_core::{Candle, TimeSeries};

use crate::indicator::{Indicator, IndicatorConfig, IndicatorOutput, PriceSource};

/// Simple moving average. `None` for `i < period - 1`.
pub fn sma(values: &[f64], period: usize) -> TimeSeries<f64> {
    assert!(period > 0, "SMA period must be positive");
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for (i, value) in values.iter().enumerate() {
        sum += value;
        if i >= period {
            sum -= values[i - period];
        }
        out.push(if i + 1 >= period {
            Some(sum / period as f64)
        } else {
            None
        });
    }

    TimeSeries::from_options(out)
}

/// Exponential moving average seeded with the SMA of the first `period` values.
pub fn ema(values: &[f64], period: usize) -> TimeSeries<f64> {
    let present: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    ema_opt(&present, period)
}

/// Linearly weighted moving average, weights `1..=period` oldest to newest.
pub fn wma(values: &[f64], period: usize) -> TimeSeries<f64> {
    assert!(period > 0, "WMA period must be positive");
    let denominator = (period * (period + 1)) as f64 / 2.0;

    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if i + 1 < period {
                return None;
            }
            let window = &values[i + 1 - period..=i];
            let weighted: f64 = window
                .iter()
                .enumerate()
                .map(|(j, v)| v * (j + 1) as f64)
                .sum();
            Some(weighted / denominator)
        })
        .collect()
}

/// SMA over gapped input. A window containing any `None` yields `None`.
pub fn sma_opt(values: &[Option<f64>], period: usize) -> TimeSeries<f64> {
    assert!(period > 0, "SMA period must be positive");
    let mut out = Vec::with_capacity(values.len());
    let mut run = 0usize;
    let mut sum = 0.0;

    for (i, value) in values.iter().enumerate() {
        match value {
            Some(v) => {
                run += 1;
                sum += v;
                if run > period {
                    // the value leaving the window is present because the run covers it
                    sum -= values[i - period].unwrap_or(0.0);
                }
                out.push(if run >= period {
                    Some(sum / period as f64)
                } else {
                    None
                });
            }
            None => {
                run = 0;
                sum = 0.0;
                out.push(None);
            }
        }
    }

    TimeSeries::from_options(out)
}

/// EMA over gapped input. Seeding restarts after every gap.
pub fn ema_opt(values: &[Option<f64>], period: usize) -> TimeSeries<f64> {
    assert!(period > 0, "EMA period must be positive");
    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut run = 0usize;
    let mut seed_sum = 0.0;
    let mut prev: Option<f64> = None;

    for value in values {
        let Some(v) = *value else {
            run = 0;
            seed_sum = 0.0;
            prev = None;
            out.push(None);
            continue;
        };

        run += 1;
        let next = match prev {
            Some(p) => Some(v * k + p * (1.0 - k)),
            None => {
                seed_sum += v;
                (run == period).then(|| seed_sum / period as f64)
            }
        };
        prev = next;
        out.push(next);
    }

    TimeSeries::from_options(out)
}

/// Shared configuration for the single-period moving averages.
#[derive(Debug, Clone)]
pub struct MovingAverageConfig {
    pub period: usize,
    pub price_source: PriceSource,
}

impl MovingAverageConfig {
    pub fn with_period(period: usize) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }
}

impl Default for MovingAverageConfig {
    fn default() -> Self {
        Self {
            period: 20,
            price_source: PriceSource::Close,
        }
    }
}

impl IndicatorConfig for MovingAverageConfig {}

macro_rules! moving_average {
    ($name:ident, $func:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        pub struct $name {
            config: MovingAverageConfig,
            name: String,
        }

        impl Indicator for $name {
            type Config = MovingAverageConfig;

            fn new(config: Self::Config) -> Self {
                let name = format!(concat!($prefix, "{}"), config.period);
                Self { config, name }
            }

            fn calculate(&self, candles: &[Candle]) -> IndicatorOutput {
                let prices = self.config.price_source.extract_all(candles);
                IndicatorOutput::Line($func(&prices, self.config.period))
            }

            fn min_periods(&self) -> usize {
                self.config.period
            }

            fn is_overlay(&self) -> bool {
                true
            }

            fn name(&self) -> &str {
                &self.name
            }
        }
    };
}

moving_average!(Sma, sma, "SMA", "Simple moving average indicator.");
moving_average!(Ema, ema, "EMA", "Exponential moving average indicator.");
moving_average!(Wma, wma, "WMA", "Weighted moving average indicator.");
