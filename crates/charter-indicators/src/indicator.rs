//! Core indicator traits and types.

use std::collections::BTreeMap;

use charter_core::{Candle, TimeSeries};
use serde::{Deserialize, Serialize};

use crate::atr::{Atr, AtrConfig};
use crate::bollinger::{BollingerBands, BollingerConfig};
use crate::ma::{Ema, MovingAverageConfig, Sma, Wma};
use crate::macd::{Macd, MacdConfig};
use crate::rsi::{Rsi, RsiConfig};
use crate::stochastic::{Stochastic, StochasticConfig};
use crate::volume::{Volume, VolumeConfig};

/// Indicator series keyed by output name (`SMA20`, `MACD_SIGNAL`, ...).
pub type IndicatorMap = BTreeMap<String, TimeSeries<f64>>;

/// Trait for indicator configuration.
pub trait IndicatorConfig: Clone + Default {}

/// Which price to use for indicator calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Open,
    High,
    Low,
    #[default]
    Close,
    /// (High + Low) / 2
    HL2,
    /// (High + Low + Close) / 3
    HLC3,
    /// (Open + High + Low + Close) / 4
    OHLC4,
}

impl PriceSource {
    /// Extract the price from a candle based on this source.
    pub fn extract(&self, candle: &Candle) -> f64 {
        match self {
            PriceSource::Open => candle.open,
            PriceSource::High => candle.high,
            PriceSource::Low => candle.low,
            PriceSource::Close => candle.close,
            PriceSource::HL2 => (candle.high + candle.low) / 2.0,
            PriceSource::HLC3 => (candle.high + candle.low + candle.close) / 3.0,
            PriceSource::OHLC4 => (candle.open + candle.high + candle.low + candle.close) / 4.0,
        }
    }

    pub fn extract_all(&self, candles: &[Candle]) -> Vec<f64> {
        candles.iter().map(|c| self.extract(c)).collect()
    }
}

/// Output from an indicator calculation.
#[derive(Debug, Clone)]
pub enum IndicatorOutput {
    /// Single line output (e.g., SMA, EMA).
    Line(TimeSeries<f64>),
    /// Multiple named lines (e.g., Bollinger Bands, MACD).
    MultiLine(Vec<(String, TimeSeries<f64>)>),
    /// Oscillator with values and bounds (e.g., RSI).
    Oscillator {
        values: TimeSeries<f64>,
        upper_bound: f64,
        lower_bound: f64,
    },
}

impl IndicatorOutput {
    /// Flatten into named series. Single-line outputs take `name`.
    pub fn into_named(self, name: &str) -> Vec<(String, TimeSeries<f64>)> {
        match self {
            IndicatorOutput::Line(series) => vec![(name.to_string(), series)],
            IndicatorOutput::Oscillator { values, .. } => vec![(name.to_string(), values)],
            IndicatorOutput::MultiLine(lines) => lines,
        }
    }
}

/// Trait for technical indicators.
pub trait Indicator {
    /// The configuration type for this indicator.
    type Config: IndicatorConfig;

    /// Create a new indicator with the given configuration.
    fn new(config: Self::Config) -> Self;

    /// Calculate the indicator values for the given candles.
    ///
    /// Every returned series has exactly `candles.len()` entries.
    fn calculate(&self, candles: &[Candle]) -> IndicatorOutput;

    /// Minimum number of periods required before the indicator produces valid output.
    fn min_periods(&self) -> usize;

    /// Whether this indicator should be overlaid on the price chart (true)
    /// or displayed in a separate pane (false).
    fn is_overlay(&self) -> bool;

    /// Human-readable name of the indicator.
    fn name(&self) -> &str;
}

fn default_rsi_period() -> usize {
    14
}

fn default_fast() -> usize {
    12
}

fn default_slow() -> usize {
    26
}

fn default_signal() -> usize {
    9
}

fn default_bollinger_period() -> usize {
    20
}

fn default_std_dev() -> f64 {
    2.0
}

fn default_k_period() -> usize {
    14
}

fn default_smoothing() -> usize {
    3
}

fn default_atr_period() -> usize {
    14
}

/// A configured indicator.
///
/// Deserialises from tables such as `{ type = "sma", period = 20 }` or
/// `{ type = "macd" }` (defaults filled in).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndicatorKind {
    Sma {
        period: usize,
    },
    Ema {
        period: usize,
    },
    Wma {
        period: usize,
    },
    Rsi {
        #[serde(default = "default_rsi_period")]
        period: usize,
    },
    Macd {
        #[serde(default = "default_fast")]
        fast: usize,
        #[serde(default = "default_slow")]
        slow: usize,
        #[serde(default = "default_signal")]
        signal: usize,
    },
    Bollinger {
        #[serde(default = "default_bollinger_period")]
        period: usize,
        #[serde(default = "default_std_dev")]
        std_dev: f64,
    },
    Stochastic {
        #[serde(default = "default_k_period")]
        k_period: usize,
        #[serde(default = "default_smoothing")]
        k_smooth: usize,
        #[serde(default = "default_smoothing")]
        d_period: usize,
    },
    Atr {
        #[serde(default = "default_atr_period")]
        period: usize,
    },
    Volume,
}

impl IndicatorKind {
    /// The dashboard's standard indicator set.
    pub fn default_set() -> Vec<IndicatorKind> {
        vec![
            IndicatorKind::Sma { period: 20 },
            IndicatorKind::Ema { period: 12 },
            IndicatorKind::Rsi { period: 14 },
            IndicatorKind::Macd {
                fast: 12,
                slow: 26,
                signal: 9,
            },
            IndicatorKind::Bollinger {
                period: 20,
                std_dev: 2.0,
            },
            IndicatorKind::Stochastic {
                k_period: 14,
                k_smooth: 3,
                d_period: 3,
            },
            IndicatorKind::Atr { period: 14 },
        ]
    }

    /// Check parameters. Zero periods are rejected here so that configured
    /// indicators never reach the calculation asserts.
    pub fn validate(&self) -> Result<(), String> {
        let periods: Vec<(&str, usize)> = match self {
            IndicatorKind::Sma { period }
            | IndicatorKind::Ema { period }
            | IndicatorKind::Wma { period }
            | IndicatorKind::Rsi { period }
            | IndicatorKind::Atr { period }
            | IndicatorKind::Bollinger { period, .. } => vec![("period", *period)],
            IndicatorKind::Macd { fast, slow, signal } => {
                vec![("fast", *fast), ("slow", *slow), ("signal", *signal)]
            }
            IndicatorKind::Stochastic {
                k_period,
                k_smooth,
                d_period,
            } => vec![
                ("k_period", *k_period),
                ("k_smooth", *k_smooth),
                ("d_period", *d_period),
            ],
            IndicatorKind::Volume => Vec::new(),
        };

        if let Some((field, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return Err(format!("{}: {} must be positive", self.label(), field));
        }
        if let IndicatorKind::Bollinger { std_dev, .. } = self {
            if !std_dev.is_finite() || *std_dev < 0.0 {
                return Err(format!("{}: std_dev must be finite and non-negative", self.label()));
            }
        }
        Ok(())
    }

    /// Base name of the indicator, as used for single-line outputs.
    pub fn label(&self) -> String {
        match self {
            IndicatorKind::Sma { period } => format!("SMA{period}"),
            IndicatorKind::Ema { period } => format!("EMA{period}"),
            IndicatorKind::Wma { period } => format!("WMA{period}"),
            IndicatorKind::Rsi { period } => format!("RSI{period}"),
            IndicatorKind::Atr { period } => format!("ATR{period}"),
            IndicatorKind::Macd { .. } => "MACD".to_string(),
            IndicatorKind::Bollinger { .. } => "BB".to_string(),
            IndicatorKind::Stochastic { .. } => "STOCH".to_string(),
            IndicatorKind::Volume => "VOLUME".to_string(),
        }
    }

    pub fn is_overlay(&self) -> bool {
        matches!(
            self,
            IndicatorKind::Sma { .. }
                | IndicatorKind::Ema { .. }
                | IndicatorKind::Wma { .. }
                | IndicatorKind::Bollinger { .. }
        )
    }

    /// Names of the series `calculate` produces, in output order.
    pub fn output_names(&self) -> Vec<String> {
        match self {
            IndicatorKind::Macd { .. } => vec![
                "MACD".to_string(),
                "MACD_SIGNAL".to_string(),
                "MACD_HISTOGRAM".to_string(),
            ],
            IndicatorKind::Bollinger { .. } => vec![
                "BB_UPPER".to_string(),
                "BB_MIDDLE".to_string(),
                "BB_LOWER".to_string(),
            ],
            IndicatorKind::Stochastic { .. } => {
                vec!["STOCH_K".to_string(), "STOCH_D".to_string()]
            }
            _ => vec![self.label()],
        }
    }

    /// Run the indicator over `candles` and name its outputs.
    pub fn calculate(&self, candles: &[Candle]) -> Vec<(String, TimeSeries<f64>)> {
        let name = self.label();
        let output = match *self {
            IndicatorKind::Sma { period } => {
                Sma::new(MovingAverageConfig::with_period(period)).calculate(candles)
            }
            IndicatorKind::Ema { period } => {
                Ema::new(MovingAverageConfig::with_period(period)).calculate(candles)
            }
            IndicatorKind::Wma { period } => {
                Wma::new(MovingAverageConfig::with_period(period)).calculate(candles)
            }
            IndicatorKind::Rsi { period } => Rsi::new(RsiConfig {
                period,
                ..Default::default()
            })
            .calculate(candles),
            IndicatorKind::Macd { fast, slow, signal } => Macd::new(MacdConfig {
                fast_period: fast,
                slow_period: slow,
                signal_period: signal,
                ..Default::default()
            })
            .calculate(candles),
            IndicatorKind::Bollinger { period, std_dev } => {
                BollingerBands::new(BollingerConfig {
                    period,
                    std_dev,
                    ..Default::default()
                })
                .calculate(candles)
            }
            IndicatorKind::Stochastic {
                k_period,
                k_smooth,
                d_period,
            } => Stochastic::new(StochasticConfig {
                k_period,
                k_smooth,
                d_period,
            })
            .calculate(candles),
            IndicatorKind::Atr { period } => Atr::new(AtrConfig { period }).calculate(candles),
            IndicatorKind::Volume => Volume::new(VolumeConfig).calculate(candles),
        };
        output.into_named(&name)
    }
}

/// Compute every configured indicator over `candles`.
///
/// Later kinds overwrite earlier ones that produce the same output name.
pub fn compute_all(kinds: &[IndicatorKind], candles: &[Candle]) -> IndicatorMap {
    let mut map = IndicatorMap::new();
    for kind in kinds {
        for (name, series) in kind.calculate(candles) {
            debug_assert_eq!(series.len(), candles.len(), "{name} misaligned");
            map.insert(name, series);
        }
    }
    map
}
