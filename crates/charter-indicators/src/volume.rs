//! Traded volume as an indicator series.

use charter_core::{Candle, TimeSeries};

use crate::indicator::{Indicator, IndicatorConfig, IndicatorOutput};

/// Per-candle volume. Defined from the first candle, no warm-up.
pub fn volume(candles: &[Candle]) -> TimeSeries<f64> {
    TimeSeries::from_options(candles.iter().map(|c| Some(c.volume)).collect())
}

#[derive(Debug, Clone, Default)]
pub struct VolumeConfig;

impl IndicatorConfig for VolumeConfig {}

pub struct Volume;

impl Indicator for Volume {
    type Config = VolumeConfig;

    fn new(_config: Self::Config) -> Self {
        Self
    }

    fn calculate(&self, candles: &[Candle]) -> IndicatorOutput {
        IndicatorOutput::Line(volume(candles))
    }

    fn min_periods(&self) -> usize {
        1
    }

    fn is_overlay(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "VOLUME"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_follows_candles() {
        let candles = vec![
            Candle::new(0, 1.0, 1.0, 1.0, 1.0, 5.0),
            Candle::new(60_000, 1.0, 1.0, 1.0, 1.0, 0.0),
            Candle::new(120_000, 1.0, 1.0, 1.0, 1.0, 7.5),
        ];
        let series = volume(&candles);
        assert_eq!(series.values(), &[Some(5.0), Some(0.0), Some(7.5)]);
        assert_eq!(series.start_index(), Some(0));
    }

    #[test]
    fn test_volume_indicator() {
        let indicator = Volume::new(VolumeConfig);
        assert_eq!(indicator.min_periods(), 1);
        assert!(!indicator.is_overlay());
        assert!(volume(&[]).is_empty());
    }
}
