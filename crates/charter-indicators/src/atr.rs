//! ATR (Average True Range).

use charter_core::{Candle, TimeSeries};

use crate::indicator::{Indicator, IndicatorConfig, IndicatorOutput};

/// True range per candle. The first has no previous close: `high - low`.
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| match i.checked_sub(1).map(|p| candles[p].close) {
            Some(prev_close) => (c.high - c.low)
                .max((c.high - prev_close).abs())
                .max((c.low - prev_close).abs()),
            None => c.high - c.low,
        })
        .collect()
}

/// Wilder-smoothed ATR, first value at `period - 1`.
pub fn atr(candles: &[Candle], period: usize) -> TimeSeries<f64> {
    assert!(period > 0, "ATR period must be positive");
    let tr = true_range(candles);
    let mut out: Vec<Option<f64>> = vec![None; tr.len()];
    if tr.len() < period {
        return TimeSeries::from_options(out);
    }

    let p = period as f64;
    let mut current = tr[..period].iter().sum::<f64>() / p;
    out[period - 1] = Some(current);
    for i in period..tr.len() {
        current = (current * (p - 1.0) + tr[i]) / p;
        out[i] = Some(current);
    }

    TimeSeries::from_options(out)
}

#[derive(Debug, Clone)]
pub struct AtrConfig {
    pub period: usize,
}

impl Default for AtrConfig {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl IndicatorConfig for AtrConfig {}

pub struct Atr {
    config: AtrConfig,
    name: String,
}

impl Indicator for Atr {
    type Config = AtrConfig;

    fn new(config: Self::Config) -> Self {
        let name = format!("ATR{}", config.period);
        Self { config, name }
    }

    fn calculate(&self, candles: &[Candle]) -> IndicatorOutput {
        IndicatorOutput::Line(atr(candles, self.config.period))
    }

    fn min_periods(&self) -> usize {
        self.config.period
    }

    fn is_overlay(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_true_range_uses_gaps() {
        let candles = vec![
            Candle::new(0, 10.0, 12.0, 9.0, 11.0, 1.0),
            // gap up: high - prev close dominates
            Candle::new(60_000, 15.0, 16.0, 14.0, 15.0, 1.0),
        ];
        assert_eq!(true_range(&candles), vec![3.0, 5.0]);
    }

    #[test]
    fn test_atr_wilder() {
        let candles: Vec<Candle> = (0..5)
            .map(|i| Candle::new(i * 60_000, 10.0, 11.0, 9.0, 10.0, 1.0))
            .collect();
        let series = atr(&candles, 3);
        assert_eq!(series.start_index(), Some(2));
        assert_eq!(series.get(2), Some(&2.0));
        assert_eq!(series.get(4), Some(&2.0));
    }

    #[test]
    fn test_atr_short_input() {
        let candles = vec![Candle::from_trade(0, 1.0, 1.0)];
        assert_eq!(atr(&candles, 14).values(), &[None]);
    }
}
