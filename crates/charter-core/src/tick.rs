//! Live trade ticks.

use serde::{Deserialize, Serialize};

/// A single observed trade. Never stored; only folded into a [`Candle`](crate::Candle).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub price: f64,
    #[serde(default)]
    pub volume: f64,
    pub timestamp: i64,
}

impl Tick {
    pub fn new(symbol: impl Into<String>, price: f64, volume: f64, timestamp: i64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            volume,
            timestamp,
        }
    }

    /// Finite positive price, finite non-negative volume, non-negative timestamp.
    pub fn is_well_formed(&self) -> bool {
        self.price.is_finite()
            && self.price > 0.0
            && self.volume.is_finite()
            && self.volume >= 0.0
            && self.timestamp >= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed() {
        assert!(Tick::new("AAPL", 10.0, 0.0, 0).is_well_formed());
        assert!(!Tick::new("AAPL", f64::NAN, 1.0, 0).is_well_formed());
        assert!(!Tick::new("AAPL", 0.0, 1.0, 0).is_well_formed());
        assert!(!Tick::new("AAPL", 10.0, -1.0, 0).is_well_formed());
        assert!(!Tick::new("AAPL", 10.0, f64::INFINITY, 0).is_well_formed());
        assert!(!Tick::new("AAPL", 10.0, 1.0, -5).is_well_formed());
    }

    #[test]
    fn test_missing_volume_defaults_to_zero() {
        let tick: Tick =
            serde_json::from_str(r#"{"symbol":"BTC","price":1.5,"timestamp":10}"#).unwrap();
        assert_eq!(tick.volume, 0.0);
    }
}
