//! Timeframe types and candle aggregation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::candle::Candle;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Timeframe enumeration for different chart periods.
///
/// Week and month are fixed durations (7 and 30 days), not calendar aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Min1,
    #[serde(rename = "5m")]
    Min5,
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "30m")]
    Min30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1w")]
    Week1,
    #[serde(rename = "1M")]
    Month1,
}

impl Timeframe {
    /// Bucket width in milliseconds.
    pub fn millis(&self) -> i64 {
        match self {
            Timeframe::Min1 => MINUTE_MS,
            Timeframe::Min5 => 5 * MINUTE_MS,
            Timeframe::Min15 => 15 * MINUTE_MS,
            Timeframe::Min30 => 30 * MINUTE_MS,
            Timeframe::Hour1 => HOUR_MS,
            Timeframe::Hour4 => 4 * HOUR_MS,
            Timeframe::Day1 => DAY_MS,
            Timeframe::Week1 => 7 * DAY_MS,
            Timeframe::Month1 => 30 * DAY_MS,
        }
    }

    /// Returns a short label for this timeframe.
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Min1 => "1m",
            Timeframe::Min5 => "5m",
            Timeframe::Min15 => "15m",
            Timeframe::Min30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Day1 => "1d",
            Timeframe::Week1 => "1w",
            Timeframe::Month1 => "1M",
        }
    }

    /// Returns all available timeframes, finest first.
    pub fn all() -> &'static [Timeframe] {
        &[
            Timeframe::Min1,
            Timeframe::Min5,
            Timeframe::Min15,
            Timeframe::Min30,
            Timeframe::Hour1,
            Timeframe::Hour4,
            Timeframe::Day1,
            Timeframe::Week1,
            Timeframe::Month1,
        ]
    }

    /// Start of the bucket containing `timestamp`.
    ///
    /// Buckets are half-open: `[start, start + width)`.
    pub fn bucket_start(&self, timestamp: i64) -> i64 {
        let width = self.millis();
        timestamp.div_euclid(width) * width
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a timeframe label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTimeframeError(pub String);

impl fmt::Display for ParseTimeframeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown timeframe: {}", self.0)
    }
}

impl std::error::Error for ParseTimeframeError {}

impl FromStr for Timeframe {
    type Err = ParseTimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::all()
            .iter()
            .copied()
            .find(|tf| tf.label() == s)
            .ok_or_else(|| ParseTimeframeError(s.to_string()))
    }
}

/// Aggregate candles into a larger timeframe.
///
/// Input must be ordered by timestamp. Each output candle starts at the
/// bucket boundary of the target timeframe.
pub fn aggregate_candles(candles: &[Candle], timeframe: Timeframe) -> Vec<Candle> {
    let mut aggregated: Vec<Candle> = Vec::new();

    for candle in candles {
        let bucket_start = timeframe.bucket_start(candle.timestamp);

        match aggregated.last_mut() {
            Some(agg) if agg.timestamp == bucket_start => {
                agg.high = agg.high.max(candle.high);
                agg.low = agg.low.min(candle.low);
                agg.close = candle.close;
                agg.volume += candle.volume;
            }
            _ => aggregated.push(Candle {
                timestamp: bucket_start,
                ..*candle
            }),
        }
    }

    aggregated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_start_half_open() {
        let tf = Timeframe::Min1;
        assert_eq!(tf.bucket_start(0), 0);
        assert_eq!(tf.bucket_start(59_999), 0);
        assert_eq!(tf.bucket_start(60_000), 60_000);
        assert_eq!(tf.bucket_start(65_000), 60_000);
    }

    #[test]
    fn test_bucket_start_negative() {
        assert_eq!(Timeframe::Min1.bucket_start(-1), -60_000);
    }

    #[test]
    fn test_widths() {
        assert_eq!(Timeframe::Hour4.millis(), 14_400_000);
        assert_eq!(Timeframe::Week1.millis(), 604_800_000);
        assert_eq!(Timeframe::Month1.millis(), 2_592_000_000);
    }

    #[test]
    fn test_label_roundtrip() {
        for tf in Timeframe::all() {
            assert_eq!(tf.label().parse::<Timeframe>(), Ok(*tf));
        }
        assert!("2m".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_serde_uses_label() {
        let json = serde_json::to_string(&Timeframe::Month1).unwrap();
        assert_eq!(json, "\"1M\"");
        let tf: Timeframe = serde_json::from_str("\"15m\"").unwrap();
        assert_eq!(tf, Timeframe::Min15);
    }

    #[test]
    fn test_aggregate_candles() {
        let candles: Vec<Candle> = (0..10)
            .map(|i| {
                let p = 100.0 + i as f64;
                Candle::new(i * 60_000, p, p + 1.0, p - 1.0, p + 0.5, 10.0)
            })
            .collect();

        let five = aggregate_candles(&candles, Timeframe::Min5);
        assert_eq!(five.len(), 2);
        assert_eq!(five[0].timestamp, 0);
        assert_eq!(five[0].open, 100.0);
        assert_eq!(five[0].high, 105.0);
        assert_eq!(five[0].low, 99.0);
        assert_eq!(five[0].close, 104.5);
        assert_eq!(five[0].volume, 50.0);
        assert_eq!(five[1].timestamp, 300_000);
    }
}
