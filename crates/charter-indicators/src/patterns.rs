//! Chart pattern detection.
//!
//! Double tops are two local highs of nearly equal height, 10 to 29 candles
//! apart, with a low between them at least 5% under the first high. Double
//! bottoms mirror that on the lows.

use charter_core::Candle;
use serde::{Deserialize, Serialize};

/// Candles skipped at each end before a first extreme is considered.
const EDGE: usize = 20;
const MIN_GAP: usize = 10;
const MAX_GAP: usize = 30;
/// Largest relative difference between the two extremes.
const MAX_DIFF: f64 = 0.02;
/// Required retracement between the extremes.
const MIN_DEPTH: f64 = 0.05;
/// Candles added on either side of a match.
const PADDING: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartPattern {
    DoubleTop,
    DoubleBottom,
}

/// A detected pattern spanning candle indices `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern: ChartPattern,
    pub start: usize,
    pub end: usize,
    /// 0.7 for extremes 2% apart up to 1.0 for identical ones.
    pub confidence: f64,
}

fn is_peak(values: &[f64], i: usize) -> bool {
    values[i] > values[i - 1] && values[i] > values[i + 1]
}

fn is_trough(values: &[f64], i: usize) -> bool {
    values[i] < values[i - 1] && values[i] < values[i + 1]
}

/// Every double top and double bottom in `candles`, tops first.
pub fn find_double_tops_bottoms(candles: &[Candle]) -> Vec<PatternMatch> {
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();

    let mut matches = scan(&highs, &lows, ChartPattern::DoubleTop);
    matches.extend(scan(&lows, &highs, ChartPattern::DoubleBottom));
    matches
}

/// `extremes` holds the series the pattern is made of, `opposite` the one
/// that has to retrace between them.
fn scan(extremes: &[f64], opposite: &[f64], pattern: ChartPattern) -> Vec<PatternMatch> {
    let len = extremes.len();
    let is_extreme: fn(&[f64], usize) -> bool = match pattern {
        ChartPattern::DoubleTop => is_peak,
        ChartPattern::DoubleBottom => is_trough,
    };

    let mut found = Vec::new();
    for i in EDGE..len.saturating_sub(EDGE) {
        if !is_extreme(extremes, i) {
            continue;
        }
        let first = extremes[i];
        for j in (i + MIN_GAP)..(i + MAX_GAP).min(len - 1) {
            if !is_extreme(extremes, j) {
                continue;
            }
            let diff = (first - extremes[j]).abs() / first;
            if !diff.is_finite() || diff >= MAX_DIFF {
                continue;
            }

            let between = &opposite[i..j];
            let retraced = match pattern {
                ChartPattern::DoubleTop => between
                    .iter()
                    .any(|&low| low < first * (1.0 - MIN_DEPTH)),
                ChartPattern::DoubleBottom => between
                    .iter()
                    .any(|&high| high > first * (1.0 + MIN_DEPTH)),
            };
            if retraced {
                found.push(PatternMatch {
                    pattern,
                    start: i - PADDING,
                    end: (j + PADDING).min(len - 1),
                    confidence: 0.7 + 0.3 * (1.0 - diff),
                });
            }
        }
    }
    found
}
