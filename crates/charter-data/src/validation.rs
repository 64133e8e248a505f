//! Validation utilities for incoming market data.

use charter_core::{aggregate_candles, Candle, Tick, Timeframe};

/// Validate a tick has reasonable values.
pub fn validate_tick(tick: &Tick) -> bool {
    tick.is_well_formed()
}

/// Validate a candle has reasonable values.
pub fn validate_candle(candle: &Candle) -> bool {
    candle.open.is_finite()
        && candle.high.is_finite()
        && candle.low.is_finite()
        && candle.close.is_finite()
        && candle.volume.is_finite()
        && candle.is_consistent()
        && candle.low > 0.0
        && candle.volume >= 0.0
        && candle.timestamp >= 0
}

/// Drop invalid candles, then order by timestamp keeping the last duplicate.
pub fn sanitize_history(candles: Vec<Candle>) -> Vec<Candle> {
    let total = candles.len();
    let mut valid: Vec<Candle> = candles.into_iter().filter(validate_candle).collect();
    let rejected = total - valid.len();
    if rejected > 0 {
        log::warn!("dropped {rejected} malformed candles out of {total}");
    }

    valid.sort_by_key(|c| c.timestamp);
    valid.reverse();
    valid.dedup_by_key(|c| c.timestamp);
    valid.reverse();
    valid
}

/// Fold candles that do not start on a `timeframe` bucket boundary into the
/// bucket containing them. Input must be ordered by timestamp.
pub fn align_history(candles: Vec<Candle>, timeframe: Timeframe) -> Vec<Candle> {
    let unaligned = candles
        .iter()
        .filter(|c| timeframe.bucket_start(c.timestamp) != c.timestamp)
        .count();
    if unaligned == 0 {
        return candles;
    }
    log::warn!(
        "{unaligned} of {} candles not on a {timeframe} boundary; resampling",
        candles.len()
    );
    aggregate_candles(&candles, timeframe)
}
