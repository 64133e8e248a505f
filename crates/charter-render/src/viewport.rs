//! Time and price projection for the chart area.

use charter_core::{Candle, Timeframe};

use crate::{BASE_CANDLE_WIDTH, MIN_CANDLE_PIXELS};

/// Visible time window mapped onto `width_px` logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Inclusive left edge in ms.
    pub left: i64,
    /// Right edge in ms.
    pub right: i64,
    /// Width of one candle body in logical pixels.
    pub candle_width_px: f64,
    pub width_px: f64,
}

impl Viewport {
    pub fn new(left: i64, right: i64, width_px: f64) -> Self {
        Self {
            left,
            right: right.max(left + 1),
            candle_width_px: MIN_CANDLE_PIXELS,
            width_px: width_px.max(0.0),
        }
    }

    pub fn span(&self) -> i64 {
        self.right - self.left
    }

    pub fn px_per_ms(&self) -> f64 {
        self.width_px / self.span() as f64
    }

    pub fn time_to_x(&self, timestamp: i64) -> f64 {
        (timestamp - self.left) as f64 * self.px_per_ms()
    }

    pub fn x_to_time(&self, x: f64) -> i64 {
        if self.width_px <= 0.0 {
            return self.left;
        }
        self.left + (x / self.px_per_ms()).round() as i64
    }

    /// Shift the window. Positive deltas move toward newer data.
    pub fn pan(&mut self, delta_ms: i64) {
        self.left += delta_ms;
        self.right += delta_ms;
    }

    /// Scale the span by `factor` keeping `anchor_ms` at the same x.
    /// `factor < 1` zooms in.
    pub fn zoom(&mut self, factor: f64, anchor_ms: i64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let left = anchor_ms as f64 - (anchor_ms - self.left) as f64 * factor;
        let right = anchor_ms as f64 + (self.right - anchor_ms) as f64 * factor;
        let (left, right) = (left.round() as i64, right.round() as i64);
        if right > left {
            let old_span = self.span() as f64;
            self.left = left;
            self.right = right;
            self.candle_width_px =
                (self.candle_width_px * old_span / self.span() as f64).max(MIN_CANDLE_PIXELS);
        }
    }

    /// Show every candle with half a bucket of margin on each side.
    ///
    /// Candles are drawn centred on their bucket start, the same x their
    /// indicator values use.
    pub fn fit(&mut self, candles: &[Candle], timeframe: Timeframe) {
        let (Some(first), Some(last)) = (candles.first(), candles.last()) else {
            return;
        };
        let w = timeframe.millis();
        self.left = first.timestamp - w / 2;
        self.right = last.timestamp + w / 2;
        self.update_candle_width(w);
    }

    pub fn set_width(&mut self, width_px: f64) {
        self.width_px = width_px.max(0.0);
    }

    /// Body width for buckets of `bucket_ms`.
    pub fn update_candle_width(&mut self, bucket_ms: i64) {
        let slot = bucket_ms as f64 * self.px_per_ms();
        self.candle_width_px = (slot * BASE_CANDLE_WIDTH).max(MIN_CANDLE_PIXELS);
    }
}

/// Linear price to y mapping, top of the area is `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceScale {
    pub min: f64,
    pub max: f64,
    pub top: f64,
    pub height: f64,
}

impl PriceScale {
    pub fn new(min: f64, max: f64, top: f64, height: f64) -> Self {
        let (min, max) = if max > min {
            (min, max)
        } else {
            // flat range, open it up around the value
            let pad = if min.abs() > 0.0 { min.abs() * 0.01 } else { 1.0 };
            (min - pad, min + pad)
        };
        Self { min, max, top, height }
    }

    /// Price range of the candles inside `viewport`, padded by 5 % per side.
    pub fn fit(candles: &[Candle], viewport: &Viewport, top: f64, height: f64) -> Self {
        let visible = candles
            .iter()
            .filter(|c| c.timestamp >= viewport.left && c.timestamp <= viewport.right);
        let (lo, hi) = visible.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c.low), hi.max(c.high))
        });
        if !lo.is_finite() || !hi.is_finite() {
            return Self::new(0.0, 1.0, top, height);
        }
        let pad = (hi - lo) * 0.05;
        Self::new(lo - pad, hi + pad, top, height)
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn price_to_y(&self, price: f64) -> f64 {
        self.top + (self.max - price) / self.range() * self.height
    }

    pub fn y_to_price(&self, y: f64) -> f64 {
        if self.height <= 0.0 {
            return self.max;
        }
        self.max - (y - self.top) / self.height * self.range()
    }
}

/// Both axes together, as handed to pipelines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub viewport: Viewport,
    pub price: PriceScale,
}

impl Projection {
    pub fn new(viewport: Viewport, price: PriceScale) -> Self {
        Self { viewport, price }
    }

    /// Logical pixel position of `(timestamp, price)`.
    pub fn project(&self, timestamp: i64, price: f64) -> (f64, f64) {
        (self.viewport.time_to_x(timestamp), self.price.price_to_y(price))
    }
}
