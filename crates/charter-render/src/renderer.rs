//! Chart renderer coordination.

use charter_core::{Candle, TimeSeries, Timeframe};

use crate::context::{DrawContext, DrawStats};
use crate::pipeline::{
    guideline_levels, line_points, CandlePipeline, GuidelinePipeline, IndicatorPipeline,
    LinePoint, Pipeline,
};
use crate::scheduler::{FrameClock, FrameScheduler, FrameState, ManualClock};
use crate::surface::{PixelBuffer, Rgba};
use crate::text::{Font, TextAlign, TextRenderer};
use crate::viewport::{PriceScale, Projection, Viewport};
use crate::{DEFAULT_SIMPLIFY_TOLERANCE, TEXT_CACHE_CAPACITY};

/// Surface and behaviour settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f64,
    /// Draw into a second buffer and copy it to the visible one per frame.
    pub offscreen: bool,
    pub simplify_tolerance: f64,
    pub text_cache_capacity: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
            device_pixel_ratio: 1.0,
            offscreen: true,
            simplify_tolerance: DEFAULT_SIMPLIFY_TOLERANCE,
            text_cache_capacity: TEXT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub background: Rgba,
    pub grid: Rgba,
    pub text: Rgba,
    pub bullish: Rgba,
    pub bearish: Rgba,
    /// Overlay colours, cycled by overlay index.
    pub lines: Vec<Rgba>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Rgba::rgb(19, 23, 34),
            grid: Rgba::rgb(42, 46, 57),
            text: Rgba::rgb(209, 212, 220),
            bullish: Rgba::rgb(38, 166, 154),
            bearish: Rgba::rgb(239, 83, 80),
            lines: vec![
                Rgba::rgb(41, 98, 255),
                Rgba::rgb(255, 152, 0),
                Rgba::rgb(156, 39, 176),
                Rgba::rgb(0, 188, 212),
            ],
        }
    }
}

impl Theme {
    pub fn line_color(&self, index: usize) -> Rgba {
        if self.lines.is_empty() {
            return self.text;
        }
        self.lines[index % self.lines.len()]
    }
}

/// A queued drawing request, executed in order on the next frame.
pub enum DrawOp {
    Candles(Vec<Candle>),
    Indicator { points: Vec<LinePoint>, color: Rgba },
    /// Grid lines and price labels for the current price scale.
    Guidelines,
    Text {
        text: String,
        x: f64,
        y: f64,
        color: Rgba,
        align: TextAlign,
    },
    Custom(Box<dyn FnOnce(&mut DrawContext) + Send>),
}

impl std::fmt::Debug for DrawOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Candles(c) => f.debug_tuple("Candles").field(&c.len()).finish(),
            Self::Indicator { points, color } => f
                .debug_struct("Indicator")
                .field("points", &points.len())
                .field("color", color)
                .finish(),
            Self::Guidelines => f.write_str("Guidelines"),
            Self::Text { text, .. } => f.debug_tuple("Text").field(text).finish(),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Summary of one flushed frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub ops: usize,
    /// Candles, line points and guidelines drawn.
    pub primitives: usize,
    pub draw: DrawStats,
    /// Frame skipped because the surface has no pixels.
    pub skipped: bool,
}

struct Pipelines {
    candles: CandlePipeline,
    guidelines: GuidelinePipeline,
    text: TextRenderer,
    font: Font,
    tolerance: f64,
}

impl Pipelines {
    fn execute(&mut self, op: DrawOp, ctx: &mut DrawContext, proj: &Projection) -> usize {
        match op {
            DrawOp::Candles(candles) => self.candles.render(ctx, proj, &candles),
            DrawOp::Indicator { points, color } => {
                IndicatorPipeline::new(color)
                    .with_tolerance(self.tolerance)
                    .render(ctx, proj, &points)
            }
            DrawOp::Guidelines => {
                let (levels, step) = guideline_levels(&proj.price);
                let drawn = self.guidelines.render(ctx, proj, &levels);
                self.guidelines
                    .draw_labels(ctx, &mut self.text, proj, &levels, step);
                drawn
            }
            DrawOp::Text {
                text,
                x,
                y,
                color,
                align,
            } => {
                self.text.draw(ctx, &text, x, y, self.font, color, align);
                1
            }
            DrawOp::Custom(draw) => {
                draw(ctx);
                1
            }
        }
    }
}

/// Batches draw ops and flushes them once per frame clock tick.
///
/// The renderer owns the visible surface, an optional off-screen surface of
/// the same size, the projection and its own text cache.
pub struct ChartRenderer<C = ManualClock> {
    clock: C,
    scheduler: FrameScheduler<DrawOp>,
    visible: DrawContext,
    offscreen: Option<DrawContext>,
    projection: Projection,
    pipelines: Pipelines,
    theme: Theme,
    frames: u64,
}

impl<C: FrameClock> ChartRenderer<C> {
    pub fn new(options: RenderOptions, theme: Theme, clock: C) -> Self {
        let RenderOptions {
            width,
            height,
            device_pixel_ratio,
            offscreen,
            simplify_tolerance,
            text_cache_capacity,
        } = options;

        let visible = DrawContext::new(width, height, device_pixel_ratio);
        let offscreen = offscreen.then(|| DrawContext::new(width, height, device_pixel_ratio));
        let projection = Projection::new(
            Viewport::new(0, 1, width as f64),
            PriceScale::new(0.0, 1.0, 0.0, height as f64),
        );

        Self {
            clock,
            scheduler: FrameScheduler::new(),
            visible,
            offscreen,
            projection,
            pipelines: Pipelines {
                candles: CandlePipeline::new(theme.bullish, theme.bearish),
                guidelines: GuidelinePipeline::new(theme.grid, theme.text),
                text: TextRenderer::new(text_cache_capacity),
                font: Font::default(),
                tolerance: simplify_tolerance,
            },
            theme,
            frames: 0,
        }
    }

    /// Queue an op. Only the first op of a frame window requests a frame.
    pub fn queue_render(&mut self, op: DrawOp) {
        self.scheduler.queue(op, &mut self.clock);
    }

    /// Queue a full chart: guidelines, candles, then one line per overlay.
    /// The price scale is refitted to the candles in the viewport.
    pub fn queue_chart(&mut self, candles: &[Candle], overlays: &[&TimeSeries<f64>]) {
        let height = self.visible.css_height() as f64;
        self.projection.price = PriceScale::fit(candles, &self.projection.viewport, 0.0, height);

        self.queue_render(DrawOp::Guidelines);
        self.queue_render(DrawOp::Candles(candles.to_vec()));
        for (i, series) in overlays.iter().enumerate() {
            self.queue_render(DrawOp::Indicator {
                points: line_points(candles, series),
                color: self.theme.line_color(i),
            });
        }
    }

    /// Queue a message centred on the surface in place of the chart.
    pub fn queue_message(&mut self, message: &str) {
        let x = self.visible.css_width() as f64 / 2.0;
        let y = (self.visible.css_height() as f64 - self.pipelines.font.size_px as f64) / 2.0;
        self.queue_render(DrawOp::Text {
            text: message.to_string(),
            x,
            y,
            color: self.theme.text,
            align: TextAlign::Center,
        });
    }

    /// Frame callback. Clears the target once, runs every queued op in order
    /// and presents. Returns `None` when no frame was scheduled.
    pub fn on_frame(&mut self) -> Option<FrameStats> {
        let ops = self.scheduler.begin_flush()?;
        let op_count = ops.len();

        if self.visible.is_zero_sized() {
            log::debug!("surface has no pixels, dropping {op_count} draw ops");
            self.scheduler.end_flush(&mut self.clock);
            return Some(FrameStats {
                ops: op_count,
                skipped: true,
                ..FrameStats::default()
            });
        }

        let target = match self.offscreen.as_mut() {
            Some(offscreen) => offscreen,
            None => &mut self.visible,
        };
        target.reset_stats();
        target.clear(self.theme.background);

        let mut primitives = 0;
        for op in ops {
            primitives += self.pipelines.execute(op, target, &self.projection);
        }
        let draw = target.stats();

        if let Some(offscreen) = self.offscreen.as_ref() {
            if !self.visible.present(offscreen.buffer()) {
                log::warn!("off-screen buffer size mismatch, frame not presented");
            }
        }

        self.frames += 1;
        self.scheduler.end_flush(&mut self.clock);
        Some(FrameStats {
            ops: op_count,
            primitives,
            draw,
            skipped: false,
        })
    }

    /// Resize every surface. Takes effect before the next flush.
    pub fn resize(&mut self, width: u32, height: u32, device_pixel_ratio: f64) {
        self.visible.resize(width, height, device_pixel_ratio);
        if let Some(offscreen) = self.offscreen.as_mut() {
            offscreen.resize(width, height, device_pixel_ratio);
        }
        self.projection.viewport.set_width(width as f64);
        self.projection.price.height = height as f64;
        log::debug!("resized to {width}x{height} @ {device_pixel_ratio}");
    }

    /// Fit the viewport to `candles`.
    pub fn fit(&mut self, candles: &[Candle], timeframe: Timeframe) {
        self.projection.viewport.fit(candles, timeframe);
        let height = self.visible.css_height() as f64;
        self.projection.price = PriceScale::fit(candles, &self.projection.viewport, 0.0, height);
    }

    /// Drop queued ops and any pending frame.
    pub fn cancel(&mut self) {
        self.scheduler.cancel(&mut self.clock);
    }

    /// Cancel and release cached label images.
    pub fn destroy(&mut self) {
        self.cancel();
        self.pipelines.text.clear_cache();
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.projection.viewport
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn surface(&self) -> &PixelBuffer {
        self.visible.buffer()
    }

    pub fn text(&self) -> &TextRenderer {
        &self.pipelines.text
    }

    pub fn state(&self) -> FrameState {
        self.scheduler.state()
    }

    pub fn pending(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles(n: i64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64;
                Candle::new(i * 60_000, base, base + 2.0, base - 2.0, base + 1.0, 10.0)
            })
            .collect()
    }

    fn renderer(options: RenderOptions) -> ChartRenderer {
        ChartRenderer::new(options, Theme::default(), ManualClock::default())
    }

    #[test]
    fn test_many_ops_one_frame() {
        let mut r = renderer(RenderOptions::default());
        let data = candles(30);
        r.fit(&data, Timeframe::Min1);
        r.queue_render(DrawOp::Guidelines);
        r.queue_render(DrawOp::Candles(data.clone()));
        r.queue_render(DrawOp::Candles(data));
        assert_eq!(r.clock().requested, 1);
        assert_eq!(r.state(), FrameState::Scheduled);

        let stats = r.on_frame().unwrap();
        assert_eq!(stats.ops, 3);
        assert_eq!(stats.draw.clears, 1);
        assert!(stats.primitives >= 60);
        assert_eq!(r.state(), FrameState::Idle);
        assert!(r.on_frame().is_none());
    }

    #[test]
    fn test_offscreen_presented_to_visible() {
        let mut r = renderer(RenderOptions {
            width: 40,
            height: 20,
            ..RenderOptions::default()
        });
        r.queue_render(DrawOp::Custom(Box::new(|ctx| {
            ctx.set_color(Rgba::WHITE);
            ctx.fill_rect(0.0, 0.0, 5.0, 5.0);
        })));
        r.on_frame();
        assert_eq!(r.surface().get(1, 1), Some(Rgba::WHITE));
        assert_eq!(r.surface().get(30, 10), Some(Theme::default().background));
    }

    #[test]
    fn test_direct_mode_draws_visible() {
        let mut r = renderer(RenderOptions {
            width: 40,
            height: 20,
            offscreen: false,
            ..RenderOptions::default()
        });
        r.queue_render(DrawOp::Custom(Box::new(|ctx| {
            ctx.set_color(Rgba::WHITE);
            ctx.fill_rect(0.0, 0.0, 5.0, 5.0);
        })));
        r.on_frame();
        assert_eq!(r.surface().get(1, 1), Some(Rgba::WHITE));
    }

    #[test]
    fn test_zero_size_is_noop() {
        let mut r = renderer(RenderOptions {
            width: 0,
            height: 0,
            ..RenderOptions::default()
        });
        r.queue_chart(&candles(10), &[]);
        let stats = r.on_frame().unwrap();
        assert!(stats.skipped);
        assert_eq!(r.state(), FrameState::Idle);
        assert_eq!(r.pending(), 0);
        assert!(r.surface().is_empty());
    }

    #[test]
    fn test_resize_applies_before_next_flush() {
        let mut r = renderer(RenderOptions {
            width: 10,
            height: 10,
            ..RenderOptions::default()
        });
        r.queue_render(DrawOp::Guidelines);
        r.resize(50, 20, 2.0);
        r.on_frame();
        assert_eq!((r.surface().width(), r.surface().height()), (100, 40));
        assert_eq!(r.projection().viewport.width_px, 50.0);
    }

    #[test]
    fn test_chart_with_overlay() {
        let mut r = renderer(RenderOptions::default());
        let data = candles(50);
        r.fit(&data, Timeframe::Min1);
        let closes: Vec<f64> = data.iter().map(|c| c.close).collect();
        let overlay = TimeSeries::from_values(&closes);
        r.queue_chart(&data, &[&overlay]);
        assert_eq!(r.pending(), 3);

        let stats = r.on_frame().unwrap();
        // guideline pass, two candle colours, one overlay
        assert_eq!(stats.draw.color_switches, 4);
        assert!(!r.text().cache().is_empty());
    }

    #[test]
    fn test_message_replaces_chart() {
        let mut r = renderer(RenderOptions {
            width: 200,
            height: 40,
            ..RenderOptions::default()
        });
        r.queue_message("source unavailable");
        assert_eq!(r.pending(), 1);

        let stats = r.on_frame().unwrap();
        assert_eq!(stats.ops, 1);
        assert_eq!(r.text().cache().len(), 1);
        let text = Theme::default().text;
        let lit = (0..200)
            .flat_map(|x| (0..40).map(move |y| (x, y)))
            .filter(|&(x, y)| r.surface().get(x, y) == Some(text))
            .count();
        assert!(lit > 0);
    }

    #[test]
    fn test_text_cache_is_per_renderer() {
        let mut a = renderer(RenderOptions::default());
        let b = renderer(RenderOptions::default());
        a.queue_render(DrawOp::Text {
            text: "BTCUSDT".into(),
            x: 4.0,
            y: 4.0,
            color: Rgba::WHITE,
            align: TextAlign::Left,
        });
        a.on_frame();
        assert_eq!(a.text().cache().len(), 1);
        assert!(b.text().cache().is_empty());
    }

    #[test]
    fn test_cancel_and_destroy() {
        let mut r = renderer(RenderOptions::default());
        r.queue_render(DrawOp::Guidelines);
        r.cancel();
        assert_eq!(r.clock().cancelled, 1);
        assert!(r.on_frame().is_none());

        r.queue_render(DrawOp::Guidelines);
        r.on_frame();
        r.destroy();
        assert!(r.text().cache().is_empty());
    }
}
