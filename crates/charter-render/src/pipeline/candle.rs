//! Candle drawing pipeline.

use charter_core::Candle;

use crate::context::DrawContext;
use crate::pipeline::traits::Pipeline;
use crate::surface::Rgba;
use crate::viewport::Projection;

/// Draws candlesticks batched by colour.
///
/// Each pass sets the bullish colour once, strokes every bullish wick as one
/// path and fills the bullish bodies, then does the same for bearish candles
/// with outlined bodies. Two colour changes per pass regardless of count.
#[derive(Debug, Clone)]
pub struct CandlePipeline {
    pub bullish: Rgba,
    pub bearish: Rgba,
    last_pass: CandlePass,
}

/// What the previous [`CandlePipeline::render`] call drew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandlePass {
    pub bullish: usize,
    pub bearish: usize,
    pub culled: usize,
}

impl CandlePipeline {
    pub fn new(bullish: Rgba, bearish: Rgba) -> Self {
        Self {
            bullish,
            bearish,
            last_pass: CandlePass::default(),
        }
    }

    pub fn last_pass(&self) -> CandlePass {
        self.last_pass
    }

    fn draw_batch(
        ctx: &mut DrawContext,
        proj: &Projection,
        candles: &[&Candle],
        filled: bool,
    ) {
        let body_width = proj.viewport.candle_width_px;

        ctx.set_line_width(1.0);
        ctx.begin_path();
        for candle in candles {
            let x = proj.viewport.time_to_x(candle.timestamp);
            ctx.move_to(x, proj.price.price_to_y(candle.high));
            ctx.line_to(x, proj.price.price_to_y(candle.low));
        }
        ctx.stroke();

        for candle in candles {
            let x = proj.viewport.time_to_x(candle.timestamp);
            let open_y = proj.price.price_to_y(candle.open);
            let close_y = proj.price.price_to_y(candle.close);
            let top = open_y.min(close_y);
            let mut height = (open_y - close_y).abs();
            if height == 0.0 {
                height = 1.0;
            }

            let left = x - body_width / 2.0;
            if filled {
                ctx.fill_rect(left, top, body_width, height);
            } else {
                ctx.stroke_rect(left, top, body_width, height);
            }
        }
    }
}

/// Candles whose centre lies within one body width of the visible area.
pub fn cull<'a>(candles: &'a [Candle], proj: &Projection) -> Vec<&'a Candle> {
    let cw = proj.viewport.candle_width_px;
    let right = proj.viewport.width_px;
    candles
        .iter()
        .filter(|c| {
            let x = proj.viewport.time_to_x(c.timestamp);
            x >= -cw && x <= right + cw
        })
        .collect()
}

impl Pipeline for CandlePipeline {
    type Data = [Candle];

    fn render(&mut self, ctx: &mut DrawContext, proj: &Projection, data: &[Candle]) -> usize {
        if ctx.is_zero_sized() {
            self.last_pass = CandlePass::default();
            return 0;
        }

        let visible = cull(data, proj);
        let (up, down): (Vec<&Candle>, Vec<&Candle>) =
            visible.iter().copied().partition(|c| c.close >= c.open);

        ctx.set_color(self.bullish);
        Self::draw_batch(ctx, proj, &up, true);
        ctx.set_color(self.bearish);
        Self::draw_batch(ctx, proj, &down, false);

        self.last_pass = CandlePass {
            bullish: up.len(),
            bearish: down.len(),
            culled: data.len() - visible.len(),
        };
        visible.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::{PriceScale, Viewport};

    const UP: Rgba = Rgba::rgb(0, 200, 0);
    const DOWN: Rgba = Rgba::rgb(200, 0, 0);

    fn projection() -> Projection {
        let mut viewport = Viewport::new(0, 100, 100.0);
        viewport.candle_width_px = 6.0;
        Projection::new(viewport, PriceScale::new(0.0, 100.0, 0.0, 100.0))
    }

    #[test]
    fn test_culls_outside_viewport() {
        let candles = vec![
            Candle::new(-50, 10.0, 20.0, 5.0, 15.0, 1.0),
            Candle::new(-5, 10.0, 20.0, 5.0, 15.0, 1.0),
            Candle::new(50, 10.0, 20.0, 5.0, 15.0, 1.0),
            Candle::new(105, 10.0, 20.0, 5.0, 15.0, 1.0),
            Candle::new(200, 10.0, 20.0, 5.0, 15.0, 1.0),
        ];
        let visible = cull(&candles, &projection());
        let ts: Vec<i64> = visible.iter().map(|c| c.timestamp).collect();
        assert_eq!(ts, vec![-5, 50, 105]);
    }

    #[test]
    fn test_two_color_switches_per_pass() {
        let candles: Vec<Candle> = (0..20)
            .map(|i| {
                let (open, close) = if i % 2 == 0 { (40.0, 60.0) } else { (60.0, 40.0) };
                Candle::new(i * 5, open, 70.0, 30.0, close, 1.0)
            })
            .collect();
        let mut ctx = DrawContext::new(100, 100, 1.0);
        let mut pipeline = CandlePipeline::new(UP, DOWN);

        let drawn = pipeline.render(&mut ctx, &projection(), &candles);

        assert_eq!(drawn, 20);
        assert_eq!(ctx.stats().color_switches, 2);
        assert_eq!(ctx.stats().strokes, 2);
        assert_eq!(pipeline.last_pass(), CandlePass { bullish: 10, bearish: 10, culled: 0 });
    }

    #[test]
    fn test_up_filled_down_outlined() {
        let candles = vec![
            Candle::new(25, 40.0, 70.0, 30.0, 60.0, 1.0),
            Candle::new(75, 60.0, 70.0, 30.0, 40.0, 1.0),
        ];
        let mut ctx = DrawContext::new(100, 100, 1.0);
        CandlePipeline::new(UP, DOWN).render(&mut ctx, &projection(), &candles);

        // body spans y 40..60 around x 25 and x 75
        assert_eq!(ctx.buffer().get(23, 50), Some(UP));
        assert_eq!(ctx.buffer().get(73, 50), Some(Rgba::TRANSPARENT));
        assert_eq!(ctx.buffer().get(72, 40), Some(DOWN));
        // wick
        assert_eq!(ctx.buffer().get(75, 35), Some(DOWN));
    }

    #[test]
    fn test_doji_has_visible_body() {
        let candles = vec![Candle::new(50, 50.0, 60.0, 40.0, 50.0, 1.0)];
        let mut ctx = DrawContext::new(100, 100, 1.0);
        CandlePipeline::new(UP, DOWN).render(&mut ctx, &projection(), &candles);
        assert_eq!(ctx.buffer().get(48, 50), Some(UP));
    }

    #[test]
    fn test_zero_sized_draws_nothing() {
        let candles = vec![Candle::new(50, 50.0, 60.0, 40.0, 55.0, 1.0)];
        let mut ctx = DrawContext::new(0, 0, 1.0);
        let drawn = CandlePipeline::new(UP, DOWN).render(&mut ctx, &projection(), &candles);
        assert_eq!(drawn, 0);
        assert_eq!(ctx.stats().color_switches, 0);
    }
}
