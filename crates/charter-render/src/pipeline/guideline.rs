//! Horizontal price guidelines with labels.

use crate::context::DrawContext;
use crate::pipeline::traits::Pipeline;
use crate::surface::Rgba;
use crate::text::{Font, TextAlign, TextRenderer};
use crate::viewport::{PriceScale, Projection};
use crate::{MAX_GUIDELINES, TARGET_GUIDELINES};

/// Round step close to `range / target` of the form 1, 2 or 5 times a power of ten.
pub fn nice_step(range: f64, target: usize) -> Option<f64> {
    if !range.is_finite() || range <= 0.0 || target == 0 {
        return None;
    }
    let raw_step = range / target as f64;
    let magnitude = 10f64.powf(raw_step.log10().floor());
    let normalized = raw_step / magnitude;
    let step = if normalized < 1.5 {
        magnitude
    } else if normalized < 3.5 {
        2.0 * magnitude
    } else if normalized < 7.5 {
        5.0 * magnitude
    } else {
        10.0 * magnitude
    };
    Some(step)
}

/// Guideline prices inside the scale, lowest first.
pub fn guideline_levels(scale: &PriceScale) -> (Vec<f64>, f64) {
    let Some(step) = nice_step(scale.range(), TARGET_GUIDELINES) else {
        return (Vec::new(), 0.0);
    };

    let mut levels = Vec::with_capacity(MAX_GUIDELINES);
    let mut i = (scale.min / step).ceil();
    loop {
        // multiply rather than accumulate so labels stay exact
        let y = i * step;
        if y >= scale.max || levels.len() >= MAX_GUIDELINES {
            break;
        }
        levels.push(y);
        i += 1.0;
    }
    (levels, step)
}

/// Label text with as many decimals as the step needs.
pub fn format_price(price: f64, step: f64) -> String {
    let decimals = if step > 0.0 && step < 1.0 {
        (-step.log10().floor()) as usize
    } else {
        0
    };
    format!("{:.*}", decimals.min(8), price)
}

#[derive(Debug, Clone)]
pub struct GuidelinePipeline {
    pub line_color: Rgba,
    pub label_color: Rgba,
    pub font: Font,
}

impl GuidelinePipeline {
    pub fn new(line_color: Rgba, label_color: Rgba) -> Self {
        Self {
            line_color,
            label_color,
            font: Font::default(),
        }
    }

    /// Right-aligned price labels just above each line.
    pub fn draw_labels(
        &self,
        ctx: &mut DrawContext,
        text: &mut TextRenderer,
        proj: &Projection,
        levels: &[f64],
        step: f64,
    ) {
        let right = ctx.css_width() as f64 - 4.0;
        let lift = self.font.size_px as f64 + 2.0;
        for &price in levels {
            let y = proj.price.price_to_y(price) - lift;
            let label = format_price(price, step);
            text.draw(ctx, &label, right, y, self.font, self.label_color, TextAlign::Right);
        }
    }
}

impl Pipeline for GuidelinePipeline {
    type Data = [f64];

    fn render(&mut self, ctx: &mut DrawContext, proj: &Projection, levels: &[f64]) -> usize {
        if ctx.is_zero_sized() || levels.is_empty() {
            return 0;
        }
        let width = ctx.css_width() as f64;
        ctx.set_color(self.line_color);
        ctx.set_line_width(1.0);
        ctx.begin_path();
        for &price in levels {
            let y = proj.price.price_to_y(price).round();
            ctx.move_to(0.0, y);
            ctx.line_to(width, y);
        }
        ctx.stroke();
        levels.len()
    }
}
