//! Indicator line drawing pipeline.

use charter_core::{Candle, TimeSeries};

use crate::context::DrawContext;
use crate::pipeline::traits::Pipeline;
use crate::simplify::{simplify_path, Point};
use crate::surface::Rgba;
use crate::viewport::Projection;
use crate::DEFAULT_SIMPLIFY_TOLERANCE;

/// One sample of an overlay line. `None` breaks the line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePoint {
    pub timestamp: i64,
    pub value: Option<f64>,
}

/// Pair an indicator series with the timestamps of the candles it was
/// computed from. Extra entries on either side are ignored.
pub fn line_points(candles: &[Candle], series: &TimeSeries<f64>) -> Vec<LinePoint> {
    candles
        .iter()
        .zip(series.values())
        .map(|(c, v)| LinePoint {
            timestamp: c.timestamp,
            value: *v,
        })
        .collect()
}

/// Points inside `[left, right]` plus one neighbour on each side so the line
/// reaches the surface edges. `points` must be ordered by timestamp.
fn visible(points: &[LinePoint], left: i64, right: i64) -> &[LinePoint] {
    let start = points
        .partition_point(|p| p.timestamp < left)
        .saturating_sub(1);
    let end = (points.partition_point(|p| p.timestamp <= right) + 1).min(points.len());
    if start >= end {
        return &[];
    }
    &points[start..end]
}

/// Split into runs of defined values.
fn runs(points: &[LinePoint]) -> impl Iterator<Item = &[LinePoint]> {
    points
        .split(|p| p.value.map_or(true, |v| !v.is_finite()))
        .filter(|run| !run.is_empty())
}

/// Strokes a line per run of defined values, simplified before drawing.
#[derive(Debug, Clone)]
pub struct IndicatorPipeline {
    pub color: Rgba,
    pub line_width: f64,
    pub tolerance: f64,
}

impl IndicatorPipeline {
    pub fn new(color: Rgba) -> Self {
        Self {
            color,
            line_width: 1.5,
            tolerance: DEFAULT_SIMPLIFY_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.max(0.0);
        self
    }
}

impl Pipeline for IndicatorPipeline {
    type Data = [LinePoint];

    fn render(&mut self, ctx: &mut DrawContext, proj: &Projection, data: &[LinePoint]) -> usize {
        if ctx.is_zero_sized() {
            return 0;
        }

        ctx.set_color(self.color);
        ctx.set_line_width(self.line_width);
        ctx.begin_path();

        let mut drawn = 0;
        let data = visible(data, proj.viewport.left, proj.viewport.right);
        for run in runs(data) {
            let projected: Vec<Point> = run
                .iter()
                .filter_map(|p| {
                    let (x, y) = proj.project(p.timestamp, p.value?);
                    Some(Point::new(x, y))
                })
                .collect();
            let path = if projected.len() >= 2 {
                simplify_path(&projected, self.tolerance)
            } else {
                projected
            };

            let Some((first, rest)) = path.split_first() else {
                continue;
            };
            ctx.move_to(first.x, first.y);
            if rest.is_empty() {
                // lone value, draw a dot
                ctx.line_to(first.x, first.y);
            }
            for p in rest {
                ctx.line_to(p.x, p.y);
            }
            drawn += path.len();
        }

        ctx.stroke();
        drawn
    }
}
