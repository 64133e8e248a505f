//! Traits for chart drawing pipelines.
//!
//! This module defines the [`Pipeline`] trait which provides a common interface
//! for all drawing pipelines in the charter-render crate.

use crate::context::DrawContext;
use crate::viewport::Projection;

/// A trait for chart drawing pipelines.
///
/// Every chart element (candles, indicator lines, guidelines) is drawn by a
/// pipeline that turns its input data into draw calls on a [`DrawContext`].
/// Pipelines hold only style state, never chart data, so one instance serves
/// every frame.
///
/// # Type Parameters
///
/// * `Data` - The borrowed input the pipeline draws, for example a candle
///   slice for [`CandlePipeline`](super::CandlePipeline).
///
/// # Example
///
/// ```ignore
/// impl Pipeline for CandlePipeline {
///     type Data = [Candle];
///
///     fn render(&mut self, ctx: &mut DrawContext, proj: &Projection, data: &[Candle]) -> usize {
///         let visible = cull(data, proj);
///         draw_batches(ctx, &visible);
///         visible.len()
///     }
/// }
/// ```
pub trait Pipeline {
    /// The input this pipeline draws.
    type Data: ?Sized;

    /// Draws `data` into `ctx` using `proj` to map values to pixels.
    ///
    /// Returns the number of primitives (candles, points, lines) that survived
    /// culling and were drawn. A zero-sized context draws nothing and
    /// returns 0.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The draw target, in logical pixels
    /// * `proj` - Time and price projection for the chart area
    /// * `data` - The pipeline-specific input
    fn render(&mut self, ctx: &mut DrawContext, proj: &Projection, data: &Self::Data) -> usize;
}
