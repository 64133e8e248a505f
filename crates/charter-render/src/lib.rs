//! Software chart rendering for charter.
//!
//! Draw ops are queued on a [`ChartRenderer`] and flushed together when the
//! host's [`FrameClock`] fires. Pixels live in plain RGBA buffers so a host
//! can present them however it likes.

pub mod context;
pub mod pipeline;
pub mod renderer;
pub mod scheduler;
pub mod simplify;
pub mod surface;
pub mod text;
pub mod viewport;

pub use context::{device_size, DrawContext, DrawStats};
pub use pipeline::{
    cull, format_price, guideline_levels, line_points, nice_step, CandlePass, CandlePipeline,
    GuidelinePipeline, IndicatorPipeline, LinePoint, Pipeline,
};
pub use renderer::{ChartRenderer, DrawOp, FrameStats, RenderOptions, Theme};
pub use scheduler::{FrameClock, FrameScheduler, FrameState, ManualClock};
pub use simplify::{perpendicular_distance, simplify_path, Point};
pub use surface::{PixelBuffer, Rgba};
pub use text::{DotMatrixGlyphs, Font, GlyphRasterizer, TextAlign, TextCache, TextKey, TextRenderer};
pub use viewport::{PriceScale, Projection, Viewport};

/// Constants for candle rendering.
pub const BASE_CANDLE_WIDTH: f64 = 0.8;
pub const MIN_CANDLE_PIXELS: f64 = 3.0; // Minimum candle width in pixels

/// Douglas-Peucker tolerance for overlay lines, in logical pixels.
pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 0.5;
pub const TEXT_CACHE_CAPACITY: usize = 100;

/// Guideline density.
pub const TARGET_GUIDELINES: usize = 8;
pub const MAX_GUIDELINES: usize = 32;
