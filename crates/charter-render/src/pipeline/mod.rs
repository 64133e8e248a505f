//! Drawing pipeline modules.

pub mod candle;
pub mod guideline;
pub mod indicator;
pub mod traits;

pub use candle::{cull, CandlePass, CandlePipeline};
pub use guideline::{format_price, guideline_levels, nice_step, GuidelinePipeline};
pub use indicator::{line_points, IndicatorPipeline, LinePoint};
pub use traits::Pipeline;
