//! Charter - candlestick charting with live ticks and indicators.
//!
//! The library half holds the chart data controller and the headless app
//! wiring; `main.rs` only loads config and starts the runtime.

pub mod app;
pub mod controller;

pub use app::{build_source, run_demo, App, AppSource, IntervalClock, PrimarySource};
pub use controller::{
    ChartController, ChartSnapshot, ChartUpdate, LoadKind, LoadTicket, UpdateKind,
};
