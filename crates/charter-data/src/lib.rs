//! Data collaborators for charter: historical sources, live ticks and validation.

pub mod csv;
pub mod error;
pub mod fallback;
pub mod live;
pub mod mock;
pub mod source;
pub mod validation;

pub use self::csv::{load_candles_from_csv, CsvLoader};
pub use error::FetchError;
pub use fallback::FallbackSource;
pub use live::{TickHub, TickSource, TickSubscription};
pub use mock::{generate_candles, spawn_mock_feed, MockSource, MockTickGenerator};
pub use source::{CandleStore, DataSource, FetchRequest, HistoricalSource, HistoryPage};
pub use validation::{align_history, sanitize_history, validate_candle, validate_tick};
