//! Error types for historical data sources.

use thiserror::Error;

/// Errors a [`HistoricalSource`](crate::HistoricalSource) can report.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("failed to decode history: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to load history: {0}")]
    Load(#[from] anyhow::Error),
}

impl FetchError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        FetchError::Unavailable(msg.into())
    }
}
