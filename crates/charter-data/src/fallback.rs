//! Primary/fallback source composition.

use crate::error::FetchError;
use crate::source::{FetchRequest, HistoricalSource, HistoryPage};

/// Serves from `primary`, switching to `fallback` on error when enabled.
///
/// There is no retry loop: one primary attempt, then at most one fallback.
#[derive(Debug, Clone)]
pub struct FallbackSource<P, F> {
    primary: P,
    fallback: F,
    enabled: bool,
}

impl<P, F> FallbackSource<P, F> {
    pub fn new(primary: P, fallback: F, enabled: bool) -> Self {
        Self {
            primary,
            fallback,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl<P: HistoricalSource, F: HistoricalSource> HistoricalSource for FallbackSource<P, F> {
    async fn fetch(&self, request: FetchRequest) -> Result<HistoryPage, FetchError> {
        match self.primary.fetch(request.clone()).await {
            Ok(page) => Ok(page),
            Err(err) if self.enabled => {
                log::warn!(
                    "fetch {} {} failed ({err}); serving fallback data",
                    request.symbol,
                    request.timeframe
                );
                self.fallback.fetch(request).await
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSource;
    use charter_core::Timeframe;

    struct Down;

    impl HistoricalSource for Down {
        async fn fetch(&self, _request: FetchRequest) -> Result<HistoryPage, FetchError> {
            Err(FetchError::unavailable("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_falls_back_when_enabled() {
        let source = FallbackSource::new(Down, MockSource::new(600_000), true);
        let page = source
            .fetch(FetchRequest::latest("BTCUSDT", Timeframe::Min1, 5))
            .await
            .unwrap();
        assert_eq!(page.candles.len(), 5);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn test_surfaces_error_when_disabled() {
        let source = FallbackSource::new(Down, MockSource::new(600_000), false);
        let err = source
            .fetch(FetchRequest::latest("BTCUSDT", Timeframe::Min1, 5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
