//! Chart data controller.
//!
//! Owns the candle buffer and indicator series for the symbol and timeframe
//! on screen. Historical loads are split into `begin_*` (hand out a
//! [`LoadTicket`]) and [`ChartController::complete_load`] so a host can run
//! the fetch wherever it likes; every ticket carries a generation and only the
//! newest one is applied.

use std::sync::Arc;

use charter_config::{ChartSettings, Config};
use charter_core::{Candle, SeriesAggregator, SeriesKey, Tick, TickOutcome, Timeframe};
use charter_data::{
    align_history, sanitize_history, FetchError, FetchRequest, HistoricalSource, HistoryPage,
};
use charter_indicators::{compute_all, IndicatorKind, IndicatorMap};
use tokio::sync::mpsc;

/// What kind of fetch a ticket stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// Replace the buffer with the newest candles.
    Replace,
    /// Prepend history older than `earliest`.
    Prepend { earliest: i64 },
}

/// An issued fetch. Pass it back to [`ChartController::complete_load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub kind: LoadKind,
    pub request: FetchRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Loading,
    Loaded,
    Prepended,
    Tick,
    Error,
}

/// Chart state as seen by subscribers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSnapshot {
    pub candles: Vec<Candle>,
    pub indicators: IndicatorMap,
    pub loading: bool,
    pub error: Option<String>,
    pub has_more: bool,
}

#[derive(Debug, Clone)]
pub struct ChartUpdate {
    pub kind: UpdateKind,
    pub snapshot: Arc<ChartSnapshot>,
}

pub struct ChartController<S> {
    source: Arc<S>,
    config: Config,
    key: SeriesKey,
    limit: usize,
    series: SeriesAggregator,
    indicator_kinds: Vec<IndicatorKind>,
    indicators: IndicatorMap,
    generation: u64,
    loading: bool,
    error: Option<String>,
    has_more: bool,
    subscribers: Vec<mpsc::UnboundedSender<ChartUpdate>>,
}

impl<S: HistoricalSource> ChartController<S> {
    /// Controller for the configured default symbol and timeframe. Nothing is
    /// fetched until a load is issued.
    pub fn new(source: Arc<S>, config: Config) -> Self {
        let timeframe = config.general.default_timeframe;
        let key = SeriesKey::new(config.general.default_symbol.clone(), timeframe);
        let ChartSettings {
            buffer_capacity,
            indicators,
        } = config.chart_for_timeframe(timeframe);

        Self {
            source,
            limit: config.general.history_limit,
            config,
            key,
            series: SeriesAggregator::new(timeframe, buffer_capacity),
            indicator_kinds: indicators,
            indicators: IndicatorMap::new(),
            generation: 0,
            loading: false,
            error: None,
            has_more: false,
            subscribers: Vec::new(),
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn symbol(&self) -> &str {
        &self.key.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.key.timeframe
    }

    pub fn candles(&self) -> &[Candle] {
        self.series.candles()
    }

    pub fn indicators(&self) -> &IndicatorMap {
        &self.indicators
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn capacity(&self) -> usize {
        self.series.buffer().capacity()
    }

    pub fn snapshot(&self) -> ChartSnapshot {
        ChartSnapshot {
            candles: self.series.candles().to_vec(),
            indicators: self.indicators.clone(),
            loading: self.loading,
            error: self.error.clone(),
            has_more: self.has_more,
        }
    }

    /// Receive a [`ChartUpdate`] after every state change.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ChartUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().filter(|tx| !tx.is_closed()).count()
    }

    /// Start loading the newest `limit` candles, superseding any load in
    /// flight. Switching symbol or timeframe clears the chart immediately.
    pub fn begin_load(&mut self, symbol: &str, timeframe: Timeframe, limit: usize) -> LoadTicket {
        let key = SeriesKey::new(symbol, timeframe);
        if key != self.key {
            let settings = self.config.chart_for_timeframe(timeframe);
            self.series = SeriesAggregator::new(timeframe, settings.buffer_capacity);
            self.indicator_kinds = settings.indicators;
            self.indicators.clear();
            self.has_more = false;
            self.key = key;
        }
        self.limit = limit;

        self.generation += 1;
        self.loading = true;
        self.error = None;
        log::info!(
            "loading {} {} (limit {limit}, generation {})",
            self.key.symbol,
            self.key.timeframe,
            self.generation
        );
        self.publish(UpdateKind::Loading);

        LoadTicket {
            generation: self.generation,
            kind: LoadKind::Replace,
            request: FetchRequest::latest(self.key.symbol.clone(), timeframe, limit),
        }
    }

    /// Start fetching `count` candles older than the earliest buffered one.
    /// `None` while a load is in flight or when nothing is buffered yet.
    pub fn begin_load_more(&mut self, count: usize) -> Option<LoadTicket> {
        if self.loading {
            log::debug!("load_more ignored: load in flight");
            return None;
        }
        let earliest = self.series.buffer().first()?.timestamp;

        self.generation += 1;
        self.loading = true;
        self.publish(UpdateKind::Loading);

        Some(LoadTicket {
            generation: self.generation,
            kind: LoadKind::Prepend { earliest },
            request: FetchRequest::before(
                self.key.symbol.clone(),
                self.key.timeframe,
                earliest,
                count,
            ),
        })
    }

    /// Re-issue the current load with the same parameters.
    pub fn begin_refresh(&mut self) -> LoadTicket {
        let symbol = self.key.symbol.clone();
        self.begin_load(&symbol, self.key.timeframe, self.limit)
    }

    /// Apply a finished fetch. Returns `false` if the ticket was superseded.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<HistoryPage, FetchError>,
    ) -> bool {
        if ticket.generation != self.generation {
            log::debug!(
                "discarding stale load (generation {}, current {})",
                ticket.generation,
                self.generation
            );
            return false;
        }
        self.loading = false;

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                log::error!(
                    "load {} {} failed: {err}",
                    ticket.request.symbol,
                    ticket.request.timeframe
                );
                self.error = Some(err.to_string());
                self.publish(UpdateKind::Error);
                return true;
            }
        };

        let candles = align_history(sanitize_history(page.candles), self.key.timeframe);
        self.has_more = page.has_more;
        self.error = None;

        let kind = match ticket.kind {
            LoadKind::Replace => {
                let received = candles.len();
                let evicted = self.series.seed(candles);
                log::info!(
                    "loaded {received} candles for {} {} ({evicted} over capacity)",
                    self.key.symbol,
                    self.key.timeframe
                );
                UpdateKind::Loaded
            }
            LoadKind::Prepend { earliest } => {
                let older: Vec<Candle> =
                    candles.into_iter().filter(|c| c.timestamp < earliest).collect();
                let added = self.series.prepend(older);
                log::info!("prepended {added} candles to {}", self.key.symbol);
                UpdateKind::Prepended
            }
        };

        self.recompute();
        self.publish(kind);
        true
    }

    /// Fetch and apply the newest `limit` candles.
    pub async fn load(&mut self, symbol: &str, timeframe: Timeframe, limit: usize) -> bool {
        let ticket = self.begin_load(symbol, timeframe, limit);
        let result = self.source.fetch(ticket.request.clone()).await;
        self.complete_load(ticket, result)
    }

    /// Fetch and prepend `count` older candles.
    pub async fn load_more(&mut self, count: usize) -> bool {
        let Some(ticket) = self.begin_load_more(count) else {
            return false;
        };
        let result = self.source.fetch(ticket.request.clone()).await;
        self.complete_load(ticket, result)
    }

    pub async fn refresh(&mut self) -> bool {
        let ticket = self.begin_refresh();
        let result = self.source.fetch(ticket.request.clone()).await;
        self.complete_load(ticket, result)
    }

    /// Fold a live tick into the current candle. Ticks for other symbols are
    /// ignored.
    pub fn on_tick(&mut self, tick: &Tick) -> Option<TickOutcome> {
        if tick.symbol != self.key.symbol {
            return None;
        }

        let outcome = self.series.apply(tick);
        match &outcome {
            TickOutcome::Dropped(reason) => {
                log::debug!("dropped tick at {}: {reason:?}", tick.timestamp);
            }
            _ => {
                self.recompute();
                self.publish(UpdateKind::Tick);
            }
        }
        Some(outcome)
    }

    fn recompute(&mut self) {
        self.indicators = compute_all(&self.indicator_kinds, self.series.candles());
    }

    fn publish(&mut self, kind: UpdateKind) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = Arc::new(self.snapshot());
        self.subscribers.retain(|tx| {
            tx.send(ChartUpdate {
                kind,
                snapshot: Arc::clone(&snapshot),
            })
            .is_ok()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charter_data::MockSource;

    const MIN: i64 = 60_000;

    fn config() -> Config {
        let mut config = Config::default();
        config.general.default_symbol = "BTCUSDT".into();
        config.general.default_timeframe = Timeframe::Min1;
        config.chart.indicators = vec![IndicatorKind::Sma { period: 3 }];
        config
    }

    fn controller() -> ChartController<MockSource> {
        ChartController::new(Arc::new(MockSource::new(100 * MIN)), config())
    }

    fn page(closes: &[f64], start: i64) -> HistoryPage {
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(start + i as i64 * MIN, c, c, c, c, 1.0))
            .collect();
        HistoryPage::new(candles, true)
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut ctl = controller();
        let first = ctl.begin_load("BTCUSDT", Timeframe::Min1, 10);
        let second = ctl.begin_load("BTCUSDT", Timeframe::Min1, 10);

        assert!(ctl.complete_load(second, Ok(page(&[1.0, 2.0], 0))));
        assert!(!ctl.complete_load(first, Ok(page(&[9.0, 9.0, 9.0], 0))));
        assert_eq!(ctl.candles().len(), 2);
        assert!(!ctl.is_loading());
    }

    #[test]
    fn test_sma_scenario() {
        let mut ctl = controller();
        let ticket = ctl.begin_load("BTCUSDT", Timeframe::Min1, 10);
        ctl.complete_load(ticket, Ok(page(&[10.0, 20.0, 30.0, 40.0], 0)));
        let sma = &ctl.indicators()["SMA3"];
        assert_eq!(sma.values(), &[None, None, Some(20.0), Some(30.0)]);
    }

    #[test]
    fn test_unaligned_page_is_resampled() {
        let mut ctl = controller();
        let ticket = ctl.begin_load("BTCUSDT", Timeframe::Min5, 10);
        ctl.complete_load(ticket, Ok(page(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], 0)));

        let candles = ctl.candles();
        let ts: Vec<i64> = candles.iter().map(|c| c.timestamp).collect();
        assert_eq!(ts, vec![0, 5 * MIN]);
        assert_eq!(candles[0].close, 5.0);
        assert_eq!(candles[1].close, 7.0);
        assert_eq!(ctl.indicators()["SMA3"].len(), 2);
    }

    #[test]
    fn test_error_surfaces() {
        let mut ctl = controller();
        let ticket = ctl.begin_load("BTCUSDT", Timeframe::Min1, 10);
        ctl.complete_load(ticket, Err(FetchError::unavailable("down")));
        assert!(!ctl.is_loading());
        assert!(ctl.error().unwrap().contains("down"));
    }

    #[test]
    fn test_load_more_ignored_while_loading_or_empty() {
        let mut ctl = controller();
        assert!(ctl.begin_load_more(5).is_none());
        let _ticket = ctl.begin_load("BTCUSDT", Timeframe::Min1, 10);
        assert!(ctl.begin_load_more(5).is_none());
    }

    #[test]
    fn test_load_more_prepends_older_only() {
        let mut ctl = controller();
        let ticket = ctl.begin_load("BTCUSDT", Timeframe::Min1, 10);
        ctl.complete_load(ticket, Ok(page(&[5.0, 6.0], 10 * MIN)));

        let more = ctl.begin_load_more(5).unwrap();
        assert_eq!(more.kind, LoadKind::Prepend { earliest: 10 * MIN });
        assert_eq!(more.request.to, Some(10 * MIN));
        // page overlaps the buffer at 10m
        ctl.complete_load(more, Ok(page(&[1.0, 2.0, 3.0], 8 * MIN)));

        let ts: Vec<i64> = ctl.candles().iter().map(|c| c.timestamp / MIN).collect();
        assert_eq!(ts, vec![8, 9, 10, 11]);
        assert_eq!(ctl.candles()[2].close, 5.0);
    }

    #[test]
    fn test_load_more_superseded_by_load() {
        let mut ctl = controller();
        let ticket = ctl.begin_load("BTCUSDT", Timeframe::Min1, 10);
        ctl.complete_load(ticket, Ok(page(&[5.0, 6.0], 10 * MIN)));

        let more = ctl.begin_load_more(5).unwrap();
        let reload = ctl.begin_load("BTCUSDT", Timeframe::Min1, 10);
        assert!(!ctl.complete_load(more, Ok(page(&[1.0], 0))));
        assert!(ctl.complete_load(reload, Ok(page(&[7.0], 20 * MIN))));
        assert_eq!(ctl.candles().len(), 1);
    }

    #[test]
    fn test_ticks_for_other_symbols_ignored() {
        let mut ctl = controller();
        let outcome = ctl.on_tick(&Tick::new("ETHUSDT", 1.0, 1.0, 0));
        assert!(outcome.is_none());
        assert!(ctl.candles().is_empty());
    }

    #[test]
    fn test_switching_symbol_clears_chart() {
        let mut ctl = controller();
        let ticket = ctl.begin_load("BTCUSDT", Timeframe::Min1, 10);
        ctl.complete_load(ticket, Ok(page(&[1.0, 2.0, 3.0], 0)));
        let _ = ctl.begin_load("ETHUSDT", Timeframe::Min5, 10);
        assert!(ctl.candles().is_empty());
        assert!(ctl.indicators().is_empty());
        assert_eq!(ctl.symbol(), "ETHUSDT");
        assert_eq!(ctl.timeframe(), Timeframe::Min5);
    }

    #[test]
    fn test_subscribers_pruned() {
        let mut ctl = controller();
        let mut keep = ctl.subscribe();
        let dropped = ctl.subscribe();
        drop(dropped);

        let _ = ctl.begin_load("BTCUSDT", Timeframe::Min1, 10);
        assert_eq!(ctl.subscriber_count(), 1);
        let update = keep.try_recv().unwrap();
        assert_eq!(update.kind, UpdateKind::Loading);
        assert!(update.snapshot.loading);
    }
}
