use std::sync::Arc;
use std::time::Duration;

use charter::{ChartController, UpdateKind};
use charter_config::Config;
use charter_core::{Candle, Tick, TickOutcome, Timeframe};
use charter_data::{
    CandleStore, FallbackSource, FetchError, FetchRequest, HistoricalSource, HistoryPage,
    MockSource,
};
use charter_indicators::IndicatorKind;

const MIN: i64 = 60_000;

fn config(capacity: usize) -> Config {
    let mut config = Config::default();
    config.general.default_symbol = "BTCUSDT".into();
    config.general.default_timeframe = Timeframe::Min1;
    config.chart.buffer_capacity = capacity;
    config.chart.indicators = vec![IndicatorKind::Sma { period: 3 }];
    config
}

fn flat(ts: i64, close: f64) -> Candle {
    Candle::new(ts, close, close, close, close, 1.0)
}

fn store(closes: &[f64]) -> Arc<CandleStore> {
    let candles = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| flat(i as i64 * MIN, c))
        .collect();
    Arc::new(CandleStore::new(candles))
}

/// Answers after a per-symbol delay so completions can arrive out of order.
struct SlowSource;

impl HistoricalSource for SlowSource {
    async fn fetch(&self, request: FetchRequest) -> Result<HistoryPage, FetchError> {
        let (delay, close) = if request.symbol == "SLOW" {
            (500, 1.0)
        } else {
            (10, 2.0)
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(HistoryPage::new(vec![flat(0, close)], false))
    }
}

struct Offline;

impl HistoricalSource for Offline {
    async fn fetch(&self, _request: FetchRequest) -> Result<HistoryPage, FetchError> {
        Err(FetchError::unavailable("offline"))
    }
}

#[test]
fn test_tick_stream_builds_two_candles() {
    let mut ctl = ChartController::new(store(&[]), config(1000));
    let ticks = [
        Tick::new("BTCUSDT", 100.0, 1.0, 0),
        Tick::new("BTCUSDT", 101.0, 1.0, 30_000),
        Tick::new("BTCUSDT", 99.5, 1.0, 65_000),
    ];
    for tick in &ticks {
        assert!(ctl.on_tick(tick).unwrap().is_applied());
    }

    let candles = ctl.candles();
    assert_eq!(candles.len(), 2);
    assert_eq!(
        (candles[0].timestamp, candles[0].open, candles[0].high, candles[0].low, candles[0].close),
        (0, 100.0, 101.0, 100.0, 101.0)
    );
    assert_eq!(
        (candles[1].timestamp, candles[1].open, candles[1].high, candles[1].low, candles[1].close),
        (60_000, 99.5, 99.5, 99.5, 99.5)
    );

    // the first candle is closed: a late tick cannot change it
    let before = candles[0];
    let late = ctl.on_tick(&Tick::new("BTCUSDT", 500.0, 1.0, 10_000)).unwrap();
    assert!(!late.is_applied());
    assert_eq!(ctl.candles()[0], before);
}

#[tokio::test]
async fn test_sma_over_loaded_history() {
    let mut ctl = ChartController::new(store(&[10.0, 20.0, 30.0, 40.0]), config(1000));
    assert!(ctl.load("BTCUSDT", Timeframe::Min1, 10).await);

    let sma = &ctl.indicators()["SMA3"];
    assert_eq!(sma.values(), &[None, None, Some(20.0), Some(30.0)]);
    assert_eq!(sma.len(), ctl.candles().len());
}

#[tokio::test]
async fn test_capped_buffer_evicts_and_recomputes() {
    let mut ctl = ChartController::new(store(&[10.0, 20.0, 30.0]), config(3));
    ctl.load("BTCUSDT", Timeframe::Min1, 10).await;
    assert_eq!(ctl.indicators()["SMA3"].values(), &[None, None, Some(20.0)]);

    let outcome = ctl.on_tick(&Tick::new("BTCUSDT", 40.0, 1.0, 3 * MIN)).unwrap();
    assert!(matches!(outcome, TickOutcome::Closed { evicted: 1, .. }));

    let closes: Vec<f64> = ctl.candles().iter().map(|c| c.close).collect();
    assert_eq!(closes, vec![20.0, 30.0, 40.0]);
    assert_eq!(ctl.indicators()["SMA3"].values(), &[None, None, Some(30.0)]);
}

#[tokio::test]
async fn test_minute_history_loaded_as_hours_accepts_live_ticks() {
    let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
    let mut ctl = ChartController::new(store(&closes), config(1000));
    ctl.load("BTCUSDT", Timeframe::Hour1, 10).await;

    let candles = ctl.candles();
    assert_eq!(candles.len(), 1);
    assert_eq!(candles[0].timestamp, 0);
    assert_eq!((candles[0].open, candles[0].close), (100.0, 159.0));

    let outcome = ctl.on_tick(&Tick::new("BTCUSDT", 170.0, 1.0, 59 * MIN + 30_000));
    assert!(matches!(outcome, Some(TickOutcome::Updated { .. })));
    assert_eq!(ctl.candles()[0].high, 170.0);
}

#[tokio::test(start_paused = true)]
async fn test_last_request_wins_with_concurrent_fetches() {
    let source = Arc::new(SlowSource);
    let mut ctl = ChartController::new(Arc::clone(&source), config(1000));

    let slow = ctl.begin_load("SLOW", Timeframe::Min1, 10);
    let fast = ctl.begin_load("FAST", Timeframe::Min1, 10);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    for ticket in [slow, fast] {
        let source = Arc::clone(&source);
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = source.fetch(ticket.request.clone()).await;
            let _ = tx.send((ticket, result));
        });
    }
    drop(tx);

    let mut applied = Vec::new();
    while let Some((ticket, result)) = rx.recv().await {
        applied.push((ticket.request.symbol.clone(), ctl.complete_load(ticket, result)));
    }

    // fast finishes first and is current, slow arrives late and is stale
    assert_eq!(
        applied,
        vec![("FAST".to_string(), true), ("SLOW".to_string(), false)]
    );
    assert_eq!(ctl.symbol(), "FAST");
    assert_eq!(ctl.candles()[0].close, 2.0);
}

#[tokio::test]
async fn test_fetch_failure_falls_back_to_mock() {
    let source = Arc::new(FallbackSource::new(Offline, MockSource::new(100 * MIN), true));
    let mut ctl = ChartController::new(source, config(1000));
    ctl.load("BTCUSDT", Timeframe::Min1, 50).await;

    assert_eq!(ctl.candles().len(), 50);
    assert!(ctl.error().is_none());
    assert!(ctl.has_more());
}

#[tokio::test]
async fn test_fetch_failure_without_fallback_sets_error() {
    let source = Arc::new(FallbackSource::new(Offline, MockSource::new(0), false));
    let mut ctl = ChartController::new(source, config(1000));
    let mut updates = ctl.subscribe();
    ctl.load("BTCUSDT", Timeframe::Min1, 50).await;

    assert!(!ctl.is_loading());
    assert_eq!(ctl.error(), Some("source unavailable: offline"));
    assert_eq!(updates.recv().await.unwrap().kind, UpdateKind::Loading);
    let update = updates.recv().await.unwrap();
    assert_eq!(update.kind, UpdateKind::Error);
    assert!(!update.snapshot.loading);
}

#[tokio::test]
async fn test_load_more_prepends_mock_history() {
    let source = Arc::new(MockSource::new(1_000 * MIN));
    let mut ctl = ChartController::new(source, config(1000));
    ctl.load("BTCUSDT", Timeframe::Min1, 100).await;
    let earliest = ctl.candles()[0].timestamp;

    assert!(ctl.load_more(50).await);
    let candles = ctl.candles();
    assert_eq!(candles.len(), 150);
    assert_eq!(candles[50].timestamp, earliest);
    assert!(candles.windows(2).all(|w| w[1].timestamp - w[0].timestamp == MIN));
    assert_eq!(ctl.indicators()["SMA3"].len(), 150);
}

#[tokio::test]
async fn test_refresh_reissues_same_load() {
    let mut ctl = ChartController::new(store(&[1.0, 2.0, 3.0, 4.0, 5.0]), config(1000));
    ctl.load("BTCUSDT", Timeframe::Min1, 3).await;
    let generation = ctl.generation();

    let ticket = ctl.begin_refresh();
    assert_eq!(ticket.request, FetchRequest::latest("BTCUSDT", Timeframe::Min1, 3));
    assert_eq!(ticket.generation, generation + 1);
    assert!(ctl.is_loading());

    assert!(ctl.refresh().await);
    assert_eq!(ctl.candles().len(), 3);
}

#[tokio::test]
async fn test_subscriber_sees_indicators_on_tick() {
    let mut ctl = ChartController::new(store(&[10.0, 20.0, 30.0]), config(1000));
    ctl.load("BTCUSDT", Timeframe::Min1, 10).await;
    let mut updates = ctl.subscribe();

    ctl.on_tick(&Tick::new("BTCUSDT", 60.0, 1.0, 3 * MIN));
    ctl.on_tick(&Tick::new("ETHUSDT", 1.0, 1.0, 3 * MIN));

    let update = updates.recv().await.unwrap();
    assert_eq!(update.kind, UpdateKind::Tick);
    assert_eq!(update.snapshot.candles.len(), 4);
    assert_eq!(update.snapshot.indicators["SMA3"].last(), Some(&(110.0 / 3.0)));
    assert!(updates.try_recv().is_err());
}
