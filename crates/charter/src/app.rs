//! Headless application: wires config, data sources, the controller and the
//! renderer together and drives them from one tokio task.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use charter_config::{ColorConfig, Config, DataConfig, RenderConfig};
use charter_core::{Tick, Timeframe};
use charter_data::{
    load_candles_from_csv, spawn_mock_feed, CandleStore, FallbackSource, FetchError,
    FetchRequest, HistoricalSource, HistoryPage, MockSource, MockTickGenerator, TickHub,
    TickSource, TickSubscription,
};
use charter_indicators::{find_double_tops_bottoms, IndicatorKind};
use charter_render::{ChartRenderer, FrameClock, FrameStats, RenderOptions, Rgba, Theme};

use crate::controller::{ChartController, ChartUpdate, LoadTicket, UpdateKind};

/// Ticks generated per candle by the demo feed.
const TICKS_PER_CANDLE: i64 = 20;
/// Ticks published before the demo stops.
const DEMO_TICKS: usize = 120;
const DEMO_TICK_INTERVAL: Duration = Duration::from_millis(5);

/// Where history comes from before any fallback.
#[derive(Debug, Clone)]
pub enum PrimarySource {
    /// Candles loaded from a CSV file up front.
    Csv(CandleStore),
    /// No primary configured. Every fetch fails.
    Offline,
}

impl HistoricalSource for PrimarySource {
    async fn fetch(&self, request: FetchRequest) -> Result<HistoryPage, FetchError> {
        match self {
            PrimarySource::Csv(store) => store.fetch(request).await,
            PrimarySource::Offline => Err(FetchError::unavailable(
                "no primary history source configured",
            )),
        }
    }
}

pub type AppSource = FallbackSource<PrimarySource, MockSource>;

/// Build the history source described by `[data]`. `now_ms` anchors the
/// mock fallback.
pub fn build_source(config: &DataConfig, now_ms: i64) -> Result<AppSource> {
    let primary = match &config.csv_path {
        Some(path) => {
            let candles = load_candles_from_csv(path)
                .with_context(|| format!("Failed to load history from {}", path.display()))?;
            log::info!("Loaded {} candles from {}", candles.len(), path.display());
            PrimarySource::Csv(CandleStore::new(candles))
        }
        None => PrimarySource::Offline,
    };
    Ok(FallbackSource::new(
        primary,
        MockSource::new(now_ms),
        config.mock_fallback,
    ))
}

pub fn theme_from_config(colors: &ColorConfig) -> Theme {
    let defaults = Theme::default();
    Theme {
        background: Rgba::from_rgb(colors.background),
        grid: Rgba::from_rgb(colors.grid),
        text: Rgba::from_rgb(colors.text),
        bullish: Rgba::from_rgb(colors.bullish),
        bearish: Rgba::from_rgb(colors.bearish),
        lines: if colors.lines.is_empty() {
            defaults.lines
        } else {
            colors.lines.iter().copied().map(Rgba::from_rgb).collect()
        },
    }
}

pub fn render_options(config: &RenderConfig) -> RenderOptions {
    RenderOptions {
        width: config.width,
        height: config.height,
        device_pixel_ratio: config.device_pixel_ratio,
        offscreen: config.offscreen,
        simplify_tolerance: config.simplify_tolerance,
        text_cache_capacity: config.text_cache_capacity,
    }
}

/// Names of the overlay series produced by `kinds`.
pub fn overlay_names(kinds: &[IndicatorKind]) -> Vec<String> {
    kinds
        .iter()
        .filter(|k| k.is_overlay())
        .flat_map(|k| k.output_names())
        .collect()
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Frame clock for the main loop: a request is remembered until the next
/// interval tick takes it.
#[derive(Debug, Default)]
pub struct IntervalClock {
    pending: bool,
}

impl IntervalClock {
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

impl FrameClock for IntervalClock {
    fn request_frame(&mut self) {
        self.pending = true;
    }

    fn cancel_frame(&mut self) {
        self.pending = false;
    }
}

/// Messages sent from spawned tasks to the main loop.
pub enum BackgroundMessage {
    HistoryLoaded {
        ticket: LoadTicket,
        result: Result<HistoryPage, FetchError>,
    },
}

pub struct App<S> {
    config: Config,
    controller: ChartController<S>,
    renderer: ChartRenderer<IntervalClock>,
    updates: mpsc::UnboundedReceiver<ChartUpdate>,
    bg_sender: mpsc::UnboundedSender<BackgroundMessage>,
    bg_receiver: mpsc::UnboundedReceiver<BackgroundMessage>,
    fitted: bool,
    requested_more: bool,
}

impl<S: HistoricalSource + 'static> App<S> {
    pub fn new(config: Config, source: Arc<S>) -> Self {
        let mut controller = ChartController::new(source, config.clone());
        let updates = controller.subscribe();
        let renderer = ChartRenderer::new(
            render_options(&config.render),
            theme_from_config(&config.render.colors),
            IntervalClock::default(),
        );
        let (bg_sender, bg_receiver) = mpsc::unbounded_channel();

        Self {
            config,
            controller,
            renderer,
            updates,
            bg_sender,
            bg_receiver,
            fitted: false,
            requested_more: false,
        }
    }

    pub fn controller(&self) -> &ChartController<S> {
        &self.controller
    }

    pub fn renderer(&self) -> &ChartRenderer<IntervalClock> {
        &self.renderer
    }

    /// Run the fetch for `ticket` on a spawned task.
    fn spawn_fetch(&self, ticket: LoadTicket) {
        let source = Arc::clone(self.controller.source());
        let sender = self.bg_sender.clone();
        tokio::spawn(async move {
            let result = source.fetch(ticket.request.clone()).await;
            let generation = ticket.generation;
            if sender
                .send(BackgroundMessage::HistoryLoaded { ticket, result })
                .is_err()
            {
                log::debug!("app gone, dropping fetch result (generation {generation})");
            }
        });
    }

    /// Load the configured default symbol and timeframe.
    pub fn request_load(&mut self) {
        let general = &self.config.general;
        let (symbol, timeframe, limit) = (
            general.default_symbol.clone(),
            general.default_timeframe,
            general.history_limit,
        );
        let ticket = self.controller.begin_load(&symbol, timeframe, limit);
        self.fitted = false;
        self.spawn_fetch(ticket);
    }

    pub fn request_load_more(&mut self) -> bool {
        match self.controller.begin_load_more(self.config.general.load_more_count) {
            Some(ticket) => {
                self.spawn_fetch(ticket);
                true
            }
            None => false,
        }
    }

    /// Process any finished fetches. Returns true if one was applied.
    pub fn process_background_messages(&mut self) -> bool {
        let mut applied = false;
        while let Ok(msg) = self.bg_receiver.try_recv() {
            match msg {
                BackgroundMessage::HistoryLoaded { ticket, result } => {
                    applied |= self.controller.complete_load(ticket, result);
                }
            }
        }
        applied
    }

    pub fn on_tick(&mut self, tick: &Tick) {
        self.controller.on_tick(tick);
    }

    /// Turn the newest chart update into draw ops.
    pub fn process_updates(&mut self) {
        let mut latest = None;
        while let Ok(update) = self.updates.try_recv() {
            if update.kind == UpdateKind::Error {
                if let Some(err) = &update.snapshot.error {
                    log::error!("chart error: {err}");
                }
            }
            if update.kind != UpdateKind::Loading {
                latest = Some(update);
            }
        }
        let Some(update) = latest else {
            return;
        };

        let snapshot = &update.snapshot;
        if let Some(err) = &snapshot.error {
            self.renderer.queue_message(err);
            return;
        }

        let timeframe = self.controller.timeframe();
        if update.kind == UpdateKind::Loaded {
            for found in find_double_tops_bottoms(&snapshot.candles) {
                log::info!(
                    "{:?} over candles {}..={} (confidence {:.2})",
                    found.pattern,
                    found.start,
                    found.end,
                    found.confidence
                );
            }
        }
        match update.kind {
            UpdateKind::Loaded | UpdateKind::Prepended if !self.fitted => {
                self.renderer.fit(&snapshot.candles, timeframe);
                self.fitted = !snapshot.candles.is_empty();
            }
            UpdateKind::Tick => {
                let last = snapshot.candles.last().map(|c| c.timestamp);
                self.follow_latest(last, timeframe);
            }
            _ => {}
        }

        let kinds = self.config.chart_for_timeframe(timeframe).indicators;
        let names = overlay_names(&kinds);
        let overlays: Vec<_> = names
            .iter()
            .filter_map(|name| snapshot.indicators.get(name))
            .collect();
        self.renderer.queue_chart(&snapshot.candles, &overlays);

        if snapshot.has_more && !self.requested_more && self.fitted {
            self.requested_more = self.request_load_more();
        }
    }

    /// Pan so a newly opened candle keeps the half-bucket right margin `fit` leaves.
    fn follow_latest(&mut self, last: Option<i64>, timeframe: Timeframe) {
        let Some(last) = last else {
            return;
        };
        let width = timeframe.millis();
        let viewport = self.renderer.viewport_mut();
        let overflow = last + width / 2 - viewport.right;
        if overflow > 0 {
            viewport.pan(overflow);
        }
    }

    /// Flush if a frame was requested since the last tick.
    pub fn on_frame(&mut self) -> Option<FrameStats> {
        if !self.renderer.clock_mut().take() {
            return None;
        }
        let stats = self.renderer.on_frame()?;
        log::debug!(
            "frame: {} ops, {} primitives, {} colour switches",
            stats.ops,
            stats.primitives,
            stats.draw.color_switches
        );
        Some(stats)
    }

    /// Drive the app until the tick feed finishes and everything is drawn.
    pub async fn run(&mut self, mut ticks: TickSubscription, mut feed: JoinHandle<()>) -> Result<()> {
        let interval = Duration::from_millis(self.config.render.frame_interval_ms.max(1));
        let mut frame_timer = tokio::time::interval(interval);
        let mut feed_running = true;
        let mut ticks_open = true;
        let mut frames = 0u64;

        self.request_load();

        loop {
            tokio::select! {
                tick = ticks.recv(), if ticks_open => match tick {
                    Some(tick) => self.on_tick(&tick),
                    None => ticks_open = false,
                },
                joined = &mut feed, if feed_running => {
                    joined.context("Tick feed task failed")?;
                    feed_running = false;
                }
                _ = frame_timer.tick() => {
                    self.process_background_messages();
                    self.process_updates();
                    if self.on_frame().is_some() {
                        frames += 1;
                    }

                    let idle = !self.controller.is_loading() && self.renderer.pending() == 0;
                    if !feed_running && idle {
                        break;
                    }
                }
            }
        }

        // ticks still buffered in the subscription
        while let Some(tick) = ticks.try_recv() {
            self.on_tick(&tick);
        }
        self.process_updates();
        if self.on_frame().is_some() {
            frames += 1;
        }

        log::info!(
            "drew {frames} frames, {} candles, {} cached labels",
            self.controller.candles().len(),
            self.renderer.text().cache().len()
        );
        Ok(())
    }

    /// Write the visible surface as a PPM image.
    pub fn write_snapshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create snapshot {}", path.display()))?;
        self.renderer
            .surface()
            .write_ppm(BufWriter::new(file))
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        log::info!("Snapshot written to {}", path.display());
        Ok(())
    }
}

/// Full demo: history (CSV or mock), a mock tick feed, rendering and a
/// snapshot of the final frame.
pub async fn run_demo(config: Config) -> Result<()> {
    let now = now_ms();
    let source = Arc::new(build_source(&config.data, now)?);

    let symbol = config.general.default_symbol.clone();
    let timeframe = config.general.default_timeframe;
    let topic = config.data.tick_topic.clone();

    let hub = TickHub::new();
    let ticks = hub.subscribe(&topic);
    let generator = MockTickGenerator::new(
        symbol,
        timeframe,
        now,
        (timeframe.millis() / TICKS_PER_CANDLE).max(1),
    );
    let feed = spawn_mock_feed(hub, topic, generator, DEMO_TICK_INTERVAL, DEMO_TICKS);

    let snapshot_path = config.render.get_snapshot_path();
    let mut app = App::new(config, source);
    app.run(ticks, feed).await?;
    app.write_snapshot(&snapshot_path)
}
