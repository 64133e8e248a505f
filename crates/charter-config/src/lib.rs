//! Configuration management for charter.
//!
//! Loads configuration from TOML files with support for per-timeframe chart overrides.

use charter_core::{Timeframe, DEFAULT_BUFFER_CAPACITY};
use charter_indicators::IndicatorKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub chart: ChartConfig,
    pub data: DataConfig,
    pub render: RenderConfig,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations.
    ///
    /// Searches in order:
    /// 1. `./config.toml`
    /// 2. `~/.config/charter/config.toml`
    ///
    /// Returns default config if no file found.
    pub fn load_default() -> Self {
        if let Ok(config) = Self::load(Self::default_path()) {
            return config;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("charter").join("config.toml");
            if let Ok(config) = Self::load(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    /// Save configuration to a file path.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.history_limit == 0 {
            return Err(ConfigError::Invalid("general.history_limit must be positive".into()));
        }
        if self.chart.buffer_capacity == 0 {
            return Err(ConfigError::Invalid("chart.buffer_capacity must be positive".into()));
        }
        for kind in &self.chart.indicators {
            kind.validate().map_err(ConfigError::Invalid)?;
        }
        for (tf, tf_override) in &self.chart.timeframes {
            if tf.parse::<Timeframe>().is_err() {
                return Err(ConfigError::Invalid(format!("unknown timeframe override {tf:?}")));
            }
            if tf_override.buffer_capacity == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "chart.timeframes.{tf}.buffer_capacity must be positive"
                )));
            }
            for kind in tf_override.indicators.iter().flatten() {
                kind.validate().map_err(ConfigError::Invalid)?;
            }
        }
        if !(self.render.device_pixel_ratio.is_finite() && self.render.device_pixel_ratio > 0.0) {
            return Err(ConfigError::Invalid("render.device_pixel_ratio must be positive".into()));
        }
        if !(self.render.simplify_tolerance.is_finite() && self.render.simplify_tolerance >= 0.0) {
            return Err(ConfigError::Invalid(
                "render.simplify_tolerance must be non-negative".into(),
            ));
        }
        Ok(())
    }

    /// Get chart settings for a specific timeframe.
    /// Falls back to the base chart settings if the timeframe is not configured.
    pub fn chart_for_timeframe(&self, timeframe: Timeframe) -> ChartSettings {
        let base = ChartSettings {
            buffer_capacity: self.chart.buffer_capacity,
            indicators: self.chart.indicators.clone(),
        };
        self.chart
            .timeframes
            .get(timeframe.label())
            .map(|tf| base.merge(tf))
            .unwrap_or(base)
    }
}

/// General application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Symbol to load on startup.
    pub default_symbol: String,
    /// Timeframe to load on startup.
    pub default_timeframe: Timeframe,
    /// Candles requested by `load`.
    pub history_limit: usize,
    /// Candles requested by `load_more`.
    pub load_more_count: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_symbol: "BTCUSDT".to_string(),
            default_timeframe: Timeframe::Hour1,
            history_limit: 500,
            load_more_count: 200,
        }
    }
}

/// Chart buffer and indicator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Maximum candles kept per series.
    pub buffer_capacity: usize,
    /// Indicators recomputed on every buffer change.
    pub indicators: Vec<IndicatorKind>,
    /// Per-timeframe overrides, keyed by timeframe label.
    pub timeframes: HashMap<String, ChartOverride>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            indicators: IndicatorKind::default_set(),
            timeframes: HashMap::new(),
        }
    }
}

/// Resolved chart settings for one timeframe.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSettings {
    pub buffer_capacity: usize,
    pub indicators: Vec<IndicatorKind>,
}

impl ChartSettings {
    /// Merge with an override, using override values where present.
    pub fn merge(&self, override_config: &ChartOverride) -> Self {
        Self {
            buffer_capacity: override_config.buffer_capacity.unwrap_or(self.buffer_capacity),
            indicators: override_config
                .indicators
                .clone()
                .unwrap_or_else(|| self.indicators.clone()),
        }
    }
}

/// Chart override (all fields optional for partial overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartOverride {
    pub buffer_capacity: Option<usize>,
    pub indicators: Option<Vec<IndicatorKind>>,
}

/// Data source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Serve deterministic mock history when the primary source fails.
    /// Disable in production.
    pub mock_fallback: bool,
    /// Tick hub topic the controller subscribes to.
    pub tick_topic: String,
    /// Optional CSV file used as the primary historical source.
    pub csv_path: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            mock_fallback: true,
            tick_topic: "market".to_string(),
            csv_path: None,
        }
    }
}

/// Render pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Surface width in CSS pixels.
    pub width: u32,
    /// Surface height in CSS pixels.
    pub height: u32,
    pub device_pixel_ratio: f64,
    /// Draw into an off-screen buffer and blit once per frame.
    pub offscreen: bool,
    /// Douglas-Peucker tolerance in pixels for overlay lines.
    pub simplify_tolerance: f64,
    /// Maximum cached text labels.
    pub text_cache_capacity: usize,
    /// Frame clock period in milliseconds.
    pub frame_interval_ms: u64,
    /// Where the demo writes its PPM snapshot.
    /// Defaults to ~/.local/share/charter/snapshot.ppm
    pub snapshot_path: Option<PathBuf>,
    pub colors: ColorConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
            device_pixel_ratio: 1.0,
            offscreen: true,
            simplify_tolerance: 0.5,
            text_cache_capacity: 100,
            frame_interval_ms: 16,
            snapshot_path: None,
            colors: ColorConfig::default(),
        }
    }
}

impl RenderConfig {
    /// Get the snapshot path, using default if not specified.
    pub fn get_snapshot_path(&self) -> PathBuf {
        self.snapshot_path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("charter")
                .join("snapshot.ppm")
        })
    }
}

/// Chart colours as RGB triples.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub background: [u8; 3],
    pub grid: [u8; 3],
    pub text: [u8; 3],
    pub bullish: [u8; 3],
    pub bearish: [u8; 3],
    /// Cycled across overlay indicator lines.
    pub lines: Vec<[u8; 3]>,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            background: [19, 23, 34],
            grid: [42, 46, 57],
            text: [209, 212, 220],
            bullish: [38, 166, 154],
            bearish: [239, 83, 80],
            lines: vec![[41, 98, 255], [255, 152, 0], [156, 39, 176], [0, 188, 212]],
        }
    }
}
