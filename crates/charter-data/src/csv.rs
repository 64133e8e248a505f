//! CSV history loading.
//!
//! Accepts a header row naming `timestamp`/`time`, `open`, `high`, `low`,
//! `close` and `volume` columns in any order. Timestamps may be unix seconds,
//! unix milliseconds or `YYYY-MM-DD HH:MM:SS` (UTC).

use std::path::{Path, PathBuf};

use anyhow::Context;
use charter_core::Candle;

use crate::source::DataSource;
use crate::validation::sanitize_history;

/// Loads candle data from CSV files.
pub struct CsvLoader {
    path: PathBuf,
}

impl CsvLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DataSource for CsvLoader {
    fn load(&self) -> anyhow::Result<Vec<Candle>> {
        load_candles_from_csv(&self.path)
    }
}

/// Parse a unix timestamp or `YYYY-MM-DD HH:MM:SS` into milliseconds.
///
/// Numeric values below 1e12 are taken as seconds.
pub fn parse_timestamp_ms(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(ts) = s.parse::<f64>() {
        if !ts.is_finite() {
            return None;
        }
        let ms = if ts.abs() < 1e12 { ts * 1000.0 } else { ts };
        return Some(ms.round() as i64);
    }

    let parts: Vec<&str> = s.split(&['-', ' ', ':', 'T']).collect();
    if parts.len() < 6 {
        return None;
    }
    let year: i64 = parts[0].parse().ok()?;
    let month: usize = parts[1].parse().ok()?;
    let day: i64 = parts[2].parse().ok()?;
    let hour: i64 = parts[3].parse().ok()?;
    let min: i64 = parts[4].parse().ok()?;
    let sec: i64 = parts[5].parse().ok()?;
    if !(1..=12).contains(&month) || year < 1970 {
        return None;
    }

    let is_leap = |y: i64| y % 4 == 0 && (y % 100 != 0 || y % 400 == 0);
    let mut days: i64 = (1970..year).map(|y| if is_leap(y) { 366 } else { 365 }).sum();
    const MONTH_DAYS: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];
    days += MONTH_DAYS[month - 1];
    if month > 2 && is_leap(year) {
        days += 1;
    }
    days += day - 1;

    Some(((days * 24 + hour) * 60 + min) * 60_000 + sec * 1000)
}

/// Load candles from a CSV file, dropping malformed rows.
pub fn load_candles_from_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Candle>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("missing CSV header row")?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();
    let column = |name: &str, fallback: usize| {
        headers
            .iter()
            .position(|h| h == name)
            .unwrap_or(fallback)
    };

    let ts_col = headers
        .iter()
        .position(|h| h.contains("timestamp") || h == "time" || h == "date")
        .unwrap_or(0);
    let open_col = column("open", 1);
    let high_col = column("high", 2);
    let low_col = column("low", 3);
    let close_col = column("close", 4);
    let volume_col = column("volume", 5);

    let mut candles = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("bad CSV record {}", line + 2))?;
        let field = |col: usize| record.get(col).unwrap_or("");

        let Some(timestamp) = parse_timestamp_ms(field(ts_col)) else {
            log::warn!("{}: skipping row {} with bad timestamp", path.display(), line + 2);
            continue;
        };
        let number = |col: usize| -> anyhow::Result<f64> {
            field(col)
                .parse::<f64>()
                .with_context(|| format!("row {}: bad number {:?}", line + 2, field(col)))
        };

        candles.push(Candle::new(
            timestamp,
            number(open_col)?,
            number(high_col)?,
            number(low_col)?,
            number(close_col)?,
            number(volume_col).unwrap_or(0.0),
        ));
    }

    let candles = sanitize_history(candles);
    log::info!("loaded {} candles from {}", candles.len(), path.display());
    Ok(candles)
}
