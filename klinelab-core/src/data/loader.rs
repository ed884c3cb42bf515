//! Cached CSV loader and normalizer.
//!
//! Merges every daily file for a pair into one [`Series`]:
//! timestamps are normalized to microseconds per value, duplicate
//! `open_time`s keep their first occurrence (file-name order), unparsable
//! numeric cells become `NaN`, and the result is sorted ascending.

use super::cache::KlineCache;
use super::provider::DataError;
use crate::domain::{Bar, Interval, Series};
use std::collections::HashSet;
use std::path::Path;

/// Column order of the cached headerless CSV files.
pub const KLINE_COLUMNS: [&str; 12] = [
    "open_time",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "close_time",
    "quote_asset_volume",
    "number_of_trades",
    "taker_buy_base_asset_volume",
    "taker_buy_quote_asset_volume",
    "ignore",
];

const MICROS_THRESHOLD: u64 = 1_000_000_000_000_000; // 10^15
const MILLIS_THRESHOLD: u64 = 1_000_000_000_000; // 10^12

/// Interpret a raw timestamp of unknown unit as microseconds.
///
/// `> 10^15` is already µs, `(10^12, 10^15]` is ms, anything smaller is seconds.
pub fn normalize_timestamp_us(raw: i64) -> i64 {
    let magnitude = raw.unsigned_abs();
    if magnitude > MICROS_THRESHOLD {
        raw
    } else if magnitude > MILLIS_THRESHOLD {
        raw.saturating_mul(1_000)
    } else {
        raw.saturating_mul(1_000_000)
    }
}

/// One raw cached row after numeric coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kline {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: Option<i64>,
    pub quote_asset_volume: f64,
    pub number_of_trades: f64,
    pub taker_buy_base_asset_volume: f64,
    pub taker_buy_quote_asset_volume: f64,
}

impl Kline {
    pub fn to_bar(&self) -> Bar {
        Bar {
            open_time: self.open_time,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

/// A cell as trimmed text; invalid UTF-8 reads as absent.
fn cell_text(cell: Option<&[u8]>) -> Option<&str> {
    cell.and_then(|bytes| std::str::from_utf8(bytes).ok())
        .map(str::trim)
}

fn parse_f64(cell: Option<&[u8]>) -> f64 {
    cell_text(cell)
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

fn parse_timestamp(cell: Option<&[u8]>) -> Option<i64> {
    let s = cell_text(cell)?;
    let raw = match s.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let f = s.parse::<f64>().ok()?;
            if !f.is_finite() {
                return None;
            }
            f.round() as i64
        }
    };
    Some(normalize_timestamp_us(raw))
}

/// Coerce one CSV record. Returns `None` when `open_time` is unparsable.
///
/// Records are read as raw bytes so a cell with invalid UTF-8 becomes `NaN`
/// instead of failing the whole file.
pub fn parse_record(record: &csv::ByteRecord) -> Option<Kline> {
    let open_time = parse_timestamp(record.get(0))?;
    Some(Kline {
        open_time,
        open: parse_f64(record.get(1)),
        high: parse_f64(record.get(2)),
        low: parse_f64(record.get(3)),
        close: parse_f64(record.get(4)),
        volume: parse_f64(record.get(5)),
        close_time: parse_timestamp(record.get(6)),
        quote_asset_volume: parse_f64(record.get(7)),
        number_of_trades: parse_f64(record.get(8)),
        taker_buy_base_asset_volume: parse_f64(record.get(9)),
        taker_buy_quote_asset_volume: parse_f64(record.get(10)),
    })
}

/// Counters from one load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub files: usize,
    pub rows: usize,
    pub duplicates: usize,
    /// Rows without a usable `open_time` (stray headers, garbage lines).
    pub dropped: usize,
    /// Rows with at least one missing OHLC value.
    pub void_bars: usize,
}

/// Read every raw row from one file.
pub fn read_klines(path: &Path) -> Result<(Vec<Kline>, usize), DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| DataError::Csv {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut rows = Vec::new();
    let mut dropped = 0;
    for record in reader.byte_records() {
        let record = record.map_err(|e| DataError::Csv {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        match parse_record(&record) {
            Some(k) => rows.push(k),
            None => dropped += 1,
        }
    }
    Ok((rows, dropped))
}

/// Load and normalize all cached files for `(symbol, interval)`.
pub fn load(symbol: &str, interval: Interval, cache_dir: &Path) -> Result<Series, DataError> {
    load_with_report(symbol, interval, cache_dir).map(|(series, _)| series)
}

pub fn load_with_report(
    symbol: &str,
    interval: Interval,
    cache_dir: &Path,
) -> Result<(Series, LoadReport), DataError> {
    let files = KlineCache::new(cache_dir).cached_files(symbol, interval)?;
    if files.is_empty() {
        return Err(DataError::NoCachedData {
            symbol: symbol.to_string(),
            interval,
            dir: cache_dir.to_path_buf(),
        });
    }

    let mut report = LoadReport {
        files: files.len(),
        ..LoadReport::default()
    };
    let mut seen = HashSet::new();
    let mut bars = Vec::new();

    for path in &files {
        let (rows, dropped) = read_klines(path)?;
        report.rows += rows.len();
        report.dropped += dropped;
        for kline in rows {
            if !seen.insert(kline.open_time) {
                report.duplicates += 1;
                continue;
            }
            let bar = kline.to_bar();
            if bar.is_void() {
                report.void_bars += 1;
            }
            bars.push(bar);
        }
    }

    bars.sort_by_key(|b| b.open_time);

    tracing::info!(
        %symbol,
        %interval,
        files = report.files,
        rows = report.rows,
        bars = bars.len(),
        duplicates = report.duplicates,
        dropped = report.dropped,
        void_bars = report.void_bars,
        "loaded klines"
    );

    Ok((Series::new(symbol, interval, bars), report))
}
