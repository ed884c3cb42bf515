//! Kline source trait and structured error types.
//!
//! The `KlineSource` trait abstracts over where daily archives come from so the
//! cache can be driven by the real Binance Vision endpoint or by a fake in tests.

use crate::domain::Interval;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("remote has no data at {url}")]
    NotAvailable { url: String },

    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("archive error: {0}")]
    Archive(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {message}", path.display())]
    Csv { path: PathBuf, message: String },

    #[error("no cached data for {symbol} {interval} in {} (run `download` first)", dir.display())]
    NoCachedData {
        symbol: String,
        interval: Interval,
        dir: PathBuf,
    },

    #[error("cannot resample {from} to {to}: target must be a coarser whole multiple")]
    InvalidResample { from: Interval, to: Interval },

    #[error("bar at {open_time}µs is outside the representable time range")]
    TimestampOutOfRange { open_time: i64 },

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Name of the cached daily file: `{symbol}-{interval}-{YYYY-MM-DD}.csv`.
pub fn daily_file_name(symbol: &str, interval: Interval, day: NaiveDate) -> String {
    format!("{symbol}-{interval}-{}.csv", day.format("%Y-%m-%d"))
}

/// A remote source of daily kline files.
///
/// Implementations write exactly one file, named by [`daily_file_name`], into
/// `dest_dir`. The cache layer sits above this trait; sources don't check for
/// existing files.
pub trait KlineSource {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch one UTC day of klines and return the path of the written CSV.
    fn fetch_day(
        &self,
        symbol: &str,
        interval: Interval,
        day: NaiveDate,
        dest_dir: &Path,
    ) -> Result<PathBuf, DataError>;
}
