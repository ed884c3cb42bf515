//! Local cache of daily kline files.
//!
//! `ensure` is idempotent: a day whose CSV is already present never triggers a
//! fetch. A failed day is logged and skipped so the remaining days still load.

use super::provider::{daily_file_name, DataError, KlineSource};
use crate::domain::Interval;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of one `ensure` call.
#[derive(Debug, Clone, Default)]
pub struct EnsureSummary {
    /// Days already present on disk.
    pub cached: usize,
    /// Days fetched during this call.
    pub fetched: usize,
    /// Days that could not be fetched, with the reason.
    pub skipped: Vec<(NaiveDate, String)>,
}

impl EnsureSummary {
    pub fn total_days(&self) -> usize {
        self.cached + self.fetched + self.skipped.len()
    }
}

/// Every UTC day in `[start, end)`.
pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d < end)
}

#[derive(Debug, Clone)]
pub struct KlineCache {
    dir: PathBuf,
}

impl KlineCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn day_path(&self, symbol: &str, interval: Interval, day: NaiveDate) -> PathBuf {
        self.dir.join(daily_file_name(symbol, interval, day))
    }

    pub fn has_day(&self, symbol: &str, interval: Interval, day: NaiveDate) -> bool {
        self.day_path(symbol, interval, day).is_file()
    }

    /// Make sure a file exists for every day in `[start, end)` that the source can supply.
    ///
    /// Only a cache directory that cannot be created is an error; per-day
    /// failures land in [`EnsureSummary::skipped`].
    pub fn ensure(
        &self,
        source: &dyn KlineSource,
        symbol: &str,
        interval: Interval,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<EnsureSummary, DataError> {
        fs::create_dir_all(&self.dir).map_err(|e| DataError::io(&self.dir, e))?;

        let mut summary = EnsureSummary::default();
        for day in days_in_range(start, end) {
            if self.has_day(symbol, interval, day) {
                summary.cached += 1;
                continue;
            }
            tracing::info!(%symbol, %interval, %day, source = source.name(), "fetching day");
            match source.fetch_day(symbol, interval, day, &self.dir) {
                Ok(path) => {
                    tracing::debug!(path = %path.display(), "cached");
                    summary.fetched += 1;
                }
                Err(e) => {
                    tracing::warn!(%symbol, %interval, %day, error = %e, "skipping day");
                    summary.skipped.push((day, e.to_string()));
                }
            }
        }

        tracing::info!(
            %symbol,
            %interval,
            cached = summary.cached,
            fetched = summary.fetched,
            skipped = summary.skipped.len(),
            "cache ensured"
        );
        Ok(summary)
    }

    /// Cached daily files for the pair, sorted by name (and therefore by date).
    pub fn cached_files(&self, symbol: &str, interval: Interval) -> Result<Vec<PathBuf>, DataError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let prefix = format!("{symbol}-{interval}-");
        let entries = fs::read_dir(&self.dir).map_err(|e| DataError::io(&self.dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::io(&self.dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(date_part) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".csv"))
            else {
                continue;
            };
            if NaiveDate::parse_from_str(date_part, "%Y-%m-%d").is_ok() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}
