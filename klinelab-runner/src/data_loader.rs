//! Bar loading and feed construction for the runner.
//!
//! Resolution policy:
//! 1. Unless offline, make sure the daily cache covers `[start, end)` for the
//!    data interval (granular in multi-timeframe mode, signal otherwise).
//! 2. Load every cached file for the pair, deduplicated and ordered.
//! 3. Slice to `[start, end)` and fail if nothing is left.
//! 4. Build a single- or multi-timeframe [`Feed`].

use crate::config::ValidatedRun;
use klinelab_core::data::{load_with_report, DataError, EnsureSummary, KlineCache, KlineSource, LoadReport};
use klinelab_core::domain::Interval;
use klinelab_core::engine::Feed;
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no {interval} bars for {symbol} between {start} and {end}")]
    NoBarsInRange {
        symbol: String,
        interval: Interval,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Options controlling how bars are loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Never contact the remote source; use whatever is cached.
    pub offline: bool,
}

/// Loaded, sliced and aligned data for one run.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub feed: Feed,
    /// BLAKE3 over the sliced execution series.
    pub dataset_hash: String,
    pub report: LoadReport,
    /// `None` when loading offline.
    pub ensure: Option<EnsureSummary>,
}

/// Ensure, load, slice and align the bars a run needs.
pub fn load_bars(
    run: &ValidatedRun,
    source: Option<&dyn KlineSource>,
    opts: &LoadOptions,
) -> Result<LoadedData, LoadError> {
    let interval = run.data_interval();
    let cache = KlineCache::new(&run.data_dir);

    let ensure = match (opts.offline, source) {
        (false, Some(src)) => Some(cache.ensure(src, &run.symbol, interval, run.start, run.end)?),
        _ => None,
    };

    let (full, report) = load_with_report(&run.symbol, interval, cache.dir())?;
    let series = full.between(run.start, run.end);
    if series.is_empty() {
        return Err(LoadError::NoBarsInRange {
            symbol: run.symbol.clone(),
            interval,
            start: run.start,
            end: run.end,
        });
    }
    let dataset_hash = series.dataset_hash();

    let feed = match run.granular_interval {
        Some(_) => Feed::multi(series, run.signal_interval)?,
        None => Feed::single(series),
    };

    tracing::info!(
        symbol = %run.symbol,
        interval = %interval,
        exec_bars = feed.len(),
        signal_bars = feed.signal().len(),
        "data ready"
    );

    Ok(LoadedData {
        feed,
        dataset_hash,
        report,
        ensure,
    })
}
