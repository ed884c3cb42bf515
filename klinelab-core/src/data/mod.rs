//! Data layer: kline sources, the local daily-file cache, CSV loading, resampling.

pub mod binance;
pub mod cache;
pub mod loader;
pub mod provider;
pub mod resample;

pub use binance::{BinanceVisionSource, DEFAULT_BASE_URL};
pub use cache::{days_in_range, EnsureSummary, KlineCache};
pub use loader::{load, load_with_report, normalize_timestamp_us, Kline, LoadReport, KLINE_COLUMNS};
pub use provider::{daily_file_name, DataError, KlineSource};
pub use resample::{resample, Resampler};
