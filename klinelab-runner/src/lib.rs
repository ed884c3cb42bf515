//! KlineLab Runner: backtest orchestration on top of `klinelab-core`.
//!
//! - Run configuration (TOML + overrides) validated before any data access
//! - Data loading: cache ensure, load, date slicing, feed alignment
//! - Single-backtest runner with metrics
//! - Artifact export (manifest, trades, equity)

pub mod artifacts;
pub mod config;
pub mod data_loader;
pub mod metrics;
pub mod runner;

pub use artifacts::{ArtifactManager, ArtifactPaths, RunManifest};
pub use config::{parse_param_override, ConfigError, ParamValue, RunConfig, ValidatedRun};
pub use data_loader::{load_bars, LoadError, LoadOptions, LoadedData};
pub use metrics::{PerformanceMetrics, TradeStats};
pub use runner::{run_backtest_from_data, run_single_backtest, BacktestResult, RunError};
