//! Backtest runner: wires configuration, data, engine and metrics together.
//!
//! Two entry points:
//! - `run_single_backtest()`: validates, ensures and loads data, then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes an already validated run and loaded data. No I/O.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use klinelab_core::data::KlineSource;
use klinelab_core::domain::{Order, Position, Trade};
use klinelab_core::engine::{run_backtest, EquityPoint};
use klinelab_core::strategy::StrategyParams;

use crate::config::{ConfigError, RunConfig, ValidatedRun};
use crate::data_loader::{load_bars, LoadError, LoadOptions, LoadedData};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Data(#[from] LoadError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub config: RunConfig,
    pub symbol: String,
    pub strategy: String,
    /// Resolved parameter values, defaults included.
    pub params: StrategyParams,
    pub signal_interval: String,
    pub granular_interval: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub metrics: PerformanceMetrics,
    pub trades: Vec<Trade>,
    pub orders: Vec<Order>,
    pub equity_curve: Vec<EquityPoint>,
    pub open_position: Option<Position>,
    pub dataset_hash: String,
    pub bar_count: usize,
    pub signal_bar_count: usize,
    pub warmup_bars: usize,
    pub margin_rejections: usize,
    pub void_bar_rate: f64,
    /// Data-quality and configuration warnings raised along the way.
    pub warnings: Vec<String>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run a single backtest from a `RunConfig`.
///
/// Fails before any data access on configuration errors.
pub fn run_single_backtest(
    config: &RunConfig,
    source: Option<&dyn KlineSource>,
    opts: &LoadOptions,
) -> Result<BacktestResult, RunError> {
    let run = config.validate()?;
    let loaded = load_bars(&run, source, opts)?;
    Ok(run_backtest_from_data(config, &run, &loaded))
}

/// Run a validated configuration over pre-loaded data.
pub fn run_backtest_from_data(
    config: &RunConfig,
    run: &ValidatedRun,
    loaded: &LoadedData,
) -> BacktestResult {
    let result = run_backtest(&loaded.feed, &run.strategy, &run.engine);
    let metrics = PerformanceMetrics::compute(&result, run.signal_interval);

    let mut warnings = run.warnings.clone();
    if let Some(summary) = &loaded.ensure {
        warnings.extend(
            summary
                .skipped
                .iter()
                .map(|(day, reason)| format!("{day} skipped: {reason}")),
        );
    }
    warnings.extend(result.data_quality_warnings.iter().cloned());

    BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        config: config.clone(),
        symbol: run.symbol.clone(),
        strategy: run.kind().id().to_string(),
        params: run.params.clone(),
        signal_interval: run.signal_interval.to_string(),
        granular_interval: run.granular_interval.map(|i| i.to_string()),
        start_date: run.start.to_string(),
        end_date: run.end.to_string(),
        metrics,
        trades: result.trades,
        orders: result.orders,
        equity_curve: result.equity_curve,
        open_position: result.open_position,
        dataset_hash: loaded.dataset_hash.clone(),
        bar_count: result.bar_count,
        signal_bar_count: result.signal_bar_count,
        warmup_bars: result.warmup_bars,
        margin_rejections: result.margin_rejections,
        void_bar_rate: result.void_bar_rate,
        warnings,
    }
}
