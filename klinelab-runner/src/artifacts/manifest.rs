//! Run manifest export (JSON).

use crate::config::RunConfig;
use crate::metrics::PerformanceMetrics;
use crate::runner::BacktestResult;
use anyhow::{Context, Result};
use klinelab_core::strategy::StrategyParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub run_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub config: RunConfig,
    pub strategy: String,
    pub params: StrategyParams,
    pub dataset_hash: String,
    pub bar_count: usize,
    pub signal_bar_count: usize,
    pub metrics: PerformanceMetrics,
    pub warnings: Vec<String>,
}

impl RunManifest {
    pub fn from_result(result: &BacktestResult) -> Self {
        Self {
            schema_version: result.schema_version,
            run_id: result.run_id.clone(),
            timestamp: chrono::Utc::now(),
            config: result.config.clone(),
            strategy: result.strategy.clone(),
            params: result.params.clone(),
            dataset_hash: result.dataset_hash.clone(),
            bar_count: result.bar_count,
            signal_bar_count: result.signal_bar_count,
            metrics: result.metrics.clone(),
            warnings: result.warnings.clone(),
        }
    }
}

pub fn write_manifest(path: &Path, result: &BacktestResult) -> Result<()> {
    let manifest = RunManifest::from_result(result);
    let json = serde_json::to_string_pretty(&manifest).context("Failed to serialize run manifest")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write manifest to {}", path.display()))?;
    Ok(())
}
