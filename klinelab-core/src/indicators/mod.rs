//! Indicator trait, precomputed value container and concrete indicators.
//!
//! Indicators are pure functions: bar history in, numeric series out. Each one
//! is computed once per series before the bar loop and then read by index.
//! Values are `NaN` during warmup and wherever an input gap makes them undefined;
//! strategies never act on a `NaN`.

pub mod bollinger;
pub mod crossover;
pub mod rsi;
pub mod sma;

pub use bollinger::{Bollinger, BollingerBand};
pub use crossover::CrossOver;
pub use rsi::Rsi;
pub use sma::Sma;

use crate::domain::Bar;
use std::collections::HashMap;

/// Trailing-window indicator over close prices.
///
/// # Look-ahead contamination guard
/// No value at bar t may depend on bar t+1 or later. Every indicator must pass
/// the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20").
    fn name(&self) -> &str;

    /// Number of leading bars that are always `NaN`.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series (same length as `bars`).
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Named indicator series, queried by bar index during the loop.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Compute `indicator` over `bars` and store it under its own name.
    pub fn compute(&mut self, indicator: &dyn Indicator, bars: &[Bar]) {
        self.insert(indicator.name().to_string(), indicator.compute(bars));
    }

    /// Value at `bar_index`; `None` when missing, out of range or `NaN`.
    pub fn get(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.series
            .get(name)
            .and_then(|v| v.get(bar_index).copied())
            .filter(|v| !v.is_nan())
    }

    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Synthetic one-minute bars from closes for tests.
///
/// open = previous close, high/low = max/min(open, close) ± 1, volume = 10.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                open_time: 1_704_067_200_000_000 + i as i64 * crate::domain::MICROS_PER_MINUTE,
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 10.0,
            }
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
