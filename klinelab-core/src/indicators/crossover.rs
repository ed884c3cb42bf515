//! Crossover of a fast and a slow SMA.
//!
//! `+1.0` when the fast line crosses above the slow line, `-1.0` when it crosses
//! below, `0.0` otherwise. A bar where both lines are equal carries the last
//! non-zero difference, so touching and then separating in the same direction
//! is not a cross. Needs one bar past the slow warmup.

use super::{Indicator, Sma};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct CrossOver {
    fast: Sma,
    slow: Sma,
    name: String,
}

impl CrossOver {
    pub fn new(fast_period: usize, slow_period: usize) -> Self {
        Self {
            fast: Sma::new(fast_period),
            slow: Sma::new(slow_period),
            name: format!("crossover_{fast_period}_{slow_period}"),
        }
    }
}

/// Cross signal from two precomputed lines.
pub fn crossover_signal(fast: &[f64], slow: &[f64]) -> Vec<f64> {
    let n = fast.len().min(slow.len());
    let mut result = vec![f64::NAN; n];
    let mut last_nonzero = 0.0;
    let mut prev_valid = false;

    for i in 0..n {
        let diff = fast[i] - slow[i];
        if diff.is_nan() {
            prev_valid = false;
            continue;
        }
        if prev_valid {
            result[i] = if last_nonzero < 0.0 && diff > 0.0 {
                1.0
            } else if last_nonzero > 0.0 && diff < 0.0 {
                -1.0
            } else {
                0.0
            };
        }
        if diff != 0.0 {
            last_nonzero = diff;
        }
        prev_valid = true;
    }
    result
}

impl Indicator for CrossOver {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.fast.lookback().max(self.slow.lookback()) + 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        crossover_signal(&self.fast.compute(bars), &self.slow.compute(bars))
    }
}
