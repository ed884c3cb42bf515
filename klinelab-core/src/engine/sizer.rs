//! Position sizing: a fixed fraction of cash, levered, priced at the current close.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentSizer {
    /// Fraction of cash committed as margin (0.95 = 95%).
    pub fraction: f64,
    pub leverage: f64,
}

impl PercentSizer {
    pub fn new(fraction: f64, leverage: f64) -> Self {
        Self { fraction, leverage }
    }

    /// Units to buy; `None` when the price or cash make sizing meaningless.
    pub fn size(&self, cash: f64, price: f64) -> Option<f64> {
        if !(price.is_finite() && price > 0.0 && cash.is_finite() && cash > 0.0) {
            return None;
        }
        let size = cash * self.fraction * self.leverage / price;
        (size > 0.0).then_some(size)
    }
}
