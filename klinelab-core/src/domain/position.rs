//! Long-only position held by the broker.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Units held; `0.0` when flat.
    pub size: f64,
    /// Actual fill price of the opening buy.
    pub entry_price: f64,
    pub opened_at: i64,
    pub opened_bar: usize,
    /// Commission paid on the opening fill.
    pub entry_commission: f64,
}

impl Position {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn is_flat(&self) -> bool {
        self.size == 0.0
    }

    pub fn is_long(&self) -> bool {
        self.size > 0.0
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        if self.is_flat() || price.is_nan() {
            return 0.0;
        }
        (price - self.entry_price) * self.size
    }
}
