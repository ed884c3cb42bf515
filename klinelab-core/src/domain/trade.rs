//! Trade: an immutable closed round trip.

use super::order::ExitReason;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,
    /// `(exit - entry) * size`
    pub gross_pnl: f64,
    /// Entry plus exit commission.
    pub commission: f64,
    /// Net of commission.
    pub pnl: f64,
    pub opened_at: i64,
    pub closed_at: i64,
    pub bars_held: usize,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    /// Net PnL as a fraction of entry notional.
    pub fn return_pct(&self) -> f64 {
        if self.entry_price == 0.0 || self.size == 0.0 {
            return 0.0;
        }
        self.pnl / (self.entry_price * self.size)
    }
}
