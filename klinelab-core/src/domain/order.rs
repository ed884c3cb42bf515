//! Market orders and their lifecycle.
//!
//! `Created -> Submitted -> {Completed, Canceled, MarginRejected}`

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    Created,
    Submitted,
    Completed,
    Canceled,
    MarginRejected,
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Signal,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::Signal => "signal",
        };
        f.write_str(s)
    }
}

/// Fill details attached to a completed order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub price: f64,
    pub size: f64,
    pub commission: f64,
    pub bar_index: usize,
    pub time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: OrderSide,
    pub size: f64,
    /// Execution-series index of the bar whose close produced the order.
    pub requested_at_bar: usize,
    pub state: OrderState,
    /// Set on sell orders that close a position.
    pub exit_reason: Option<ExitReason>,
    pub execution: Option<Execution>,
}

impl Order {
    pub fn market(id: OrderId, side: OrderSide, size: f64, requested_at_bar: usize) -> Self {
        Self {
            id,
            side,
            size,
            requested_at_bar,
            state: OrderState::Created,
            exit_reason: None,
            execution: None,
        }
    }

    pub fn with_exit_reason(mut self, reason: ExitReason) -> Self {
        self.exit_reason = Some(reason);
        self
    }

    /// Waiting for a fill.
    pub fn is_active(&self) -> bool {
        self.state == OrderState::Submitted
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            OrderState::Completed | OrderState::Canceled | OrderState::MarginRejected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_order_is_created() {
        let o = Order::market(OrderId(1), OrderSide::Buy, 2.0, 5);
        assert_eq!(o.state, OrderState::Created);
        assert!(!o.is_active());
        assert!(!o.is_terminal());
        assert!(o.execution.is_none());
    }

    #[test]
    fn exit_reason_display() {
        assert_eq!(ExitReason::StopLoss.to_string(), "stop_loss");
        let o = Order::market(OrderId(2), OrderSide::Sell, 1.0, 0).with_exit_reason(ExitReason::TakeProfit);
        assert_eq!(o.exit_reason, Some(ExitReason::TakeProfit));
    }
}
