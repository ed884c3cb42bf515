//! Broker: sole owner of cash, position, the outstanding order slot and
//! the equity curve.
//!
//! Accounting is margin style: opening a position only pays commission, and
//! closing it realizes `(exit - entry) * size - commission` into cash.
//! Equity is `cash + unrealized PnL` marked at the last valid close.

use super::cost_model::CostModel;
use crate::domain::{
    Bar, Execution, ExitReason, Order, OrderId, OrderSide, OrderState, Position, Trade,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub starting_cash: f64,
    pub leverage: f64,
    pub costs: CostModel,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            starting_cash: 10_000.0,
            leverage: 5.0,
            costs: CostModel::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub time: i64,
    pub equity: f64,
}

/// What the strategy is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSnapshot {
    pub size: f64,
    /// Fill price of the opening buy; `None` while flat.
    pub entry_price: Option<f64>,
    pub order_pending: bool,
}

impl PositionSnapshot {
    pub fn is_flat(&self) -> bool {
        self.size == 0.0
    }
}

/// Resolution of the outstanding order.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    Completed { order: Order, trade: Option<Trade> },
    MarginRejected(Order),
    Canceled(Order),
}

#[derive(Debug, Clone)]
pub struct Broker {
    config: BrokerConfig,
    cash: f64,
    position: Position,
    pending: Option<Order>,
    next_id: u64,
    last_price: f64,
    orders: Vec<Order>,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
}

impl Broker {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            cash: config.starting_cash,
            config,
            position: Position::flat(),
            pending: None,
            next_id: 1,
            last_price: f64::NAN,
            orders: Vec::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn pending(&self) -> Option<&Order> {
        self.pending.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Cash plus unrealized PnL at the last valid close.
    pub fn equity(&self) -> f64 {
        self.cash + self.position.unrealized_pnl(self.last_price)
    }

    /// Every order that reached a terminal state, in resolution order.
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            size: self.position.size,
            entry_price: (!self.position.is_flat()).then_some(self.position.entry_price),
            order_pending: self.has_pending(),
        }
    }

    /// New market order in `Created` state with a fresh id.
    pub fn market_order(&mut self, side: OrderSide, size: f64, bar_index: usize) -> Order {
        let id = OrderId(self.next_id);
        self.next_id += 1;
        Order::market(id, side, size, bar_index)
    }

    /// Accept `order` into the outstanding slot.
    ///
    /// While another order is outstanding the new one is suppressed and comes
    /// back still `Created`. A non-positive or non-finite size is `Canceled`.
    pub fn submit(&mut self, mut order: Order) -> Order {
        if self.pending.is_some() {
            tracing::debug!(order = %order.id, "order suppressed: another order is pending");
            return order;
        }
        if !(order.size.is_finite() && order.size > 0.0) {
            tracing::warn!(order = %order.id, size = order.size, "order canceled: invalid size");
            order.state = OrderState::Canceled;
            self.orders.push(order.clone());
            return order;
        }
        order.state = OrderState::Submitted;
        self.pending = Some(order.clone());
        order
    }

    /// Resolve the outstanding order against `bar`'s open.
    ///
    /// Call at the start of each execution bar, before any new submission, so
    /// an order always fills on the bar after the one that produced it. A bar
    /// with a `NaN` open leaves the order waiting.
    pub fn process_bar(&mut self, bar_index: usize, bar: &Bar) -> Option<OrderEvent> {
        if bar.open.is_nan() {
            return None;
        }
        let order = self.pending.take()?;
        let event = match order.side {
            OrderSide::Buy => self.fill_buy(order, bar_index, bar),
            OrderSide::Sell => self.fill_sell(order, bar_index, bar),
        };
        let resolved = match &event {
            OrderEvent::Completed { order, .. }
            | OrderEvent::MarginRejected(order)
            | OrderEvent::Canceled(order) => order.clone(),
        };
        self.orders.push(resolved);
        Some(event)
    }

    fn fill_buy(&mut self, mut order: Order, bar_index: usize, bar: &Bar) -> OrderEvent {
        if !self.position.is_flat() {
            order.state = OrderState::Canceled;
            return OrderEvent::Canceled(order);
        }
        let costs = self.config.costs;
        let price = costs.fill_price(bar, OrderSide::Buy);
        let commission = costs.commission(order.size, price);
        let margin = order.size * price / self.config.leverage;
        let available = self.equity();

        if margin + commission > available {
            tracing::warn!(
                order = %order.id,
                margin,
                commission,
                available,
                "order margin-rejected"
            );
            order.state = OrderState::MarginRejected;
            return OrderEvent::MarginRejected(order);
        }

        self.cash -= commission;
        self.position = Position {
            size: order.size,
            entry_price: price,
            opened_at: bar.open_time,
            opened_bar: bar_index,
            entry_commission: commission,
        };
        order.state = OrderState::Completed;
        order.execution = Some(Execution {
            price,
            size: order.size,
            commission,
            bar_index,
            time: bar.open_time,
        });
        OrderEvent::Completed { order, trade: None }
    }

    fn fill_sell(&mut self, mut order: Order, bar_index: usize, bar: &Bar) -> OrderEvent {
        if self.position.is_flat() {
            order.state = OrderState::Canceled;
            return OrderEvent::Canceled(order);
        }
        let costs = self.config.costs;
        let size = self.position.size;
        let price = costs.fill_price(bar, OrderSide::Sell);
        let commission = costs.commission(size, price);
        let gross_pnl = (price - self.position.entry_price) * size;
        self.cash += gross_pnl - commission;

        let total_commission = self.position.entry_commission + commission;
        let trade = Trade {
            entry_price: self.position.entry_price,
            exit_price: price,
            size,
            gross_pnl,
            commission: total_commission,
            pnl: gross_pnl - total_commission,
            opened_at: self.position.opened_at,
            closed_at: bar.open_time,
            bars_held: bar_index.saturating_sub(self.position.opened_bar),
            exit_reason: order.exit_reason.unwrap_or(ExitReason::Signal),
        };
        self.position = Position::flat();

        order.state = OrderState::Completed;
        order.size = size;
        order.execution = Some(Execution {
            price,
            size,
            commission,
            bar_index,
            time: bar.open_time,
        });
        OrderEvent::Completed {
            order,
            trade: Some(trade),
        }
    }

    /// Mark to `bar`'s close and append an equity sample.
    pub fn mark(&mut self, bar: &Bar) {
        if !bar.close.is_nan() {
            self.last_price = bar.close;
        }
        self.equity_curve.push(EquityPoint {
            time: bar.open_time,
            equity: self.equity(),
        });
    }

    /// End of data: cancel whatever is still outstanding.
    pub fn finish(&mut self) -> Option<Order> {
        let mut order = self.pending.take()?;
        order.state = OrderState::Canceled;
        self.orders.push(order.clone());
        Some(order)
    }
}
