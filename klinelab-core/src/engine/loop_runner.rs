//! Bar-by-bar simulation loop.
//!
//! Per execution bar, strictly in this order:
//! 1. Resolve the outstanding order at this bar's open.
//! 2. Mark to this bar's close and record equity.
//! 3. Evaluate the strategy against the latest completed signal bar.
//! 4. Submit the resulting order; it can fill no earlier than the next bar.

use super::broker::{Broker, BrokerConfig, EquityPoint, OrderEvent};
use super::feed::Feed;
use super::sizer::PercentSizer;
use crate::domain::{Order, OrderSide, Position, Trade};
use crate::strategy::{Intent, RiskClock, Strategy, StrategyContext};
use serde::{Deserialize, Serialize};

/// Data quality threshold: warn if the void bar rate exceeds this fraction.
const VOID_BAR_RATE_THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub broker: BrokerConfig,
    /// Fraction of cash committed per entry, before leverage.
    pub position_fraction: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            position_fraction: 0.95,
        }
    }
}

impl EngineConfig {
    pub fn sizer(&self) -> PercentSizer {
        PercentSizer::new(self.position_fraction, self.broker.leverage)
    }
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub equity_curve: Vec<EquityPoint>,
    /// Every order in a terminal state.
    pub orders: Vec<Order>,
    pub trades: Vec<Trade>,
    pub starting_cash: f64,
    pub final_cash: f64,
    pub final_equity: f64,
    /// Position still held when the data ran out.
    pub open_position: Option<Position>,
    pub bar_count: usize,
    pub signal_bar_count: usize,
    pub warmup_bars: usize,
    pub margin_rejections: usize,
    pub void_bar_rate: f64,
    pub data_quality_warnings: Vec<String>,
}

/// Run one strategy over `feed`.
pub fn run_backtest(feed: &Feed, strategy: &Strategy, config: &EngineConfig) -> RunResult {
    let exec_bars = &feed.exec().bars;
    let signal_bars = &feed.signal().bars;
    let indicators = strategy.compute_indicators(signal_bars);
    let sizer = config.sizer();
    let clock = strategy.kind().risk_clock();
    let multi = feed.is_multi_timeframe();

    let mut broker = Broker::new(config.broker);
    let mut margin_rejections = 0;
    let mut void_bars = 0;

    tracing::info!(
        strategy = %strategy.kind(),
        bars = exec_bars.len(),
        signal_bars = signal_bars.len(),
        multi_timeframe = multi,
        "simulation started"
    );

    for (t, bar) in exec_bars.iter().enumerate() {
        if bar.is_void() {
            void_bars += 1;
        }

        match broker.process_bar(t, bar) {
            Some(OrderEvent::MarginRejected(_)) => margin_rejections += 1,
            Some(OrderEvent::Completed { order, trade }) => {
                if let Some(exec) = order.execution {
                    tracing::debug!(
                        order = %order.id,
                        side = ?order.side,
                        price = exec.price,
                        size = exec.size,
                        pnl = trade.as_ref().map(|tr| tr.pnl),
                        "order filled"
                    );
                }
            }
            Some(OrderEvent::Canceled(order)) => {
                tracing::debug!(order = %order.id, "order canceled at fill time");
            }
            None => {}
        }

        broker.mark(bar);

        let Some(si) = feed.visible_signal(t) else {
            continue;
        };
        let signal_bar = &signal_bars[si];
        // Signal-clock strategies run once per completed signal bar and check
        // SL/TP against its high/low. Granular-clock strategies run on every
        // execution bar against the latest completed signal bar. Orders from
        // either clock fill at the next execution bar's open.
        let risk_bar = match (multi, clock) {
            (true, RiskClock::Signal) => {
                if !feed.signal_completed_at(t) {
                    continue;
                }
                signal_bar
            }
            _ => bar,
        };

        let ctx = StrategyContext {
            signal_index: si,
            signal_bar,
            risk_bar,
            position: broker.snapshot(),
        };
        match strategy.evaluate(&ctx, &indicators) {
            Some(Intent::Enter) => {
                let Some(size) = sizer.size(broker.cash(), bar.close) else {
                    continue;
                };
                let order = broker.market_order(OrderSide::Buy, size, t);
                broker.submit(order);
            }
            Some(Intent::Exit(reason)) => {
                let size = broker.position().size;
                let order = broker
                    .market_order(OrderSide::Sell, size, t)
                    .with_exit_reason(reason);
                broker.submit(order);
            }
            None => {}
        }
    }

    if let Some(order) = broker.finish() {
        tracing::debug!(order = %order.id, "pending order canceled at end of data");
    }

    let bar_count = exec_bars.len();
    let void_bar_rate = if bar_count == 0 {
        0.0
    } else {
        void_bars as f64 / bar_count as f64
    };
    let mut data_quality_warnings = Vec::new();
    if void_bar_rate > VOID_BAR_RATE_THRESHOLD {
        let msg = format!(
            "{}: {:.1}% void bars exceeds {:.0}% threshold",
            feed.exec().symbol,
            void_bar_rate * 100.0,
            VOID_BAR_RATE_THRESHOLD * 100.0
        );
        tracing::warn!("{msg}");
        data_quality_warnings.push(msg);
    }

    let position = *broker.position();
    let result = RunResult {
        equity_curve: broker.equity_curve().to_vec(),
        orders: broker.orders().to_vec(),
        trades: broker.trades().to_vec(),
        starting_cash: config.broker.starting_cash,
        final_cash: broker.cash(),
        final_equity: broker.equity(),
        open_position: (!position.is_flat()).then_some(position),
        bar_count,
        signal_bar_count: signal_bars.len(),
        warmup_bars: strategy.warmup(),
        margin_rejections,
        void_bar_rate,
        data_quality_warnings,
    };

    tracing::info!(
        trades = result.trades.len(),
        final_equity = result.final_equity,
        margin_rejections,
        "simulation finished"
    );
    result
}
