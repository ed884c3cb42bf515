//! Multi-timeframe loop behaviour on a hand-built scenario.
//!
//! Thirteen five-minute signal bars built from one-minute bars. Signal closes
//! rise 10..=19, dip to 16 (RSI(2) = 25, below a 0.5-sigma lower band, above
//! the 10-bar trend), then drift up. A spike in the second minute of the next
//! window crosses the take-profit level.

use klinelab_core::domain::{Bar, ExitReason, Interval, OrderSide, OrderState, Series, MICROS_PER_MINUTE};
use klinelab_core::engine::{run_backtest, BrokerConfig, CostModel, EngineConfig, Feed, RunResult};
use klinelab_core::strategy::{StrategyKind, StrategyParams};

const PER_BUCKET: usize = 5;

/// One-minute bars whose five-minute buckets close at `closes`.
fn granular_from_signal_closes(closes: &[f64]) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(closes.len() * PER_BUCKET);
    let mut prev = closes[0];
    for (k, &c) in closes.iter().enumerate() {
        for j in 0..PER_BUCKET {
            let a = prev + (c - prev) * j as f64 / PER_BUCKET as f64;
            let b = prev + (c - prev) * (j + 1) as f64 / PER_BUCKET as f64;
            bars.push(Bar {
                open_time: (k * PER_BUCKET + j) as i64 * MICROS_PER_MINUTE,
                open: a,
                high: a.max(b) + 0.01,
                low: a.min(b) - 0.01,
                close: b,
                volume: 1.0,
            });
        }
        prev = c;
    }
    bars
}

fn scenario() -> Vec<Bar> {
    let mut closes: Vec<f64> = (10..=19).map(f64::from).collect();
    closes.extend([16.0, 16.1, 16.2]);
    let mut bars = granular_from_signal_closes(&closes);
    bars[56].high = 16.5;
    bars
}

fn params() -> StrategyParams {
    let mut p = StrategyParams::new();
    p.insert("rsi_period".into(), 2.0);
    p.insert("trend_ma".into(), 10.0);
    p.insert("bb_period".into(), 3.0);
    p.insert("bb_devfactor".into(), 0.5);
    p
}

fn config() -> EngineConfig {
    EngineConfig {
        broker: BrokerConfig {
            starting_cash: 10_000.0,
            leverage: 1.0,
            costs: CostModel::frictionless(),
        },
        position_fraction: 0.5,
    }
}

fn run(kind: StrategyKind) -> RunResult {
    let feed = Feed::multi(Series::new("TESTUSDT", Interval::M1, scenario()), Interval::M5).unwrap();
    assert_eq!(feed.signal().len(), 13);
    let strategy = kind.build(&params()).unwrap();
    run_backtest(&feed, &strategy, &config())
}

#[test]
fn entry_waits_for_signal_bar_completion() {
    let result = run(StrategyKind::OversoldBounceMtf);
    let entry = result
        .orders
        .iter()
        .find(|o| o.side == OrderSide::Buy && o.state == OrderState::Completed)
        .expect("entry order");
    // Signal bar 10 completes with granular step 54; fill at step 55's open.
    assert_eq!(entry.requested_at_bar, 54);
    let exec = entry.execution.expect("filled");
    assert_eq!(exec.bar_index, 55);
    assert!((exec.price - 16.0).abs() < 1e-9);
}

#[test]
fn granular_clock_exits_inside_the_signal_window() {
    let result = run(StrategyKind::OversoldBounceMtf);
    let first = &result.trades[0];
    assert_eq!(first.exit_reason, ExitReason::TakeProfit);
    // Spike on step 56, exit fills at step 57's open.
    assert_eq!(first.closed_at, 57 * MICROS_PER_MINUTE);
    assert!((first.exit_price - 16.04).abs() < 1e-9);
    assert!(first.is_winner());
}

#[test]
fn signal_clock_exits_on_completed_signal_bar() {
    let result = run(StrategyKind::OversoldBounce);
    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
    // Signal bar 11 completes at step 59 and carries the spike in its high.
    assert_eq!(trade.opened_at, 55 * MICROS_PER_MINUTE);
    assert_eq!(trade.closed_at, 60 * MICROS_PER_MINUTE);
    assert!((trade.exit_price - 16.1).abs() < 1e-9);
}

#[test]
fn every_fill_follows_its_request() {
    for kind in [StrategyKind::OversoldBounce, StrategyKind::OversoldBounceMtf] {
        let result = run(kind);
        for order in &result.orders {
            if let Some(exec) = order.execution {
                assert!(exec.bar_index > order.requested_at_bar, "{kind}: {order:?}");
            }
        }
        assert_eq!(result.equity_curve.len(), result.bar_count);
        assert_eq!(result.signal_bar_count, 13);
    }
}

#[test]
fn trailing_partial_bucket_is_not_a_signal_bar() {
    let mut bars = scenario();
    bars.truncate(63); // bucket 12 has only three of five minutes
    let feed = Feed::multi(Series::new("TESTUSDT", Interval::M1, bars), Interval::M5).unwrap();
    assert_eq!(feed.signal().len(), 12);
    assert_eq!(feed.visible_signal(62), Some(11));
    assert!(!feed.signal_completed_at(62));
}
