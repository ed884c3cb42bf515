//! Property-based tests for core invariants.
//!
//! Uses proptest to generate random inputs and verify:
//! 1. Timestamp normalization is unit-agnostic
//! 2. Resampling to the same interval is the identity
//! 3. Resampling splits cleanly at bucket boundaries
//! 4. Aggregated extremes and volume match their constituents
//! 5. Broker equity equals cash plus unrealized PnL; fills never precede requests

use klinelab_core::data::{normalize_timestamp_us, resample};
use klinelab_core::domain::{Bar, Interval, OrderSide, Series, MICROS_PER_MINUTE};
use klinelab_core::engine::{Broker, BrokerConfig, CostModel};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

fn bar_at(minute: i64, price: f64, spread: f64, volume: f64) -> Bar {
    Bar {
        open_time: minute * MICROS_PER_MINUTE,
        open: price,
        high: price + spread,
        low: price - spread,
        close: price + spread / 2.0,
        volume,
    }
}

/// One-minute bars over `0..minutes` with random gaps.
fn arb_gappy_minutes(max_minutes: usize) -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec(
        (any::<bool>(), 10.0..1000.0f64, 0.0..5.0f64, 0.0..100.0f64),
        1..max_minutes,
    )
    .prop_map(|slots| {
        slots
            .into_iter()
            .enumerate()
            .filter(|(_, (present, ..))| *present)
            .map(|(m, (_, p, s, v))| bar_at(m as i64, p, s, v))
            .collect()
    })
}

// ── 1. Normalization ───────────────────────────────────────────────

proptest! {
    #[test]
    fn normalization_is_unit_agnostic(secs in 1_000_000_000i64..2_000_000_000) {
        let expected = secs * 1_000_000;
        prop_assert_eq!(normalize_timestamp_us(secs), expected);
        prop_assert_eq!(normalize_timestamp_us(secs * 1_000), expected);
        prop_assert_eq!(normalize_timestamp_us(secs * 1_000_000), expected);
    }
}

// ── 2-4. Resampling ────────────────────────────────────────────────

proptest! {
    #[test]
    fn same_interval_resample_is_identity(bars in arb_gappy_minutes(200)) {
        let series = Series::new("X", Interval::M1, bars);
        let out = resample(&series, Interval::M1).unwrap();
        prop_assert_eq!(out, series);
    }

    #[test]
    fn resample_splits_at_bucket_boundaries(
        bars in arb_gappy_minutes(300),
        split_bucket in 0i64..20,
    ) {
        let boundary = split_bucket * 15 * MICROS_PER_MINUTE;
        let (a, b): (Vec<Bar>, Vec<Bar>) = bars.iter().partition(|bar| bar.open_time < boundary);

        let whole = resample(&Series::new("X", Interval::M1, bars), Interval::M15).unwrap();
        let left = resample(&Series::new("X", Interval::M1, a), Interval::M15).unwrap();
        let right = resample(&Series::new("X", Interval::M1, b), Interval::M15).unwrap();

        let mut joined = left.bars;
        joined.extend(right.bars);
        prop_assert_eq!(joined, whole.bars);
    }

    #[test]
    fn aggregates_match_constituents(bars in arb_gappy_minutes(300)) {
        let series = Series::new("X", Interval::M1, bars.clone());
        let out = resample(&series, Interval::M5).unwrap();

        for agg in &out.bars {
            let end = agg.open_time + Interval::M5.duration_us();
            let members: Vec<&Bar> = bars
                .iter()
                .filter(|b| b.open_time >= agg.open_time && b.open_time < end)
                .collect();
            prop_assert!(!members.is_empty());

            let high = members.iter().map(|b| b.high).fold(f64::MIN, f64::max);
            let low = members.iter().map(|b| b.low).fold(f64::MAX, f64::min);
            let volume: f64 = members.iter().map(|b| b.volume).sum();

            prop_assert_eq!(agg.open, members[0].open);
            prop_assert_eq!(agg.close, members[members.len() - 1].close);
            prop_assert_eq!(agg.high, high);
            prop_assert_eq!(agg.low, low);
            prop_assert!((agg.volume - volume).abs() < 1e-6);
        }
    }
}

// ── 5. Broker accounting ───────────────────────────────────────────

proptest! {
    #[test]
    fn equity_is_cash_plus_unrealized(
        prices in prop::collection::vec(50.0..150.0f64, 10..80),
        actions in prop::collection::vec(0u8..3, 10..80),
    ) {
        let mut broker = Broker::new(BrokerConfig {
            starting_cash: 10_000.0,
            leverage: 3.0,
            costs: CostModel::default(),
        });

        for (i, price) in prices.iter().enumerate() {
            let bar = bar_at(i as i64, *price, 1.0, 1.0);
            broker.process_bar(i, &bar);
            broker.mark(&bar);

            let unrealized = broker.position().unrealized_pnl(bar.close);
            prop_assert!((broker.equity() - (broker.cash() + unrealized)).abs() < 1e-6);

            match actions.get(i).copied().unwrap_or(0) {
                1 if broker.position().is_flat() => {
                    let size = 0.5 * broker.cash() * 3.0 / price;
                    let order = broker.market_order(OrderSide::Buy, size, i);
                    broker.submit(order);
                }
                2 if broker.position().is_long() => {
                    let size = broker.position().size;
                    let order = broker.market_order(OrderSide::Sell, size, i);
                    broker.submit(order);
                }
                _ => {}
            }
        }
        broker.finish();

        for order in broker.orders() {
            if let Some(exec) = order.execution {
                prop_assert!(exec.bar_index > order.requested_at_bar);
            }
        }
        let realized: f64 = broker.trades().iter().map(|t| t.pnl).sum();
        let open_commission = broker.position().entry_commission;
        prop_assert!((broker.cash() - (10_000.0 + realized - open_commission)).abs() < 1e-6);
    }
}
