//! KlineLab Core: kline data pipeline, indicators, broker, strategies, bar loop.
//!
//! - Domain types (bars, intervals, series, orders, positions, trades)
//! - Daily-file cache with a pluggable remote source, CSV loader, resampler
//! - Trailing-window indicators (SMA, RSI, Bollinger, crossover)
//! - Broker that owns cash, position, order slot and equity curve
//! - Strategy variants that read snapshots and return intents
//! - Single- and multi-timeframe bar loop

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod strategy;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: core types can cross threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Series>();
        require_sync::<domain::Series>();
        require_send::<domain::Order>();
        require_sync::<domain::Order>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<engine::Broker>();
        require_sync::<engine::Broker>();
        require_send::<engine::RunResult>();
        require_sync::<engine::RunResult>();
        require_send::<strategy::Strategy>();
        require_sync::<strategy::Strategy>();
        require_send::<indicators::IndicatorValues>();
        require_sync::<indicators::IndicatorValues>();
    }

    /// Strategies only see a snapshot; the evaluation signature has no broker.
    #[test]
    fn strategy_evaluation_takes_no_broker() {
        fn _check(
            s: &strategy::Strategy,
            ctx: &strategy::StrategyContext,
            iv: &indicators::IndicatorValues,
        ) -> Option<strategy::Intent> {
            s.evaluate(ctx, iv)
        }
    }
}
