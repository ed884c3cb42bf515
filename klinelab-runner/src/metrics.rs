//! Performance metrics: pure functions over the equity curve and trade list.

use klinelab_core::domain::{Interval, Trade};
use klinelab_core::engine::{EquityPoint, RunResult};
use serde::{Deserialize, Serialize};

/// Closed-trade counts. A trade is won when its net PnL is positive.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TradeStats {
    pub total: usize,
    pub won: usize,
    pub lost: usize,
    /// Percent of closed trades won; 0 when there are none.
    pub win_rate: f64,
}

impl TradeStats {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let total = trades.len();
        let won = trades.iter().filter(|t| t.is_winner()).count();
        let win_rate = if total == 0 {
            0.0
        } else {
            won as f64 / total as f64 * 100.0
        };
        Self {
            total,
            won,
            lost: total - won,
            win_rate,
        }
    }
}

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub starting_cash: f64,
    pub ending_equity: f64,
    pub total_return_pct: f64,
    pub trades: TradeStats,
    /// Positions still open when the data ran out (0 or 1).
    pub open_trades: usize,
    pub max_drawdown_pct: f64,
    /// Annualized; `None` when undefined.
    pub sharpe: Option<f64>,
}

impl PerformanceMetrics {
    /// Compute all metrics. Sharpe is annualized for `signal_interval`.
    pub fn compute(run: &RunResult, signal_interval: Interval) -> Self {
        let sampled = sample_per_bucket(&run.equity_curve, signal_interval);
        let mut values = Vec::with_capacity(sampled.len() + 1);
        values.push(run.starting_cash);
        values.extend(sampled);

        let mut curve = Vec::with_capacity(run.equity_curve.len() + 1);
        curve.push(run.starting_cash);
        curve.extend(run.equity_curve.iter().map(|p| p.equity));

        Self {
            starting_cash: run.starting_cash,
            ending_equity: run.final_equity,
            total_return_pct: total_return_pct(run.starting_cash, run.final_equity),
            trades: TradeStats::from_trades(&run.trades),
            open_trades: usize::from(run.open_position.is_some()),
            max_drawdown_pct: max_drawdown_pct(&curve),
            sharpe: sharpe_ratio(&values, signal_interval.bars_per_year()),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// `(ending - starting) / starting * 100`.
pub fn total_return_pct(starting: f64, ending: f64) -> f64 {
    if starting <= 0.0 {
        return 0.0;
    }
    (ending - starting) / starting * 100.0
}

/// Largest peak-to-trough decline, in percent of the running peak.
pub fn max_drawdown_pct(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &value in equity {
        if value.is_nan() {
            continue;
        }
        peak = peak.max(value);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - value) / peak);
        }
    }
    max_dd * 100.0
}

/// Simple per-period returns.
pub fn period_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

/// Annualized Sharpe ratio with a zero risk-free rate.
///
/// `mean / population_std * sqrt(periods_per_year)`. `None` with fewer than two
/// returns or zero variance.
pub fn sharpe_ratio(values: &[f64], periods_per_year: f64) -> Option<f64> {
    let returns = period_returns(values);
    if returns.len() < 2 {
        return None;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    if !std.is_finite() || std < 1e-15 {
        return None;
    }
    Some(mean / std * periods_per_year.sqrt())
}

/// Last equity value in each `interval` bucket, in time order.
///
/// On a curve that is already one point per bucket this is the identity.
pub fn sample_per_bucket(curve: &[EquityPoint], interval: Interval) -> Vec<f64> {
    let mut out: Vec<f64> = Vec::new();
    let mut current: Option<i64> = None;
    for point in curve {
        let bucket = interval.bucket_start(point.time);
        if current == Some(bucket) {
            if let Some(last) = out.last_mut() {
                *last = point.equity;
            }
        } else {
            out.push(point.equity);
            current = Some(bucket);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use klinelab_core::domain::{ExitReason, MICROS_PER_MINUTE};

    fn trade(pnl: f64) -> Trade {
        Trade {
            entry_price: 100.0,
            exit_price: 100.0 + pnl,
            size: 1.0,
            gross_pnl: pnl,
            commission: 0.0,
            pnl,
            opened_at: 0,
            closed_at: 1,
            bars_held: 1,
            exit_reason: ExitReason::Signal,
        }
    }

    #[test]
    fn win_rate_zero_without_trades() {
        let stats = TradeStats::from_trades(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.win_rate, 0.0);
    }

    #[test]
    fn breakeven_counts_as_lost() {
        let stats = TradeStats::from_trades(&[trade(5.0), trade(0.0), trade(-2.0), trade(1.0)]);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.won, 2);
        assert_eq!(stats.lost, 2);
        assert_eq!(stats.win_rate, 50.0);
    }

    #[test]
    fn drawdown_from_running_peak() {
        let dd = max_drawdown_pct(&[100.0, 120.0, 90.0, 130.0, 117.0]);
        assert!((dd - 25.0).abs() < 1e-10);
        assert_eq!(max_drawdown_pct(&[100.0, 101.0, 102.0]), 0.0);
        assert_eq!(max_drawdown_pct(&[]), 0.0);
    }

    #[test]
    fn sharpe_undefined_cases() {
        assert_eq!(sharpe_ratio(&[100.0, 101.0], 365.0), None);
        assert_eq!(sharpe_ratio(&[100.0, 100.0, 100.0, 100.0], 365.0), None);
    }

    #[test]
    fn sharpe_known_value() {
        // returns +10%, -10%, +10%
        let values = [100.0, 110.0, 99.0, 108.9];
        let r = [0.1, -0.1, 0.1];
        let mean = r.iter().sum::<f64>() / 3.0;
        let std = (r.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 3.0).sqrt();
        let expected = mean / std * 4.0;
        let got = sharpe_ratio(&values, 16.0).unwrap();
        assert!((got - expected).abs() < 1e-9, "{got} vs {expected}");
    }

    #[test]
    fn total_return() {
        assert!((total_return_pct(10_000.0, 11_000.0) - 10.0).abs() < 1e-12);
        assert!((total_return_pct(10_000.0, 9_500.0) + 5.0).abs() < 1e-12);
    }

    #[test]
    fn bucket_sampling_keeps_last_value() {
        let curve: Vec<EquityPoint> = (0..10)
            .map(|i| EquityPoint {
                time: i * MICROS_PER_MINUTE,
                equity: 100.0 + i as f64,
            })
            .collect();
        assert_eq!(
            sample_per_bucket(&curve, Interval::M5),
            vec![104.0, 109.0]
        );
        assert_eq!(sample_per_bucket(&curve, Interval::M1).len(), 10);
    }
}
