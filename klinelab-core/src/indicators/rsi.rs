//! Relative Strength Index with Wilder smoothing.
//!
//! Seed: simple average of the first `period` gains and losses. After that,
//! `avg = (avg * (period - 1) + x) / period`. RSI = 100 - 100 / (1 + gain / loss),
//! and a zero average loss gives 100. First value lands at index `period`.
//!
//! A `NaN` close breaks the chain: output is `NaN` until `period` fresh changes
//! have re-seeded the averages.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let p = self.period as f64;
        let mut result = vec![f64::NAN; n];

        let mut prev_close = f64::NAN;
        let mut seed_gain = 0.0;
        let mut seed_loss = 0.0;
        let mut seeded = 0usize;
        let mut averages: Option<(f64, f64)> = None;

        for (i, bar) in bars.iter().enumerate() {
            let close = bar.close;
            if close.is_nan() {
                prev_close = f64::NAN;
                seed_gain = 0.0;
                seed_loss = 0.0;
                seeded = 0;
                averages = None;
                continue;
            }
            if prev_close.is_nan() {
                prev_close = close;
                continue;
            }

            let change = close - prev_close;
            prev_close = close;
            let gain = change.max(0.0);
            let loss = (-change).max(0.0);

            match averages.as_mut() {
                Some((avg_gain, avg_loss)) => {
                    *avg_gain = (*avg_gain * (p - 1.0) + gain) / p;
                    *avg_loss = (*avg_loss * (p - 1.0) + loss) / p;
                    result[i] = rsi_value(*avg_gain, *avg_loss);
                }
                None => {
                    seed_gain += gain;
                    seed_loss += loss;
                    seeded += 1;
                    if seeded == self.period {
                        let (g, l) = (seed_gain / p, seed_loss / p);
                        averages = Some((g, l));
                        result[i] = rsi_value(g, l);
                    }
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn rsi_all_gains_is_100() {
        let bars = make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);
        let result = Rsi::new(3).compute(&bars);
        assert!(result[2].is_nan());
        assert_approx(result[3], 100.0, 1e-9);
        assert_approx(result[5], 100.0, 1e-9);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let bars = make_bars(&[105.0, 104.0, 103.0, 102.0, 101.0]);
        let result = Rsi::new(3).compute(&bars);
        assert_approx(result[3], 0.0, 1e-9);
    }

    #[test]
    fn rsi_flat_prices_is_100() {
        let bars = make_bars(&[50.0; 6]);
        let result = Rsi::new(3).compute(&bars);
        assert_approx(result[4], 100.0, 1e-9);
    }

    #[test]
    fn rsi_wilder_smoothing_matches_hand_computation() {
        // Changes: +0.34, -0.25, -0.48, +0.72
        let bars = make_bars(&[44.0, 44.34, 44.09, 43.61, 44.33]);
        let result = Rsi::new(3).compute(&bars);

        let (g0, l0) = (0.34 / 3.0, 0.73 / 3.0);
        assert_approx(result[3], 100.0 - 100.0 / (1.0 + g0 / l0), 1e-9);

        let g1 = (g0 * 2.0 + 0.72) / 3.0;
        let l1 = (l0 * 2.0) / 3.0;
        assert_approx(result[4], 100.0 - 100.0 / (1.0 + g1 / l1), 1e-9);
    }

    #[test]
    fn rsi_bounds() {
        let bars = make_bars(&[100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0]);
        for v in Rsi::new(3).compute(&bars).into_iter().filter(|v| !v.is_nan()) {
            assert!((0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn rsi_reseeds_after_gap() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        bars[3].close = f64::NAN;
        let result = Rsi::new(2).compute(&bars);
        assert!(!result[2].is_nan());
        // Index 3 is the gap, 4 restarts the chain, 5 and 6 are the two new changes.
        assert!(result[3].is_nan());
        assert!(result[4].is_nan());
        assert!(result[5].is_nan());
        assert_approx(result[6], 100.0, 1e-9);
    }

    #[test]
    fn rsi_lookback() {
        assert_eq!(Rsi::new(14).lookback(), 14);
    }
}
