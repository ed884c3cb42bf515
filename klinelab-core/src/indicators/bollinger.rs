//! Bollinger Bands: SMA(period) ± devfactor × population stddev of closes.
//!
//! Each band is its own `Indicator` instance. Lookback: period - 1.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    devfactor: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    pub fn new(period: usize, devfactor: f64, band: BollingerBand) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        let tag = match band {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "middle",
            BollingerBand::Lower => "lower",
        };
        Self {
            period,
            devfactor,
            band,
            name: format!("bb_{tag}_{period}_{devfactor}"),
        }
    }

    pub fn upper(period: usize, devfactor: f64) -> Self {
        Self::new(period, devfactor, BollingerBand::Upper)
    }

    pub fn middle(period: usize, devfactor: f64) -> Self {
        Self::new(period, devfactor, BollingerBand::Middle)
    }

    pub fn lower(period: usize, devfactor: f64) -> Self {
        Self::new(period, devfactor, BollingerBand::Lower)
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        for i in (self.period - 1)..n {
            let window = &bars[i + 1 - self.period..=i];
            if window.iter().any(|b| b.close.is_nan()) {
                continue;
            }
            let mean = window.iter().map(|b| b.close).sum::<f64>() / self.period as f64;
            if self.band == BollingerBand::Middle {
                result[i] = mean;
                continue;
            }
            let variance = window
                .iter()
                .map(|b| {
                    let diff = b.close - mean;
                    diff * diff
                })
                .sum::<f64>()
                / self.period as f64;
            let width = self.devfactor * variance.sqrt();
            result[i] = match self.band {
                BollingerBand::Upper => mean + width,
                _ => mean - width,
            };
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn bands_use_population_stddev() {
        // Window [2, 4, 4, 4, 5, 5, 7, 9]: mean 5, population stddev 2.
        let bars = make_bars(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let upper = Bollinger::upper(8, 2.0).compute(&bars);
        let middle = Bollinger::middle(8, 2.0).compute(&bars);
        let lower = Bollinger::lower(8, 2.0).compute(&bars);
        assert_approx(middle[7], 5.0, DEFAULT_EPSILON);
        assert_approx(upper[7], 9.0, DEFAULT_EPSILON);
        assert_approx(lower[7], 1.0, DEFAULT_EPSILON);
        assert!(lower[6].is_nan());
    }

    #[test]
    fn constant_prices_collapse_bands() {
        let bars = make_bars(&[10.0; 5]);
        let lower = Bollinger::lower(3, 2.0).compute(&bars);
        assert_approx(lower[4], 10.0, DEFAULT_EPSILON);
    }

    #[test]
    fn nan_in_window_is_nan() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        bars[1].close = f64::NAN;
        let lower = Bollinger::lower(3, 2.0).compute(&bars);
        assert!(lower[2].is_nan());
        assert!(lower[3].is_nan());
        assert!(!lower[4].is_nan());
    }

    #[test]
    fn names_are_distinct_per_band() {
        assert_ne!(Bollinger::upper(20, 2.0).name(), Bollinger::lower(20, 2.0).name());
        assert_eq!(Bollinger::lower(20, 2.0).name(), "bb_lower_20_2");
    }
}
