//! Series: ordered, deduplicated bars for one (symbol, interval) pair.

use super::bar::Bar;
use super::interval::{Interval, MICROS_PER_DAY};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub symbol: String,
    pub interval: Interval,
    pub bars: Vec<Bar>,
}

/// Microseconds since epoch at UTC midnight of `day`.
pub fn day_start_us(day: NaiveDate) -> i64 {
    // NaiveDate::default() is 1970-01-01.
    (day - NaiveDate::default()).num_days() * MICROS_PER_DAY
}

impl Series {
    pub fn new(symbol: impl Into<String>, interval: Interval, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Bars with `open_time` in `[start, end)` UTC days.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Series {
        let lo = day_start_us(start);
        let hi = day_start_us(end);
        let bars = self
            .bars
            .iter()
            .filter(|b| b.open_time >= lo && b.open_time < hi)
            .copied()
            .collect();
        Series::new(self.symbol.clone(), self.interval, bars)
    }

    /// Strictly increasing `open_time` across the whole series.
    pub fn is_strictly_ordered(&self) -> bool {
        self.bars.windows(2).all(|w| w[0].open_time < w[1].open_time)
    }

    /// Content hash of the series (BLAKE3, hex).
    ///
    /// Stable across runs for identical bars; NaN cells hash by bit pattern.
    pub fn dataset_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.symbol.as_bytes());
        hasher.update(self.interval.label().as_bytes());
        for bar in &self.bars {
            hasher.update(&bar.open_time.to_le_bytes());
            for v in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
                hasher.update(&v.to_bits().to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar_at(ts: i64) -> Bar {
        Bar {
            open_time: ts,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1.0,
        }
    }

    #[test]
    fn day_start_of_known_date() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(day_start_us(d), 1_704_067_200_000_000);
    }

    #[test]
    fn between_is_half_open() {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let s = Series::new(
            "BTCUSDT",
            Interval::D1,
            vec![
                bar_at(day_start_us(d1) - 1),
                bar_at(day_start_us(d1)),
                bar_at(day_start_us(d2)),
            ],
        );
        let f = s.between(d1, d2);
        assert_eq!(f.len(), 1);
        assert_eq!(f.bars[0].open_time, day_start_us(d1));
    }

    #[test]
    fn dataset_hash_is_deterministic_and_content_sensitive() {
        let a = Series::new("BTCUSDT", Interval::M1, vec![bar_at(0), bar_at(60_000_000)]);
        let mut b = a.clone();
        assert_eq!(a.dataset_hash(), b.dataset_hash());
        b.bars[1].close = 2.0;
        assert_ne!(a.dataset_hash(), b.dataset_hash());
    }
}
