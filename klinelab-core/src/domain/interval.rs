//! Supported kline intervals with their bar durations and annualization factors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MICROS_PER_MINUTE: i64 = 60_000_000;
pub const MICROS_PER_DAY: i64 = 1_440 * MICROS_PER_MINUTE;

/// Kline interval. Closed set matching the remote archive layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "3m")]
    M3,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "2h")]
    H2,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

/// (interval, label, minutes, bars per year assuming 24/7 trading)
static INTERVAL_TABLE: [(Interval, &str, i64, f64); 9] = [
    (Interval::M1, "1m", 1, 525_600.0),
    (Interval::M3, "3m", 3, 175_200.0),
    (Interval::M5, "5m", 5, 105_120.0),
    (Interval::M15, "15m", 15, 35_040.0),
    (Interval::M30, "30m", 30, 17_520.0),
    (Interval::H1, "1h", 60, 8_760.0),
    (Interval::H2, "2h", 120, 4_380.0),
    (Interval::H4, "4h", 240, 2_190.0),
    (Interval::D1, "1d", 1_440, 365.0),
];

/// Unknown interval label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown interval '{0}' (expected one of 1m, 3m, 5m, 15m, 30m, 1h, 2h, 4h, 1d)")]
pub struct ParseIntervalError(pub String);

impl Interval {
    pub const ALL: [Interval; 9] = [
        Interval::M1,
        Interval::M3,
        Interval::M5,
        Interval::M15,
        Interval::M30,
        Interval::H1,
        Interval::H2,
        Interval::H4,
        Interval::D1,
    ];

    fn entry(self) -> &'static (Interval, &'static str, i64, f64) {
        // The table is ordered like the enum.
        &INTERVAL_TABLE[self as usize]
    }

    pub fn label(self) -> &'static str {
        self.entry().1
    }

    pub fn minutes(self) -> i64 {
        self.entry().2
    }

    /// Bar duration in microseconds.
    pub fn duration_us(self) -> i64 {
        self.minutes() * MICROS_PER_MINUTE
    }

    /// Sharpe annualization factor.
    pub fn bars_per_year(self) -> f64 {
        self.entry().3
    }

    /// Start of the epoch-aligned window containing `ts`.
    pub fn bucket_start(self, ts: i64) -> i64 {
        let step = self.duration_us();
        ts - ts.rem_euclid(step)
    }

    /// True when `self` is strictly finer than `coarser` and divides it evenly.
    pub fn divides(self, coarser: Interval) -> bool {
        self.minutes() < coarser.minutes() && coarser.minutes() % self.minutes() == 0
    }
}

impl FromStr for Interval {
    type Err = ParseIntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        INTERVAL_TABLE
            .iter()
            .find(|(_, label, _, _)| *label == trimmed)
            .map(|(interval, _, _, _)| *interval)
            .ok_or_else(|| ParseIntervalError(s.to_string()))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_enum_order() {
        for (i, interval) in Interval::ALL.iter().enumerate() {
            assert_eq!(INTERVAL_TABLE[i].0, *interval);
        }
    }

    #[test]
    fn parse_all_labels() {
        for interval in Interval::ALL {
            assert_eq!(interval.label().parse::<Interval>().unwrap(), interval);
        }
    }

    #[test]
    fn parse_unknown_label_fails() {
        let err = "7m".parse::<Interval>().unwrap_err();
        assert_eq!(err.0, "7m");
    }

    #[test]
    fn bars_per_year_is_minutes_per_year_over_bar_minutes() {
        for interval in Interval::ALL {
            let expected = 525_600.0 / interval.minutes() as f64;
            assert!((interval.bars_per_year() - expected).abs() < 1e-9);
        }
        assert_eq!(Interval::M15.bars_per_year(), 35_040.0);
    }

    #[test]
    fn bucket_start_aligns_to_epoch() {
        let t = 1_704_067_200_000_000; // 2024-01-01 00:00 UTC
        let seven_minutes = t + 7 * MICROS_PER_MINUTE;
        assert_eq!(Interval::M15.bucket_start(seven_minutes), t);
        assert_eq!(Interval::M5.bucket_start(seven_minutes), t + 5 * MICROS_PER_MINUTE);
    }

    #[test]
    fn divides_requires_strictly_finer_multiple() {
        assert!(Interval::M1.divides(Interval::M15));
        assert!(Interval::M5.divides(Interval::H1));
        assert!(!Interval::M15.divides(Interval::M15));
        assert!(!Interval::M3.divides(Interval::M5));
        assert!(!Interval::H1.divides(Interval::M15));
    }
}
