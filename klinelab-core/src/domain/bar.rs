//! Bar: one kline (OHLCV summary of a fixed time window).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar keyed by its window start in microseconds since the Unix epoch (UTC).
///
/// Numeric fields may be `NaN` when the cached source cell could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// `low <= {open, close} <= high` and positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_micros(self.open_time)
    }
}

/// Render a microsecond timestamp as `YYYY-MM-DD HH:MM:SS` (UTC), falling back to the raw number.
pub fn format_micros(ts: i64) -> String {
    match DateTime::from_timestamp_micros(ts) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar {
            open_time: 1_704_067_200_000_000,
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 12.5,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_high_below_close_is_not_sane() {
        let mut bar = sample_bar();
        bar.high = 102.0;
        assert!(!bar.is_sane());
    }

    #[test]
    fn nan_bar_is_void() {
        let mut bar = sample_bar();
        bar.open = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn nan_volume_is_not_void() {
        let mut bar = sample_bar();
        bar.volume = f64::NAN;
        assert!(!bar.is_void());
    }

    #[test]
    fn datetime_is_utc_midnight() {
        assert_eq!(format_micros(sample_bar().open_time), "2024-01-01 00:00:00");
    }
}
