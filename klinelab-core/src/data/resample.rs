//! Timeframe resampling.
//!
//! Buckets are fixed UTC windows aligned to the epoch. A bucket is emitted as
//! soon as its last constituent bar has been consumed, or when a bar from a
//! later window shows up after a gap. Windows with no bars are never synthesized.

use super::provider::DataError;
use crate::domain::{Bar, Interval, Series};

#[derive(Debug, Clone, Copy)]
struct Bucket {
    start: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl Bucket {
    fn open_with(start: i64, bar: &Bar) -> Self {
        let mut bucket = Bucket {
            start,
            open: bar.open,
            high: f64::NAN,
            low: f64::NAN,
            close: bar.close,
            volume: 0.0,
        };
        bucket.absorb(bar);
        bucket
    }

    fn absorb(&mut self, bar: &Bar) {
        // f64::max/min skip a NaN operand.
        self.high = self.high.max(bar.high);
        self.low = self.low.min(bar.low);
        self.close = bar.close;
        if !bar.volume.is_nan() {
            self.volume += bar.volume;
        }
    }

    fn to_bar(self) -> Bar {
        Bar {
            open_time: self.start,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

/// Streaming resampler; one instance per (source, target) pair.
#[derive(Debug, Clone)]
pub struct Resampler {
    source: Interval,
    target: Interval,
    current: Option<Bucket>,
}

impl Resampler {
    pub fn new(source: Interval, target: Interval) -> Result<Self, DataError> {
        if source != target && !source.divides(target) {
            return Err(DataError::InvalidResample {
                from: source,
                to: target,
            });
        }
        Ok(Self {
            source,
            target,
            current: None,
        })
    }

    pub fn target(&self) -> Interval {
        self.target
    }

    /// Feed the next granular bar; returns the target bars completed by it.
    ///
    /// At most two bars come back: the previous bucket when `bar` opens a new
    /// window, and the new bucket if `bar` alone completes it. A bar whose
    /// window does not fit in `i64` microseconds is rejected before any state
    /// changes.
    pub fn push(&mut self, bar: &Bar) -> Result<Vec<Bar>, DataError> {
        let out_of_range = || DataError::TimestampOutOfRange {
            open_time: bar.open_time,
        };
        let step = self.target.duration_us();
        let start = bar
            .open_time
            .checked_sub(bar.open_time.rem_euclid(step))
            .ok_or_else(out_of_range)?;
        let bucket_end = start.checked_add(step).ok_or_else(out_of_range)?;
        let bar_end = bar
            .open_time
            .checked_add(self.source.duration_us())
            .ok_or_else(out_of_range)?;

        let mut emitted = Vec::new();

        match self.current.as_mut() {
            Some(bucket) if bucket.start == start => bucket.absorb(bar),
            _ => {
                if let Some(done) = self.current.take() {
                    emitted.push(done.to_bar());
                }
                self.current = Some(Bucket::open_with(start, bar));
            }
        }

        if bar_end >= bucket_end {
            if let Some(done) = self.current.take() {
                emitted.push(done.to_bar());
            }
        }
        Ok(emitted)
    }

    /// Emit the trailing partial bucket, if any.
    pub fn flush(&mut self) -> Option<Bar> {
        self.current.take().map(Bucket::to_bar)
    }
}

/// Aggregate `granular` into `target` bars. Resampling to the same interval is the identity.
pub fn resample(granular: &Series, target: Interval) -> Result<Series, DataError> {
    if granular.interval == target {
        return Ok(granular.clone());
    }
    let mut resampler = Resampler::new(granular.interval, target)?;
    let ratio = (target.minutes() / granular.interval.minutes()) as usize;
    let mut bars = Vec::with_capacity(granular.len() / ratio + 1);
    for bar in &granular.bars {
        bars.extend(resampler.push(bar)?);
    }
    bars.extend(resampler.flush());

    tracing::debug!(
        symbol = %granular.symbol,
        from = %granular.interval,
        to = %target,
        input = granular.len(),
        output = bars.len(),
        "resampled"
    );
    Ok(Series::new(granular.symbol.clone(), target, bars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MICROS_PER_MINUTE;

    const T0: i64 = 1_704_067_200_000_000; // 2024-01-01 00:00 UTC

    fn minute_bar(minute: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
        Bar {
            open_time: T0 + minute * MICROS_PER_MINUTE,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    fn flat(minute: i64, price: f64) -> Bar {
        minute_bar(minute, price, price + 1.0, price - 1.0, price, 1.0)
    }

    #[test]
    fn fifteen_one_minute_bars_make_one_bucket() {
        let bars: Vec<Bar> = (0..15).map(|m| flat(m, 100.0 + m as f64)).collect();
        let series = Series::new("BTCUSDT", Interval::M1, bars);
        let out = resample(&series, Interval::M15).unwrap();

        assert_eq!(out.len(), 1);
        let b = out.bars[0];
        assert_eq!(b.open_time, T0);
        assert_eq!(b.open, 100.0);
        assert_eq!(b.close, 114.0);
        assert_eq!(b.high, 115.0);
        assert_eq!(b.low, 99.0);
        assert_eq!(b.volume, 15.0);
    }

    #[test]
    fn bucket_emits_on_last_constituent() {
        let mut r = Resampler::new(Interval::M1, Interval::M5).unwrap();
        for m in 0..4 {
            assert!(r.push(&flat(m, 10.0)).unwrap().is_empty());
        }
        let out = r.push(&flat(4, 10.0)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].open_time, T0);
        assert!(r.flush().is_none());
    }

    #[test]
    fn gap_emits_previous_bucket_when_next_window_starts() {
        let mut r = Resampler::new(Interval::M1, Interval::M5).unwrap();
        assert!(r.push(&flat(0, 10.0)).unwrap().is_empty());
        assert!(r.push(&flat(1, 11.0)).unwrap().is_empty());
        // Minutes 2..=4 missing; minute 10 belongs to the third window.
        let out = r.push(&flat(10, 12.0)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].open_time, T0);
        assert_eq!(out[0].close, 11.0);
        let tail = r.flush().unwrap();
        assert_eq!(tail.open_time, T0 + 10 * MICROS_PER_MINUTE);
    }

    #[test]
    fn empty_windows_are_omitted() {
        let bars = vec![flat(0, 1.0), flat(30, 2.0)];
        let out = resample(&Series::new("X", Interval::M1, bars), Interval::M15).unwrap();
        let times: Vec<i64> = out.bars.iter().map(|b| b.open_time).collect();
        assert_eq!(times, vec![T0, T0 + 30 * MICROS_PER_MINUTE]);
    }

    #[test]
    fn nan_cells_are_skipped_in_extrema_and_volume() {
        let bars = vec![
            minute_bar(0, 10.0, 12.0, 9.0, 11.0, 2.0),
            minute_bar(1, 11.0, f64::NAN, f64::NAN, 11.5, f64::NAN),
            minute_bar(2, 11.5, 13.0, 10.5, 12.0, 3.0),
        ];
        let out = resample(&Series::new("X", Interval::M1, bars), Interval::M3).unwrap();
        let b = out.bars[0];
        assert_eq!(b.high, 13.0);
        assert_eq!(b.low, 9.0);
        assert_eq!(b.volume, 5.0);
    }

    #[test]
    fn same_interval_is_identity() {
        let bars: Vec<Bar> = (0..7).map(|m| flat(m * 5, 1.0 + m as f64)).collect();
        let series = Series::new("X", Interval::M5, bars);
        assert_eq!(resample(&series, Interval::M5).unwrap(), series);
    }

    #[test]
    fn timestamp_at_the_edge_of_i64_is_an_error() {
        let mut r = Resampler::new(Interval::M1, Interval::M5).unwrap();
        assert!(r.push(&flat(0, 10.0)).unwrap().is_empty());

        let mut edge = flat(0, 10.0);
        edge.open_time = i64::MAX - 10;
        assert!(matches!(
            r.push(&edge),
            Err(DataError::TimestampOutOfRange { open_time }) if open_time == i64::MAX - 10
        ));
        edge.open_time = i64::MIN + 10;
        assert!(r.push(&edge).is_err());

        // The rejected bars left the open bucket untouched.
        let tail = r.flush().unwrap();
        assert_eq!(tail.open_time, T0);
        assert_eq!(tail.close, 10.0);

        let bars = vec![flat(0, 1.0), edge];
        assert!(resample(&Series::new("X", Interval::M1, bars), Interval::M5).is_err());
    }

    #[test]
    fn finer_or_uneven_target_is_rejected() {
        assert!(matches!(
            Resampler::new(Interval::M15, Interval::M5),
            Err(DataError::InvalidResample { .. })
        ));
        assert!(matches!(
            Resampler::new(Interval::M3, Interval::M5),
            Err(DataError::InvalidResample { .. })
        ));
    }
}
