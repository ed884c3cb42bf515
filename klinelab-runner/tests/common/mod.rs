//! Shared fixtures: a deterministic in-process kline source.

#![allow(dead_code)]

use chrono::NaiveDate;
use klinelab_core::data::{daily_file_name, DataError, KlineSource};
use klinelab_core::domain::{day_start_us, Interval, MICROS_PER_MINUTE};
use std::cell::Cell;
use std::path::{Path, PathBuf};

/// Smooth two-frequency wave so both crossovers and dips occur.
pub fn price_at(minute: i64) -> f64 {
    let t = minute as f64;
    100.0 + 5.0 * (t / 40.0).sin() + 0.8 * (t / 7.0).sin()
}

/// Writes one CSV per requested day from [`price_at`]; counts calls.
pub struct WaveSource {
    pub calls: Cell<usize>,
    pub missing: Vec<NaiveDate>,
}

impl WaveSource {
    pub fn new() -> Self {
        Self {
            calls: Cell::new(0),
            missing: Vec::new(),
        }
    }
}

impl KlineSource for WaveSource {
    fn name(&self) -> &str {
        "wave"
    }

    fn fetch_day(
        &self,
        symbol: &str,
        interval: Interval,
        day: NaiveDate,
        dest_dir: &Path,
    ) -> Result<PathBuf, DataError> {
        self.calls.set(self.calls.get() + 1);
        if self.missing.contains(&day) {
            return Err(DataError::NotAvailable {
                url: format!("wave://{symbol}/{interval}/{day}"),
            });
        }

        let step = interval.minutes();
        let start_minute = day_start_us(day) / MICROS_PER_MINUTE;
        let mut body = String::new();
        for k in 0..(1_440 / step) {
            let m = start_minute + k * step;
            let open = price_at(m);
            let close = price_at(m + step);
            // Extremes over the window at one-minute resolution.
            let (mut hi, mut lo) = (open.max(close), open.min(close));
            for j in 1..step {
                let p = price_at(m + j);
                hi = hi.max(p);
                lo = lo.min(p);
            }
            let ts_ms = m * 60_000;
            body.push_str(&format!(
                "{ts_ms},{open:.6},{:.6},{:.6},{close:.6},{step},{},0,0,0,0,0\n",
                hi + 0.05,
                lo - 0.05,
                ts_ms + step * 60_000 - 1
            ));
        }
        let path = dest_dir.join(daily_file_name(symbol, interval, day));
        std::fs::write(&path, body).map_err(|e| DataError::io(&path, e))?;
        Ok(path)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
