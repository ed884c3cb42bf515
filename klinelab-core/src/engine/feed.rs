//! Bar-synchronized feed for the loop.
//!
//! The execution series drives the clock. In multi-timeframe mode the signal
//! series is built by streaming the execution bars through a [`Resampler`],
//! so at execution step `i` only signal bars completed by bars `0..=i` are
//! visible.

use crate::data::{DataError, Resampler};
use crate::domain::{Bar, Interval, Series};

#[derive(Debug, Clone)]
pub struct Feed {
    exec: Series,
    /// `None` when signals come from the execution series itself.
    signal: Option<Series>,
    /// Latest completed signal bar at each execution step.
    visible: Vec<Option<usize>>,
    /// True at the step where a new signal bar completed.
    fresh: Vec<bool>,
}

impl Feed {
    /// Single timeframe: every execution bar is also a signal bar.
    pub fn single(series: Series) -> Self {
        let n = series.len();
        Self {
            exec: series,
            signal: None,
            visible: (0..n).map(Some).collect(),
            fresh: vec![true; n],
        }
    }

    /// Multi timeframe: execution on `granular`, signals resampled to `signal_interval`.
    pub fn multi(granular: Series, signal_interval: Interval) -> Result<Self, DataError> {
        let mut resampler = Resampler::new(granular.interval, signal_interval)?;
        let mut signal_bars: Vec<Bar> = Vec::new();
        let mut visible = Vec::with_capacity(granular.len());
        let mut fresh = Vec::with_capacity(granular.len());

        for bar in &granular.bars {
            let completed = resampler.push(bar)?;
            fresh.push(!completed.is_empty());
            signal_bars.extend(completed);
            visible.push(signal_bars.len().checked_sub(1));
        }
        // A trailing partial bucket never becomes visible to the loop.
        let signal = Series::new(granular.symbol.clone(), signal_interval, signal_bars);

        tracing::debug!(
            granular = granular.len(),
            signal = signal.len(),
            interval = %signal_interval,
            "aligned multi-timeframe feed"
        );
        Ok(Self {
            exec: granular,
            signal: Some(signal),
            visible,
            fresh,
        })
    }

    pub fn is_multi_timeframe(&self) -> bool {
        self.signal.is_some()
    }

    pub fn exec(&self) -> &Series {
        &self.exec
    }

    pub fn signal(&self) -> &Series {
        self.signal.as_ref().unwrap_or(&self.exec)
    }

    pub fn len(&self) -> usize {
        self.exec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exec.is_empty()
    }

    pub fn visible_signal(&self, step: usize) -> Option<usize> {
        self.visible.get(step).copied().flatten()
    }

    pub fn signal_completed_at(&self, step: usize) -> bool {
        self.fresh.get(step).copied().unwrap_or(false)
    }
}
