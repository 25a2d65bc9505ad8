//! Volume-surge entry — an up day on at least twice the recent average
//! volume with real money behind it.
//!
//! Conditions on the last bar: percent change >= 2, close >= open, traded
//! value (close x volume) >= 2x10^8, and volume at least twice the 5-bar
//! average volume ending at the previous bar.

use super::{ma, EvalError, Strategy};
use crate::domain::{InstrumentKey, Series};
use chrono::NaiveDate;

pub const DEFAULT_WINDOW: usize = 60;

/// Minimum traded value on the signal bar.
pub(crate) const MIN_AMOUNT: f64 = 200_000_000.0;

#[derive(Debug, Clone)]
pub struct VolumeSurge {
    window: usize,
}

impl VolumeSurge {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "window must be >= 1");
        Self { window }
    }
}

impl Default for VolumeSurge {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

/// Shared with platform-breakout, which re-anchors it at each candidate
/// crossing bar.
pub(crate) fn surges(series: &Series, as_of: NaiveDate, window: usize) -> bool {
    let bars = series.up_to(as_of);
    if bars.len() < window {
        return false;
    }

    let last = &bars[bars.len() - 1];
    if last.pct_change < 2.0 || last.close < last.open {
        return false;
    }

    // The volume baseline needs one bar beyond the window: the 5-bar
    // average is read at the bar before the signal bar.
    if bars.len() < window + 1 {
        return false;
    }

    if last.close * (last.volume as f64) < MIN_AMOUNT {
        return false;
    }

    let vol_ma5 = ma::sma_or_zero(&ma::volumes(bars), 5);
    let baseline = vol_ma5[bars.len() - 2];
    baseline > 0.0 && last.volume as f64 / baseline >= 2.0
}

impl Strategy for VolumeSurge {
    fn name(&self) -> &str {
        "volume_surge"
    }

    fn window(&self) -> usize {
        self.window
    }

    fn min_bars(&self) -> usize {
        self.window + 1
    }

    fn matches(
        &self,
        _key: &InstrumentKey,
        series: &Series,
        as_of: NaiveDate,
        _flagged: bool,
    ) -> Result<bool, EvalError> {
        Ok(surges(series, as_of, self.window))
    }
}
