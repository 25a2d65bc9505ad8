//! Platform breakout — a volume-confirmed upward cross of the 60-day
//! moving average after a tight consolidation around it.
//!
//! A breakout bar opens below MA60 and closes at or above it, with the
//! volume-surge predicate confirming that bar. Every bar before the
//! breakout (where MA60 is ready) must sit within -5%..+20% of the
//! average — that is the platform.

use super::{ma, volume_surge, EvalError, Strategy};
use crate::domain::{InstrumentKey, Series};
use chrono::NaiveDate;

pub const DEFAULT_WINDOW: usize = 60;

/// MA period is fixed at 60 regardless of the scan window.
const MA_PERIOD: usize = 60;

#[derive(Debug, Clone)]
pub struct PlatformBreakout {
    window: usize,
}

impl PlatformBreakout {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "window must be >= 1");
        Self { window }
    }
}

impl Default for PlatformBreakout {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

fn breaks_platform(series: &Series, as_of: NaiveDate, window: usize) -> bool {
    let bars = series.up_to(as_of);
    if bars.len() < window {
        return false;
    }

    let ma60 = ma::sma_or_zero(&ma::closes(bars), MA_PERIOD);
    let tail_start = bars.len() - window;

    // First volume-confirmed upward cross of the average inside the window.
    // The inner predicate is re-anchored at the candidate bar's date over
    // the full series, exactly as a standalone volume-surge scan would see it.
    let mut breakout: Option<NaiveDate> = None;
    for i in tail_start..bars.len() {
        let bar = &bars[i];
        if bar.open < ma60[i]
            && ma60[i] <= bar.close
            && volume_surge::surges(series, bar.date, window)
        {
            breakout = Some(bar.date);
            break;
        }
    }
    let Some(breakout_date) = breakout else {
        return false;
    };

    for i in tail_start..bars.len() {
        let bar = &bars[i];
        if bar.date < breakout_date && ma60[i] > 0.0 {
            let deviation = (ma60[i] - bar.close) / ma60[i];
            if deviation <= -0.05 || deviation >= 0.2 {
                return false;
            }
        }
    }
    true
}

impl Strategy for PlatformBreakout {
    fn name(&self) -> &str {
        "platform_breakout"
    }

    fn window(&self) -> usize {
        self.window
    }

    fn matches(
        &self,
        _key: &InstrumentKey,
        series: &Series,
        as_of: NaiveDate,
        _flagged: bool,
    ) -> Result<bool, EvalError> {
        Ok(breaks_platform(series, as_of, self.window))
    }
}
