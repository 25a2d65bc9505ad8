//! Parking apron — a limit-up breakout followed by three quiet days
//! holding above the limit-up close.
//!
//! Scans a 15-bar tail for a bar with percent change > 9.5 that is also a
//! turtle breakout anchored at its own date. The three bars after it must
//! open and close above the limit-up close, the first with an open/close
//! ratio inside (0.97, 1.03), the next two additionally with percent
//! change inside (-5, 5).

use super::{turtle, EvalError, Strategy};
use crate::domain::{Bar, InstrumentKey, Series};
use chrono::NaiveDate;

pub const DEFAULT_WINDOW: usize = 15;

#[derive(Debug, Clone)]
pub struct ParkingApron {
    window: usize,
}

impl ParkingApron {
    pub fn new(window: usize) -> Self {
        assert!(window >= 4, "window must fit a limit-up bar plus three");
        Self { window }
    }
}

impl Default for ParkingApron {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

fn parks(series: &Series, as_of: NaiveDate, window: usize) -> bool {
    let bars = series.up_to(as_of);
    if bars.len() < window {
        return false;
    }
    let tail = &bars[bars.len() - window..];

    // Later limit-up bars are still candidates when an earlier one fails
    // the consolidation check.
    for (i, bar) in tail.iter().enumerate() {
        if bar.pct_change > 9.5
            && turtle::breaks_out(series, bar.date, window)
            && consolidates(&tail[i + 1..], bar.close)
        {
            return true;
        }
    }
    false
}

/// The three bars after the limit-up must hold above its close.
fn consolidates(after: &[Bar], limit_close: f64) -> bool {
    if after.len() < 3 {
        return false;
    }

    let day1 = &after[0];
    let ratio1 = day1.close / day1.open;
    if !(day1.close > limit_close && day1.open > limit_close && 0.97 < ratio1 && ratio1 < 1.03) {
        return false;
    }

    for bar in &after[1..3] {
        let ratio = bar.close / bar.open;
        if !(0.97 < ratio
            && ratio < 1.03
            && -5.0 < bar.pct_change
            && bar.pct_change < 5.0
            && bar.close > limit_close
            && bar.open > limit_close)
        {
            return false;
        }
    }
    true
}

impl Strategy for ParkingApron {
    fn name(&self) -> &str {
        "parking_apron"
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
        Ok(parks(series, as_of, self.window))
    }
}
