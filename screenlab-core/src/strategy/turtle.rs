//! Turtle breakout — close makes a new high over the trailing window.
//!
//! The classic channel-breakout entry: fires when the last close is the
//! maximum close across the trailing window (default 60 bars).

use super::{EvalError, Strategy};
use crate::domain::{bar, InstrumentKey, Series};
use chrono::NaiveDate;

pub const DEFAULT_WINDOW: usize = 60;

#[derive(Debug, Clone)]
pub struct TurtleBreakout {
    window: usize,
}

impl TurtleBreakout {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "window must be >= 1");
        Self { window }
    }
}

impl Default for TurtleBreakout {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

/// True iff the close on `as_of` is the maximum close of the trailing
/// `window` bars. Shared with parking-apron, which re-anchors it at each
/// candidate limit-up bar.
pub(crate) fn breaks_out(series: &Series, as_of: NaiveDate, window: usize) -> bool {
    let bars = series.up_to(as_of);
    if bars.len() < window {
        return false;
    }
    let tail = bar::tail(bars, window);
    let max_close = tail.iter().map(|b| b.close).fold(f64::NEG_INFINITY, f64::max);
    tail[tail.len() - 1].close >= max_close
}

impl Strategy for TurtleBreakout {
    fn name(&self) -> &str {
        "turtle_breakout"
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
        Ok(breaks_out(series, as_of, self.window))
    }
}
