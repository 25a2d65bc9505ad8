//! No-deep-drawdown growth — a 60%+ advance over the window with no
//! heavy single-day or two-day damage along the way.
//!
//! Disqualifiers, checked bar by bar over a 60-bar tail: a daily drop
//! beyond 7%, an open-to-close fade beyond 7%, a two-day cumulative drop
//! beyond 10%, or a two-day open-to-close fade beyond 10%.

use super::{EvalError, Strategy};
use crate::domain::{bar, Bar, InstrumentKey, Series};
use chrono::NaiveDate;

pub const DEFAULT_WINDOW: usize = 60;

#[derive(Debug, Clone)]
pub struct SteadyGrowth {
    window: usize,
}

impl SteadyGrowth {
    pub fn new(window: usize) -> Self {
        assert!(window >= 2, "window must be >= 2");
        Self { window }
    }
}

impl Default for SteadyGrowth {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

fn grows_steadily(series: &Series, as_of: NaiveDate, window: usize) -> bool {
    let bars = series.up_to(as_of);
    if bars.len() < window {
        return false;
    }

    let tail = bar::tail(bars, window);
    let first_close = tail[0].close;
    if first_close <= 0.0 {
        return false;
    }
    if (tail[tail.len() - 1].close - first_close) / first_close < 0.6 {
        return false;
    }

    let mut previous: Option<&Bar> = None;
    for b in tail {
        if b.pct_change < -7.0 {
            return false;
        }
        if b.open > 0.0 && (b.close - b.open) / b.open * 100.0 < -7.0 {
            return false;
        }
        if let Some(prev) = previous {
            if prev.pct_change + b.pct_change < -10.0 {
                return false;
            }
            if prev.open > 0.0 && (b.close - prev.open) / prev.open * 100.0 < -10.0 {
                return false;
            }
        }
        previous = Some(b);
    }
    true
}

impl Strategy for SteadyGrowth {
    fn name(&self) -> &str {
        "steady_growth"
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
        Ok(grows_steadily(series, as_of, self.window))
    }
}
