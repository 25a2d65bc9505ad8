//! Low-volatility growth — a seasoned instrument grinding higher on
//! small daily moves.
//!
//! Requires 250 bars of history. Over the trailing 10 bars: mean absolute
//! daily percent change below 10, and the close range (max - min) / min
//! above 1.1.

use super::{EvalError, Strategy};
use crate::domain::{bar, InstrumentKey, Series};
use chrono::NaiveDate;

pub const DEFAULT_WINDOW: usize = 10;

const MIN_HISTORY: usize = 250;

#[derive(Debug, Clone)]
pub struct LowVolatilityGrowth {
    window: usize,
}

impl LowVolatilityGrowth {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "window must be >= 1");
        Self { window }
    }
}

impl Default for LowVolatilityGrowth {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

fn grows_quietly(series: &Series, as_of: NaiveDate, window: usize) -> bool {
    let bars = series.up_to(as_of);
    if bars.len() < MIN_HISTORY {
        return false;
    }

    let tail = bar::tail(bars, window);
    if tail.len() < window {
        return false;
    }

    let mean_abs_change =
        tail.iter().map(|b| b.pct_change.abs()).sum::<f64>() / tail.len() as f64;
    if mean_abs_change >= 10.0 {
        return false;
    }

    let max_close = tail.iter().map(|b| b.close).fold(f64::NEG_INFINITY, f64::max);
    let min_close = tail.iter().map(|b| b.close).fold(f64::INFINITY, f64::min);
    if min_close <= 0.0 {
        return false;
    }
    (max_close - min_close) / min_close > 1.1
}

impl Strategy for LowVolatilityGrowth {
    fn name(&self) -> &str {
        "low_volatility_growth"
    }

    fn window(&self) -> usize {
        self.window
    }

    fn min_bars(&self) -> usize {
        MIN_HISTORY
    }

    fn matches(
        &self,
        _key: &InstrumentKey,
        series: &Series,
        as_of: NaiveDate,
        _flagged: bool,
    ) -> Result<bool, EvalError> {
        Ok(grows_quietly(series, as_of, self.window))
    }
}
