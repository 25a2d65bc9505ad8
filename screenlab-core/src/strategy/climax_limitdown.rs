//! Volume-climax limit-down — a near-limit-down close on heavy turnover
//! and at least four times the recent average volume.

use super::volume_surge::MIN_AMOUNT;
use super::{ma, EvalError, Strategy};
use crate::domain::{InstrumentKey, Series};
use chrono::NaiveDate;

pub const DEFAULT_WINDOW: usize = 60;

#[derive(Debug, Clone)]
pub struct ClimaxLimitDown {
    window: usize,
}

impl ClimaxLimitDown {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "window must be >= 1");
        Self { window }
    }
}

impl Default for ClimaxLimitDown {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

fn climaxes(series: &Series, as_of: NaiveDate, window: usize) -> bool {
    let bars = series.up_to(as_of);
    if bars.len() < window {
        return false;
    }

    let last = &bars[bars.len() - 1];
    if last.pct_change > -9.5 {
        return false;
    }

    if bars.len() < window + 1 {
        return false;
    }

    if last.close * (last.volume as f64) < MIN_AMOUNT {
        return false;
    }

    let vol_ma5 = ma::sma_or_zero(&ma::volumes(bars), 5);
    let baseline = vol_ma5[bars.len() - 2];
    baseline > 0.0 && last.volume as f64 / baseline >= 4.0
}

impl Strategy for ClimaxLimitDown {
    fn name(&self) -> &str {
        "climax_limitdown"
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
        Ok(climaxes(series, as_of, self.window))
    }
}
