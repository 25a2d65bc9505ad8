//! Moving-average alignment — the 30-day average rises monotonically
//! through the window and gains at least 20% over it.
//!
//! Sampled at four points of the 30-bar tail (start, one third, two
//! thirds, end): each sample must exceed the previous, and the final
//! average must be at least 1.2x the first.

use super::{ma, EvalError, Strategy};
use crate::domain::{InstrumentKey, Series};
use chrono::NaiveDate;

pub const DEFAULT_WINDOW: usize = 30;

const MA_PERIOD: usize = 30;

#[derive(Debug, Clone)]
pub struct MaAlignment {
    window: usize,
}

impl MaAlignment {
    pub fn new(window: usize) -> Self {
        assert!(window >= 2, "window must be >= 2");
        Self { window }
    }
}

impl Default for MaAlignment {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

fn aligned(series: &Series, as_of: NaiveDate, window: usize) -> bool {
    let bars = series.up_to(as_of);
    if bars.len() < window {
        return false;
    }

    let ma30 = ma::sma_or_zero(&ma::closes(bars), MA_PERIOD);
    let tail_start = bars.len() - window;

    let first = ma30[tail_start];
    let third = ma30[tail_start + window / 3];
    let two_thirds = ma30[tail_start + 2 * window / 3];
    let last = ma30[bars.len() - 1];

    first < third && third < two_thirds && two_thirds < last && last >= 1.2 * first
}

impl Strategy for MaAlignment {
    fn name(&self) -> &str {
        "ma_alignment"
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
        Ok(aligned(series, as_of, self.window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{last_date, make_series, test_key};

    #[test]
    fn steep_uptrend_aligns() {
        // 90 bars climbing 2% a day: MA30 rises throughout the tail and
        // far more than 20% across it.
        let closes: Vec<f64> = (0..90).map(|i| 10.0 * 1.02f64.powi(i)).collect();
        let series = make_series(&closes);
        let as_of = last_date(&series);
        let strategy = MaAlignment::default();
        assert!(strategy
            .matches(&test_key(as_of), &series, as_of, false)
            .unwrap());
    }

    #[test]
    fn flat_series_is_no_match() {
        let series = make_series(&vec![10.0; 90]);
        let as_of = last_date(&series);
        assert!(!aligned(&series, as_of, 30));
    }

    #[test]
    fn rising_but_shallow_is_no_match() {
        // Rising steadily, but the final MA30 only gains ~6% over the tail.
        let closes: Vec<f64> = (0..90).map(|i| 10.0 * 1.002f64.powi(i)).collect();
        let series = make_series(&closes);
        let as_of = last_date(&series);
        assert!(!aligned(&series, as_of, 30));
    }

    #[test]
    fn exactly_window_bars_has_unready_average() {
        // With 30 bars the first three samples read the zero fill: the
        // strictly-increasing chain breaks and the predicate stays false.
        let closes: Vec<f64> = (0..30).map(|i| 10.0 * 1.02f64.powi(i)).collect();
        let series = make_series(&closes);
        let as_of = last_date(&series);
        assert!(!aligned(&series, as_of, 30));
    }

    #[test]
    fn short_series_fails_closed() {
        let series = make_series(&vec![10.0; 10]);
        let as_of = last_date(&series);
        assert!(!aligned(&series, as_of, 30));
    }
}
