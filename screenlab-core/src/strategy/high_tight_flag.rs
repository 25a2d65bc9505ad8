//! High tight flag — a near-doubling in two weeks driven by consecutive
//! limit-ups, gated on the per-date leaderboard.
//!
//! This is the one predicate with an auxiliary per-date input: it only
//! fires for instruments flagged on the day's top-entity dataset. Within
//! bars 11-24 back from the anchor (a 14-bar slice), the slice-end high
//! must be at least 1.9x the slice low, and at least two consecutive bars
//! must each gain 9.5% or more.

use super::{EvalError, Strategy};
use crate::domain::{bar, InstrumentKey, Series};
use chrono::NaiveDate;

pub const DEFAULT_WINDOW: usize = 60;

/// How far back the flag pole is allowed to sit.
const POLE_OFFSET: usize = 24;

/// Length of the pole slice.
const POLE_LEN: usize = 14;

#[derive(Debug, Clone)]
pub struct HighTightFlag {
    window: usize,
}

impl HighTightFlag {
    pub fn new(window: usize) -> Self {
        assert!(window >= POLE_OFFSET, "window must cover the pole slice");
        Self { window }
    }
}

impl Default for HighTightFlag {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

fn flies(series: &Series, as_of: NaiveDate, window: usize, flagged: bool) -> bool {
    if !flagged {
        return false;
    }

    let bars = series.up_to(as_of);
    if bars.len() < window {
        return false;
    }

    let tail = bar::tail(bars, window);
    let pole = bar::head(bar::tail(tail, POLE_OFFSET), POLE_LEN);

    let low = pole.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    if low <= 0.0 {
        return false;
    }
    if pole[pole.len() - 1].high / low < 1.9 {
        return false;
    }

    let mut previous = 0.0;
    for b in pole {
        if b.pct_change >= 9.5 {
            if previous >= 9.5 {
                return true;
            }
            previous = b.pct_change;
        } else {
            previous = 0.0;
        }
    }
    false
}

impl Strategy for HighTightFlag {
    fn name(&self) -> &str {
        "high_tight_flag"
    }

    fn window(&self) -> usize {
        self.window
    }

    fn needs_top_entities(&self) -> bool {
        true
    }

    fn matches(
        &self,
        _key: &InstrumentKey,
        series: &Series,
        as_of: NaiveDate,
        flagged: bool,
    ) -> Result<bool, EvalError> {
        Ok(flies(series, as_of, self.window, flagged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, Series};
    use crate::strategy::{last_date, test_key};
    use chrono::Duration;

    fn bar(i: usize, close: f64, pct_change: f64) -> Bar {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Bar {
            date: base + Duration::days(i as i64),
            open: close,
            high: close + 0.1,
            low: close - 0.1,
            close,
            volume: 10_000_000,
            pct_change,
        }
    }

    /// 60 bars; the pole slice (indices 36..49 of the series) doubles off
    /// its low with two consecutive limit-ups, then drifts sideways.
    fn flag_series() -> Series {
        let mut bars: Vec<Bar> = (0..36).map(|i| bar(i, 10.0, 0.0)).collect();
        bars.push(bar(36, 10.0, 0.0)); // pole low: low = 9.9
        bars.push(bar(37, 11.0, 10.0));
        bars.push(bar(38, 12.1, 10.0)); // consecutive limit-ups
        for i in 39..49 {
            bars.push(bar(i, 19.0, 2.0));
        }
        bars.push(bar(49, 19.9, 1.0)); // slice end: high = 20.0, 20/9.9 > 1.9
        for i in 50..60 {
            bars.push(bar(i, 19.5, 0.0));
        }
        Series::new(bars)
    }

    #[test]
    fn flagged_pole_matches() {
        let series = flag_series();
        let as_of = last_date(&series);
        let strategy = HighTightFlag::default();
        assert!(strategy
            .matches(&test_key(as_of), &series, as_of, true)
            .unwrap());
    }

    #[test]
    fn unflagged_instrument_never_matches() {
        let series = flag_series();
        let as_of = last_date(&series);
        let strategy = HighTightFlag::default();
        assert!(!strategy
            .matches(&test_key(as_of), &series, as_of, false)
            .unwrap());
    }

    #[test]
    fn single_limit_up_is_no_match() {
        let series = flag_series();
        let mut bars = series.bars().to_vec();
        bars[38].pct_change = 5.0; // break the consecutive pair
        let series = Series::new(bars);
        let as_of = last_date(&series);
        assert!(!flies(&series, as_of, 60, true));
    }

    #[test]
    fn shallow_pole_is_no_match() {
        // Same limit-up pair but the slice never gets far off its low.
        let mut bars: Vec<Bar> = (0..36).map(|i| bar(i, 10.0, 0.0)).collect();
        bars.push(bar(36, 10.0, 0.0));
        bars.push(bar(37, 11.0, 10.0));
        bars.push(bar(38, 12.1, 10.0));
        for i in 39..50 {
            bars.push(bar(i, 12.5, 0.5)); // 12.6/9.9 < 1.9
        }
        for i in 50..60 {
            bars.push(bar(i, 12.5, 0.0));
        }
        let series = Series::new(bars);
        let as_of = last_date(&series);
        assert!(!flies(&series, as_of, 60, true));
    }

    #[test]
    fn short_series_fails_closed() {
        let bars: Vec<Bar> = (0..30).map(|i| bar(i, 10.0, 0.0)).collect();
        let series = Series::new(bars);
        let as_of = last_date(&series);
        assert!(!flies(&series, as_of, 60, true));
    }
}
