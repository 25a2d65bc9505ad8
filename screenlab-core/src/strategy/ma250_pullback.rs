//! Pullback to the 250-day moving average — a breakout above the yearly
//! average followed by a shallow, low-volume retest that holds the line.
//!
//! Over a 60-bar tail: the segment before the window high must cross the
//! MA250 from below to above; every bar from the high onwards must stay at
//! or above it; the post-high low must come 10-50 calendar days after the
//! high, on less than half the volume, more than 20% below the high.

use super::{ma, EvalError, Strategy};
use crate::domain::{InstrumentKey, Series};
use chrono::NaiveDate;

pub const DEFAULT_WINDOW: usize = 60;

/// Bars needed before the yearly average is meaningful.
const MIN_HISTORY: usize = 250;

const MA_PERIOD: usize = 250;

#[derive(Debug, Clone)]
pub struct Ma250Pullback {
    window: usize,
}

impl Ma250Pullback {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "window must be >= 1");
        Self { window }
    }
}

impl Default for Ma250Pullback {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

fn pulls_back(series: &Series, as_of: NaiveDate, window: usize) -> bool {
    let bars = series.up_to(as_of);
    if bars.len() < MIN_HISTORY {
        return false;
    }

    let ma250 = ma::sma_or_zero(&ma::closes(bars), MA_PERIOD);
    let tail_start = bars.len() - window.min(bars.len());

    // Window high: first occurrence of the maximum close.
    let mut hi = tail_start;
    for i in tail_start..bars.len() {
        if bars[i].close > bars[hi].close {
            hi = i;
        }
    }
    if bars[hi].volume == 0 {
        return false;
    }

    // Front segment must cross the average from below to above.
    if hi == tail_start {
        return false;
    }
    if !(bars[tail_start].close < ma250[tail_start] && bars[hi - 1].close > ma250[hi - 1]) {
        return false;
    }

    // Back segment (high included) must hold the average; track its low.
    let mut lo = hi;
    for i in hi..bars.len() {
        if bars[i].close < ma250[i] {
            return false;
        }
        if bars[i].close < bars[lo].close {
            lo = i;
        }
    }

    let gap_days = (bars[lo].date - bars[hi].date).num_days();
    if !(10..=50).contains(&gap_days) {
        return false;
    }

    if bars[lo].volume == 0 {
        return false;
    }
    let vol_ratio = bars[hi].volume as f64 / bars[lo].volume as f64;
    let retrace = bars[lo].close / bars[hi].close;
    vol_ratio > 2.0 && retrace < 0.8
}

impl Strategy for Ma250Pullback {
    fn name(&self) -> &str {
        "ma250_pullback"
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
        Ok(pulls_back(series, as_of, self.window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, Series};
    use crate::strategy::{last_date, test_key};
    use chrono::Duration;

    /// Hand-built 320-bar scenario. A 260-bar prefix at 10.0 keeps the
    /// MA250 near 10 across the whole 60-bar tail; the tail dips below
    /// the average, crosses back up, spikes to 20, then retests 20
    /// calendar days later.
    fn pullback_series(hi_volume: u64, lo_volume: u64, lo_close: f64) -> Series {
        let base = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let mut bars: Vec<Bar> = Vec::new();
        let mut push = |bars: &mut Vec<Bar>, i: usize, close: f64, volume: u64| {
            bars.push(Bar {
                date: base + Duration::days(i as i64),
                open: close,
                high: close + 0.5,
                low: close - 0.5,
                close,
                volume,
                pct_change: 0.0,
            });
        };

        for i in 0..260 {
            push(&mut bars, i, 10.0, 10_000_000);
        }
        // Tail of 60 bars starts at index 260.
        push(&mut bars, 260, 9.0, 10_000_000); // below the average
        for i in 261..270 {
            push(&mut bars, i, 10.5, 10_000_000); // crossed back above
        }
        push(&mut bars, 270, 20.0, hi_volume); // the high
        for i in 271..290 {
            push(&mut bars, i, 18.0, 10_000_000); // holding well above
        }
        push(&mut bars, 290, lo_close, lo_volume); // retest, 20 days later
        for i in 291..320 {
            push(&mut bars, i, 18.5, 10_000_000);
        }
        Series::new(bars)
    }

    #[test]
    fn textbook_pullback_matches() {
        let series = pullback_series(50_000_000, 10_000_000, 15.0);
        let as_of = last_date(&series);
        let strategy = Ma250Pullback::default();
        assert!(strategy
            .matches(&test_key(as_of), &series, as_of, false)
            .unwrap());
    }

    #[test]
    fn no_volume_contraction_is_no_match() {
        let series = pullback_series(10_000_000, 10_000_000, 15.0);
        let as_of = last_date(&series);
        assert!(!pulls_back(&series, as_of, 60));
    }

    #[test]
    fn shallow_retrace_is_no_match() {
        // Low at 17 is only 15% off the high; the rule wants > 20%.
        let series = pullback_series(50_000_000, 10_000_000, 17.0);
        let as_of = last_date(&series);
        assert!(!pulls_back(&series, as_of, 60));
    }

    #[test]
    fn break_below_average_is_no_match() {
        let series = pullback_series(50_000_000, 10_000_000, 15.0);
        let mut bars = series.bars().to_vec();
        bars[300].close = 8.0; // back segment loses the average
        let series = Series::new(bars);
        let as_of = last_date(&series);
        assert!(!pulls_back(&series, as_of, 60));
    }

    #[test]
    fn retest_too_soon_is_no_match() {
        let series = pullback_series(50_000_000, 10_000_000, 15.0);
        let mut bars = series.bars().to_vec();
        // Pull the low to 5 days after the high instead of 20.
        bars[290].close = 18.0;
        bars[275].close = 15.0;
        bars[275].volume = 10_000_000;
        let series = Series::new(bars);
        let as_of = last_date(&series);
        assert!(!pulls_back(&series, as_of, 60));
    }

    #[test]
    fn short_history_fails_closed() {
        let series = pullback_series(50_000_000, 10_000_000, 15.0);
        let bars = series.bars()[..240].to_vec();
        let series = Series::new(bars);
        assert!(!pulls_back(&series, last_date(&series), 60));
    }
}
