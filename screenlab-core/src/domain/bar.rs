//! Bar and Series — the fundamental market data units.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV record for a single instrument.
///
/// `pct_change` is the day's percent change of close versus the previous
/// close, as delivered by the data source (so the first bar of a fetch
/// window still carries a meaningful value).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub pct_change: f64,
}

impl Bar {
    /// Basic OHLC sanity check: high >= low, prices positive.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// Date-ascending sequence of bars for one instrument.
///
/// Owned by the series cache and shared read-only; strategies that need
/// derived columns (moving averages) compute them into fresh local vectors
/// and never write back into the cached series.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Series {
    bars: Vec<Bar>,
}

impl Series {
    /// Build a series from bars, sorting by date ascending.
    pub fn new(mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.date);
        Self { bars }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Bars with `date <= as_of` — the evaluation slice every predicate
    /// starts from.
    pub fn up_to(&self, as_of: NaiveDate) -> &[Bar] {
        let end = self.bars.partition_point(|b| b.date <= as_of);
        &self.bars[..end]
    }

    /// Bars with `date >= from` — the forward slice backtesting starts from.
    pub fn from_date(&self, from: NaiveDate) -> &[Bar] {
        let start = self.bars.partition_point(|b| b.date < from);
        &self.bars[start..]
    }

    /// Dates are strictly increasing (no duplicates, no disorder).
    pub fn is_strictly_ascending(&self) -> bool {
        self.bars.windows(2).all(|w| w[0].date < w[1].date)
    }
}

/// Trailing `n` bars of a slice (the whole slice if shorter).
pub fn tail(bars: &[Bar], n: usize) -> &[Bar] {
    &bars[bars.len().saturating_sub(n)..]
}

/// Leading `n` bars of a slice (the whole slice if shorter).
pub fn head(bars: &[Bar], n: usize) -> &[Bar] {
    &bars[..n.min(bars.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: NaiveDate, close: f64) -> Bar {
        Bar {
            date,
            open: close - 0.5,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000,
            pct_change: 0.0,
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn new_sorts_by_date() {
        let series = Series::new(vec![bar(d(3), 3.0), bar(d(1), 1.0), bar(d(2), 2.0)]);
        assert!(series.is_strictly_ascending());
        assert_eq!(series.bars()[0].close, 1.0);
        assert_eq!(series.bars()[2].close, 3.0);
    }

    #[test]
    fn up_to_is_inclusive() {
        let series = Series::new((1..=5).map(|i| bar(d(i), i as f64)).collect());
        let slice = series.up_to(d(3));
        assert_eq!(slice.len(), 3);
        assert_eq!(slice.last().unwrap().date, d(3));
    }

    #[test]
    fn up_to_skips_absent_dates() {
        // Non-trading day between bars: slicing at it keeps earlier bars.
        let series = Series::new(vec![bar(d(1), 1.0), bar(d(4), 4.0)]);
        assert_eq!(series.up_to(d(2)).len(), 1);
        assert_eq!(series.up_to(d(4)).len(), 2);
    }

    #[test]
    fn from_date_is_inclusive() {
        let series = Series::new((1..=5).map(|i| bar(d(i), i as f64)).collect());
        let slice = series.from_date(d(3));
        assert_eq!(slice.len(), 3);
        assert_eq!(slice.first().unwrap().date, d(3));
    }

    #[test]
    fn tail_and_head_clamp() {
        let series = Series::new((1..=3).map(|i| bar(d(i), i as f64)).collect());
        assert_eq!(tail(series.bars(), 2).len(), 2);
        assert_eq!(tail(series.bars(), 10).len(), 3);
        assert_eq!(head(series.bars(), 2)[1].date, d(2));
        assert_eq!(head(series.bars(), 10).len(), 3);
    }

    #[test]
    fn bar_sanity() {
        assert!(bar(d(1), 10.0).is_sane());
        let mut b = bar(d(1), 10.0);
        b.high = b.low - 1.0;
        assert!(!b.is_sane());
    }
}
