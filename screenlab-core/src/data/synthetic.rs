//! Synthetic data provider — deterministic random walks for tests, demos,
//! and offline runs.
//!
//! Each instrument's series is generated from a seed derived from its code,
//! so repeated fetches return identical data and fetch-count assertions in
//! tests stay meaningful.

use super::{FetchError, MarketDataFetcher};
use crate::domain::{Bar, Series, Snapshot, SnapshotRow};
use chrono::{Datelike, Days, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

/// Weekday-only synthetic market with a fixed instrument list.
pub struct SyntheticFetcher {
    codes: Vec<(String, String)>,
    seed: u64,
}

impl SyntheticFetcher {
    pub fn new(instruments: usize, seed: u64) -> Self {
        let codes = (0..instruments)
            .map(|i| (format!("{:06}", 600_000 + i), format!("Synthetic {i}")))
            .collect();
        Self { codes, seed }
    }

    fn instrument_seed(&self, code: &str) -> u64 {
        let mut hash = self.seed;
        for byte in code.bytes() {
            hash = hash.wrapping_mul(31).wrapping_add(u64::from(byte));
        }
        hash
    }

    fn walk(&self, code: &str, start: NaiveDate, end: NaiveDate) -> Series {
        let mut rng = StdRng::seed_from_u64(self.instrument_seed(code));
        let mut close = 5.0 + rng.gen_range(0.0..45.0);
        let mut bars = Vec::new();
        let mut date = start;
        while date <= end {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                let pct_change: f64 = rng.gen_range(-4.0..4.0);
                let prev_close = close;
                close = (prev_close * (1.0 + pct_change / 100.0)).max(0.01);
                let open = prev_close * (1.0 + rng.gen_range(-1.0..1.0) / 100.0);
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..1.0) / 100.0);
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..1.0) / 100.0);
                bars.push(Bar {
                    date,
                    open,
                    high,
                    low,
                    close,
                    volume: rng.gen_range(1_000_000..50_000_000),
                    pct_change: (pct_change * 100.0).round() / 100.0,
                });
            }
            match date.checked_add_days(Days::new(1)) {
                Some(next) => date = next,
                None => break,
            }
        }
        Series::new(bars)
    }

    /// Upper bound of the generated range: a fixed horizon keeps the
    /// provider deterministic regardless of wall-clock time.
    fn horizon() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 31).expect("valid horizon date")
    }
}

impl MarketDataFetcher for SyntheticFetcher {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_calendar(&self) -> Result<HashSet<NaiveDate>, FetchError> {
        let mut dates = HashSet::new();
        let mut date = NaiveDate::from_ymd_opt(2018, 1, 1).expect("valid epoch date");
        while date <= Self::horizon() {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                dates.insert(date);
            }
            match date.checked_add_days(Days::new(1)) {
                Some(next) => date = next,
                None => break,
            }
        }
        Ok(dates)
    }

    fn fetch_snapshot(&self, date: NaiveDate) -> Result<Snapshot, FetchError> {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return Err(FetchError::NoSnapshot { date });
        }
        let rows = self
            .codes
            .iter()
            .map(|(code, name)| {
                let series = self.walk(code, date.checked_sub_days(Days::new(10)).unwrap_or(date), date);
                let last = series.bars().last();
                SnapshotRow {
                    code: code.clone(),
                    name: name.clone(),
                    price: last.map_or(10.0, |b| b.close),
                    pct_change: last.map_or(0.0, |b| b.pct_change),
                    volume: last.map_or(0, |b| b.volume),
                    turnover: last.map_or(0.0, |b| b.close * b.volume as f64),
                }
            })
            .collect();
        Ok(Snapshot::new(date, rows))
    }

    fn fetch_series(
        &self,
        code: &str,
        _name: &str,
        start: NaiveDate,
        _bypass_cache: bool,
    ) -> Result<Series, FetchError> {
        Ok(self.walk(code, start, Self::horizon()))
    }

    fn fetch_top_entities(&self, _date: NaiveDate) -> Result<HashSet<String>, FetchError> {
        // A stable slice of the universe stands in for the leaderboard.
        Ok(self
            .codes
            .iter()
            .take(self.codes.len() / 10)
            .map(|(code, _)| code.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn repeated_fetches_are_identical() {
        let fetcher = SyntheticFetcher::new(3, 7);
        let a = fetcher
            .fetch_series("600000", "x", d(2024, 1, 1), false)
            .unwrap();
        let b = fetcher
            .fetch_series("600000", "x", d(2024, 1, 1), false)
            .unwrap();
        assert_eq!(a.len(), b.len());
        assert_eq!(a.bars()[5].close, b.bars()[5].close);
    }

    #[test]
    fn distinct_codes_get_distinct_walks() {
        let fetcher = SyntheticFetcher::new(3, 7);
        let a = fetcher
            .fetch_series("600000", "x", d(2024, 1, 1), false)
            .unwrap();
        let b = fetcher
            .fetch_series("600001", "x", d(2024, 1, 1), false)
            .unwrap();
        assert_ne!(a.bars()[5].close, b.bars()[5].close);
    }

    #[test]
    fn series_skips_weekends_and_ascends() {
        let fetcher = SyntheticFetcher::new(1, 7);
        let series = fetcher
            .fetch_series("600000", "x", d(2024, 1, 1), false)
            .unwrap();
        assert!(series.is_strictly_ascending());
        assert!(series
            .bars()
            .iter()
            .all(|b| !matches!(b.date.weekday(), Weekday::Sat | Weekday::Sun)));
    }

    #[test]
    fn calendar_covers_weekdays_only() {
        let fetcher = SyntheticFetcher::new(1, 7);
        let calendar = fetcher.fetch_calendar().unwrap();
        assert!(calendar.contains(&d(2024, 1, 2))); // Tuesday
        assert!(!calendar.contains(&d(2024, 1, 6))); // Saturday
    }

    #[test]
    fn snapshot_has_one_row_per_instrument() {
        let fetcher = SyntheticFetcher::new(5, 7);
        let snap = fetcher.fetch_snapshot(d(2024, 1, 2)).unwrap();
        assert_eq!(snap.len(), 5);
        assert!(fetcher.fetch_snapshot(d(2024, 1, 6)).is_err());
    }
}
