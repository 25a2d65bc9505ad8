//! Per-run memoized full-market snapshot cache.
//!
//! One fetch per distinct date for the lifetime of the cache, success or
//! failure — a failed fetch is memoized as failure and never retried here
//! (retries belong to the fetch collaborator). Double-checked lazy-init:
//! the slot map is mutex-guarded, population runs behind a per-date
//! `OnceLock`, and populated slots are read-only afterwards.

use super::{FetchError, MarketDataFetcher};
use crate::domain::Snapshot;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::error;

type Slot = Arc<OnceLock<Result<Arc<Snapshot>, FetchError>>>;

pub struct SnapshotCache {
    fetcher: Arc<dyn MarketDataFetcher>,
    slots: Mutex<HashMap<NaiveDate, Slot>>,
}

impl SnapshotCache {
    pub fn new(fetcher: Arc<dyn MarketDataFetcher>) -> Self {
        Self {
            fetcher,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// The snapshot for `date`, fetching on first request only.
    ///
    /// Distinct dates hold distinct slots and may coexist; concurrent
    /// requests for the same date block until the single population
    /// finishes.
    pub fn get(&self, date: NaiveDate) -> Result<Arc<Snapshot>, FetchError> {
        let slot = {
            let mut slots = self.slots.lock().expect("snapshot slot map poisoned");
            Arc::clone(slots.entry(date).or_default())
        };

        slot.get_or_init(|| {
            self.fetcher.fetch_snapshot(date).map(Arc::new).map_err(|e| {
                error!(stage = "snapshot", %date, error = %e, "snapshot fetch failed");
                e
            })
        })
        .clone()
    }

    /// Number of dates with a populated slot (success or failure).
    pub fn populated_dates(&self) -> usize {
        self.slots
            .lock()
            .expect("snapshot slot map poisoned")
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Series, SnapshotRow};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counting stub: returns a one-row snapshot, or fails for a
    /// designated date.
    struct StubFetcher {
        calls: AtomicUsize,
        fail_on: Option<NaiveDate>,
    }

    impl StubFetcher {
        fn new(fail_on: Option<NaiveDate>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on,
            }
        }
    }

    impl MarketDataFetcher for StubFetcher {
        fn name(&self) -> &str {
            "stub"
        }

        fn fetch_calendar(&self) -> Result<HashSet<NaiveDate>, FetchError> {
            Ok(HashSet::new())
        }

        fn fetch_snapshot(&self, date: NaiveDate) -> Result<Snapshot, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(date) {
                return Err(FetchError::NoSnapshot { date });
            }
            Ok(Snapshot::new(
                date,
                vec![SnapshotRow {
                    code: "600000".into(),
                    name: "Bank A".into(),
                    price: 10.0,
                    pct_change: 0.0,
                    volume: 1,
                    turnover: 10.0,
                }],
            ))
        }

        fn fetch_series(
            &self,
            _code: &str,
            _name: &str,
            _start: NaiveDate,
            _bypass_cache: bool,
        ) -> Result<Series, FetchError> {
            Ok(Series::default())
        }

        fn fetch_top_entities(&self, _date: NaiveDate) -> Result<HashSet<String>, FetchError> {
            Ok(HashSet::new())
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn second_request_hits_memo() {
        let fetcher = Arc::new(StubFetcher::new(None));
        let cache = SnapshotCache::new(Arc::clone(&fetcher) as Arc<dyn MarketDataFetcher>);

        let first = cache.get(d(2)).unwrap();
        let second = cache.get(d(2)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn distinct_dates_coexist() {
        let fetcher = Arc::new(StubFetcher::new(None));
        let cache = SnapshotCache::new(Arc::clone(&fetcher) as Arc<dyn MarketDataFetcher>);

        cache.get(d(2)).unwrap();
        cache.get(d(3)).unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.populated_dates(), 2);
        // Neither evicted the other.
        cache.get(d(2)).unwrap();
        cache.get(d(3)).unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failure_is_memoized() {
        let fetcher = Arc::new(StubFetcher::new(Some(d(2))));
        let cache = SnapshotCache::new(Arc::clone(&fetcher) as Arc<dyn MarketDataFetcher>);

        assert!(cache.get(d(2)).is_err());
        assert!(cache.get(d(2)).is_err());
        // No automatic retry inside the cache.
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }
}
