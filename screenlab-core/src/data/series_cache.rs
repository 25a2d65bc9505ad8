//! Per-run memoized historical-series cache with bounded fan-out.
//!
//! Population is one task per instrument on a private 16-worker pool; the
//! result map is assembled by unordered join and handed downstream only
//! once every task has finished. A per-instrument fetch failure is logged
//! and leaves that instrument absent — sibling tasks are never aborted.
//!
//! The lookback window and the bypass-cache freshness flag are computed
//! exactly once per population call and applied uniformly to every
//! instrument; the wall clock is never re-read per instrument.

use super::{FetchError, MarketDataFetcher, SnapshotCache};
use crate::calendar::TradingCalendar;
use crate::domain::{InstrumentKey, Series};
use chrono::{NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, error};

/// Default worker count for history population.
pub const DEFAULT_SERIES_WORKERS: usize = 16;

pub type SeriesMap = HashMap<InstrumentKey, Arc<Series>>;

type Slot = Arc<OnceLock<Result<Arc<SeriesMap>, FetchError>>>;

pub struct SeriesCache {
    fetcher: Arc<dyn MarketDataFetcher>,
    snapshots: Arc<SnapshotCache>,
    calendar: Arc<TradingCalendar>,
    pool: rayon::ThreadPool,
    slots: Mutex<HashMap<NaiveDate, Slot>>,
}

impl SeriesCache {
    pub fn new(
        fetcher: Arc<dyn MarketDataFetcher>,
        snapshots: Arc<SnapshotCache>,
        calendar: Arc<TradingCalendar>,
    ) -> Self {
        Self::with_workers(fetcher, snapshots, calendar, DEFAULT_SERIES_WORKERS)
    }

    pub fn with_workers(
        fetcher: Arc<dyn MarketDataFetcher>,
        snapshots: Arc<SnapshotCache>,
        calendar: Arc<TradingCalendar>,
        workers: usize,
    ) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build()
            .expect("failed to build series worker pool");
        Self {
            fetcher,
            snapshots,
            calendar,
            pool,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// The history map for `date`.
    ///
    /// With `instruments = None` the universe comes from the day's
    /// snapshot and the result is memoized per date for the cache's
    /// lifetime. An explicit instrument list bypasses the memo and is
    /// populated fresh on every call.
    pub fn get(
        &self,
        date: NaiveDate,
        instruments: Option<&[InstrumentKey]>,
        now: NaiveDateTime,
    ) -> Result<Arc<SeriesMap>, FetchError> {
        if let Some(keys) = instruments {
            return self.populate(date, keys.to_vec(), now);
        }

        let slot = {
            let mut slots = self.slots.lock().expect("series slot map poisoned");
            Arc::clone(slots.entry(date).or_default())
        };

        slot.get_or_init(|| {
            let keys = self.snapshots.get(date)?.keys();
            self.populate(date, keys, now)
        })
        .clone()
    }

    fn populate(
        &self,
        date: NaiveDate,
        keys: Vec<InstrumentKey>,
        now: NaiveDateTime,
    ) -> Result<Arc<SeriesMap>, FetchError> {
        // Window and freshness flag: once per call, shared by every task.
        let window = self.calendar.history_window(date, now);
        let total = keys.len();

        let map: SeriesMap = self.pool.install(|| {
            keys.into_par_iter()
                .filter_map(|key| {
                    match self.fetcher.fetch_series(
                        &key.code,
                        &key.name,
                        window.start,
                        window.bypass_cache,
                    ) {
                        Ok(series) if !series.is_empty() => Some((key, Arc::new(series))),
                        Ok(_) => {
                            debug!(stage = "series", %date, code = %key.code, "empty series");
                            None
                        }
                        Err(e) => {
                            error!(
                                stage = "series",
                                %date,
                                code = %key.code,
                                error = %e,
                                "history fetch failed"
                            );
                            None
                        }
                    }
                })
                .collect()
        });

        if map.is_empty() {
            return Err(FetchError::Other(format!(
                "no history fetched for {date} ({total} instruments attempted)"
            )));
        }
        Ok(Arc::new(map))
    }
}
