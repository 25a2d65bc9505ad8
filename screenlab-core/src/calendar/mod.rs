//! Trading calendar — authoritative set of trading dates plus the session
//! clock used to pick a run date.
//!
//! The calendar is loaded once per process from the data collaborator and is
//! immutable afterwards. A failed load produces an *empty* calendar: every
//! membership test fails closed and the walking helpers degenerate to a
//! single day-step. Callers must treat the load error itself as fatal for
//! the run — an empty calendar is never silently usable.

pub mod session;

pub use session::{SessionPhase, AFTERNOON_CLOSE, CONTINUOUS_OPEN, MORNING_AUCTION_OPEN};

use chrono::{Days, NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use thiserror::Error;

/// Calendar failures are fatal for date resolution; they are surfaced at
/// load time, never masked as "not a trading day".
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("trading calendar unavailable: {0}")]
    Unavailable(String),

    #[error("trading calendar source returned no dates")]
    Empty,
}

/// Walk guard: never scan more than ten years for a neighbouring trading
/// day. Past the calendar's range the probe date is returned as-is.
const MAX_WALK_DAYS: u32 = 3_660;

/// Immutable set of trading dates with O(1) membership.
#[derive(Debug, Clone, Default)]
pub struct TradingCalendar {
    dates: HashSet<NaiveDate>,
}

impl TradingCalendar {
    pub fn new(dates: HashSet<NaiveDate>) -> Self {
        Self { dates }
    }

    /// An empty calendar: all lookups fail closed.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the calendar from the data collaborator, once per process.
    ///
    /// The error is fatal for any date-resolution operation; callers must
    /// surface it rather than fall back to "not a trading day".
    pub fn load(fetcher: &dyn crate::data::MarketDataFetcher) -> Result<Self, CalendarError> {
        let dates = fetcher
            .fetch_calendar()
            .map_err(|e| CalendarError::Unavailable(e.to_string()))?;
        if dates.is_empty() {
            return Err(CalendarError::Empty);
        }
        Ok(Self::new(dates))
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn is_trading_date(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    /// The `count`-th trading day strictly before `date`.
    ///
    /// On an empty calendar this degenerates to stepping back one calendar
    /// day per count.
    pub fn previous_trading_date(&self, date: NaiveDate, count: u32) -> NaiveDate {
        let mut current = date;
        for _ in 0..count.max(1) {
            current = self.step(current, Direction::Back);
        }
        current
    }

    /// The first trading day strictly after `date`.
    pub fn next_trading_date(&self, date: NaiveDate) -> NaiveDate {
        self.step(date, Direction::Forward)
    }

    fn step(&self, date: NaiveDate, direction: Direction) -> NaiveDate {
        let advance = |d: NaiveDate| match direction {
            Direction::Back => d.checked_sub_days(Days::new(1)),
            Direction::Forward => d.checked_add_days(Days::new(1)),
        };

        let Some(mut probe) = advance(date) else {
            return date;
        };
        if self.dates.is_empty() {
            return probe;
        }
        for _ in 0..MAX_WALK_DAYS {
            if self.dates.contains(&probe) {
                return probe;
            }
            match advance(probe) {
                Some(next) => probe = next,
                None => return probe,
            }
        }
        probe
    }

    /// The two candidate run dates for "now":
    ///
    /// - `finalized` — the latest trading day whose session has closed;
    /// - `latest` — the latest trading day with any data at all, which is
    ///   today as soon as the market has opened (the session may still be
    ///   running).
    pub fn latest_trade_dates(&self, now: NaiveDateTime) -> LatestDates {
        let today = now.date();
        let mut finalized = today;
        let mut latest = today;

        if self.is_trading_date(today) {
            if !session::is_closed(now.time()) {
                finalized = self.previous_trading_date(today, 1);
                if !session::is_open(now.time()) {
                    latest = finalized;
                }
            }
        } else {
            finalized = self.previous_trading_date(today, 1);
            latest = finalized;
        }

        LatestDates { finalized, latest }
    }

    /// Lookback window for a history fetch anchored at `as_of`.
    ///
    /// The start date is three years of calendar days before the anchor.
    /// `bypass_cache` is true only while a live session for `as_of` itself
    /// is still running — computed once here, applied uniformly to every
    /// instrument in the batch.
    pub fn history_window(&self, as_of: NaiveDate, now: NaiveDateTime) -> HistoryWindow {
        let start = as_of
            .checked_sub_days(Days::new(365 * 3))
            .unwrap_or(as_of);

        let in_progress = as_of == now.date()
            && self.is_trading_date(as_of)
            && session::is_open(now.time())
            && !session::is_closed(now.time());

        HistoryWindow {
            start,
            bypass_cache: in_progress,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Back,
    Forward,
}

/// Result of [`TradingCalendar::latest_trade_dates`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestDates {
    pub finalized: NaiveDate,
    pub latest: NaiveDate,
}

/// Result of [`TradingCalendar::history_window`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    pub start: NaiveDate,
    pub bypass_cache: bool,
}
