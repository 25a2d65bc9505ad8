//! Market data collaborator trait and structured error types.

use crate::domain::{Series, Snapshot};
use chrono::NaiveDate;
use std::collections::HashSet;
use thiserror::Error;

/// Structured error types for data operations.
///
/// Cloneable so a memoized failure can be handed to every later caller of
/// the same cache slot.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("instrument not found: {code}")]
    InstrumentNotFound { code: String },

    #[error("no snapshot available for {date}")]
    NoSnapshot { date: NaiveDate },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Upstream data source for the pipeline.
///
/// Each method may fail; failures propagate as errors with no implicit
/// retry in the core. Retry policy, rate limiting, and wire formats are
/// the implementation's concern.
pub trait MarketDataFetcher: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// The full set of trading dates known to the source.
    fn fetch_calendar(&self) -> Result<HashSet<NaiveDate>, FetchError>;

    /// Full-market cross-sectional quote table for one date.
    fn fetch_snapshot(&self, date: NaiveDate) -> Result<Snapshot, FetchError>;

    /// Daily history for one instrument from `start` to the latest
    /// available bar. `bypass_cache` forces a fresh upstream read while a
    /// live session is still in progress.
    fn fetch_series(
        &self,
        code: &str,
        name: &str,
        start: NaiveDate,
        bypass_cache: bool,
    ) -> Result<Series, FetchError>;

    /// Codes on the per-date leaderboard ("top entity") dataset, used as
    /// an auxiliary input by strategies that declare it.
    fn fetch_top_entities(&self, date: NaiveDate) -> Result<HashSet<String>, FetchError>;
}
