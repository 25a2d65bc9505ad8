//! Schedule driver — turns a date specification into per-trading-date job
//! dispatch.
//!
//! Range and list specifications fan out one thread per trading date with
//! a fixed pacing delay between submissions, so a multi-week backfill
//! does not hammer the upstream source. The implicit specification
//! resolves exactly one date from the session clock, by job kind. A
//! date's failure is logged and never blocks sibling dates; the cancel
//! flag stops further submission but never interrupts a running job.

use chrono::{Days, Local, NaiveDate};
use screenlab_core::calendar::TradingCalendar;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("trading calendar unavailable — cannot resolve run dates")]
    CalendarUnavailable,

    #[error("invalid date argument '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("expected zero, one, or two date arguments, got {0}")]
    TooManyArguments(usize),

    #[error("range start {start} is after end {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },
}

/// Which of the two candidate dates an implicit run resolves to.
///
/// Declared by the job, never inferred: `Finalized` jobs only want
/// end-of-day data, `LatestAvailable` jobs accept an in-progress session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Finalized,
    LatestAvailable,
}

/// Parsed date specification from the CLI surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateSpec {
    /// No dates given: resolve one date from the session clock.
    Implicit,
    /// Explicit comma-separated dates.
    List(Vec<NaiveDate>),
    /// Every trading day in the inclusive range.
    Range { start: NaiveDate, end: NaiveDate },
}

impl DateSpec {
    /// Zero args → implicit; one arg → comma list; two args → range.
    pub fn from_args(args: &[String]) -> Result<Self, ScheduleError> {
        let parse = |raw: &str| {
            raw.parse::<NaiveDate>()
                .map_err(|_| ScheduleError::InvalidDate(raw.to_string()))
        };

        match args {
            [] => Ok(Self::Implicit),
            [single] => {
                let dates = single
                    .split(',')
                    .map(|part| parse(part.trim()))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::List(dates))
            }
            [start, end] => {
                let start = parse(start)?;
                let end = parse(end)?;
                if start > end {
                    return Err(ScheduleError::EmptyRange { start, end });
                }
                Ok(Self::Range { start, end })
            }
            more => Err(ScheduleError::TooManyArguments(more.len())),
        }
    }
}

/// Outcome of a schedule run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub submitted: usize,
    pub failed: usize,
}

pub struct ScheduleDriver {
    calendar: Arc<TradingCalendar>,
    pacing: Duration,
}

impl ScheduleDriver {
    pub fn new(calendar: Arc<TradingCalendar>) -> Self {
        Self {
            calendar,
            pacing: Duration::from_secs(2),
        }
    }

    /// Override the inter-submission delay (tests only want zero).
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Dispatch `job` once per resolved trading date.
    ///
    /// The job must be idempotent: beyond the trading-day filter the
    /// driver deduplicates nothing.
    pub fn run<F>(
        &self,
        spec: &DateSpec,
        kind: JobKind,
        cancel: Option<&AtomicBool>,
        job: F,
    ) -> Result<RunSummary, ScheduleError>
    where
        F: Fn(NaiveDate) -> anyhow::Result<()> + Send + Sync,
    {
        if self.calendar.is_empty() {
            return Err(ScheduleError::CalendarUnavailable);
        }

        let dates = self.resolve_dates(spec, kind);
        info!(count = dates.len(), ?kind, "schedule resolved");

        let failed = std::sync::atomic::AtomicUsize::new(0);
        let mut submitted = 0;

        std::thread::scope(|scope| {
            for (i, date) in dates.iter().enumerate() {
                if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                    info!(remaining = dates.len() - i, "schedule cancelled");
                    break;
                }

                let date = *date;
                let job = &job;
                let failed = &failed;
                scope.spawn(move || {
                    if let Err(e) = job(date) {
                        failed.fetch_add(1, Ordering::Relaxed);
                        error!(stage = "schedule", %date, error = %e, "job failed");
                    }
                });
                submitted += 1;

                if !self.pacing.is_zero() && i + 1 < dates.len() {
                    std::thread::sleep(self.pacing);
                }
            }
        });

        Ok(RunSummary {
            submitted,
            failed: failed.load(Ordering::Relaxed),
        })
    }

    fn resolve_dates(&self, spec: &DateSpec, kind: JobKind) -> Vec<NaiveDate> {
        match spec {
            DateSpec::Implicit => {
                let latest = self.calendar.latest_trade_dates(Local::now().naive_local());
                let date = match kind {
                    JobKind::Finalized => latest.finalized,
                    JobKind::LatestAvailable => latest.latest,
                };
                vec![date]
            }
            DateSpec::List(dates) => dates
                .iter()
                .copied()
                .filter(|d| self.calendar.is_trading_date(*d))
                .collect(),
            DateSpec::Range { start, end } => {
                let mut dates = Vec::new();
                let mut current = *start;
                while current <= *end {
                    if self.calendar.is_trading_date(current) {
                        dates.push(current);
                    }
                    match current.checked_add_days(Days::new(1)) {
                        Some(next) => current = next,
                        None => break,
                    }
                }
                dates
            }
        }
    }
}
