//! REST data provider.
//!
//! Fetches the calendar, daily snapshots, per-instrument history, and the
//! top-entity leaderboard from a quote-API endpoint. Handles retries with
//! exponential backoff and the on-disk series cache; the exact upstream
//! vendor format is deliberately not reproduced — the JSON schema here is
//! this crate's own.

use super::disk_cache::SeriesDiskCache;
use super::{FetchError, MarketDataFetcher};
use crate::domain::{Bar, Series, Snapshot, SnapshotRow};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CalendarResponse {
    dates: Vec<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    date: NaiveDate,
    rows: Vec<SnapshotRowWire>,
}

#[derive(Debug, Deserialize)]
struct SnapshotRowWire {
    code: String,
    name: String,
    price: f64,
    pct_change: f64,
    volume: u64,
    turnover: f64,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    bars: Vec<BarWire>,
}

#[derive(Debug, Deserialize)]
struct BarWire {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
    pct_change: f64,
}

#[derive(Debug, Deserialize)]
struct TopEntitiesResponse {
    codes: Vec<String>,
}

// ── Provider ────────────────────────────────────────────────────────

/// REST quote-API provider with optional on-disk series cache.
pub struct RestFetcher {
    client: reqwest::blocking::Client,
    base_url: String,
    disk_cache: Option<SeriesDiskCache>,
    max_retries: u32,
    base_delay: Duration,
}

impl RestFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            disk_cache: None,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }

    /// Serve repeat history reads from disk instead of the network.
    pub fn with_disk_cache(mut self, cache: SeriesDiskCache) -> Self {
        self.disk_cache = Some(cache);
        self
    }

    fn calendar_url(&self) -> String {
        format!("{}/calendar", self.base_url)
    }

    fn snapshot_url(&self, date: NaiveDate) -> String {
        format!("{}/snapshot?date={date}", self.base_url)
    }

    fn history_url(&self, code: &str, start: NaiveDate) -> String {
        format!("{}/history/{code}?start={start}", self.base_url)
    }

    fn top_entities_url(&self, date: NaiveDate) -> String {
        format!("{}/top-entities?date={date}", self.base_url)
    }

    /// GET with retry on transient failures (network errors and 5xx).
    fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, FetchError> {
        let mut last_err = FetchError::Other("no attempts made".into());
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(url, attempt, ?delay, "retrying request");
                std::thread::sleep(delay);
            }

            let response = match self.client.get(url).send() {
                Ok(r) => r,
                Err(e) => {
                    last_err = FetchError::NetworkUnreachable(e.to_string());
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 {
                let retry_after_secs = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);
                return Err(FetchError::RateLimited { retry_after_secs });
            }
            if status.as_u16() == 404 {
                return Err(FetchError::Other(format!("not found: {url}")));
            }
            if status.is_server_error() {
                last_err = FetchError::NetworkUnreachable(format!("{url}: {status}"));
                continue;
            }
            if !status.is_success() {
                return Err(FetchError::Other(format!("{url}: {status}")));
            }

            return response
                .json::<T>()
                .map_err(|e| FetchError::ResponseFormatChanged(e.to_string()));
        }
        Err(last_err)
    }

    fn fetch_series_upstream(&self, code: &str, start: NaiveDate) -> Result<Series, FetchError> {
        let response: HistoryResponse = self.get_json(&self.history_url(code, start))?;
        if response.bars.is_empty() {
            return Err(FetchError::InstrumentNotFound { code: code.into() });
        }
        Ok(wire_to_series(response.bars))
    }
}

fn wire_to_series(bars: Vec<BarWire>) -> Series {
    Series::new(
        bars.into_iter()
            .map(|b| Bar {
                date: b.date,
                open: b.open,
                high: b.high,
                low: b.low,
                close: b.close,
                volume: b.volume,
                pct_change: b.pct_change,
            })
            .collect(),
    )
}

impl MarketDataFetcher for RestFetcher {
    fn name(&self) -> &str {
        "rest"
    }

    fn fetch_calendar(&self) -> Result<HashSet<NaiveDate>, FetchError> {
        let response: CalendarResponse = self.get_json(&self.calendar_url())?;
        if response.dates.is_empty() {
            return Err(FetchError::ValidationError("calendar has no dates".into()));
        }
        Ok(response.dates.into_iter().collect())
    }

    fn fetch_snapshot(&self, date: NaiveDate) -> Result<Snapshot, FetchError> {
        let response: SnapshotResponse = self.get_json(&self.snapshot_url(date))?;
        if response.rows.is_empty() {
            return Err(FetchError::NoSnapshot { date });
        }
        if response.date != date {
            return Err(FetchError::ValidationError(format!(
                "asked for snapshot of {date}, got {}",
                response.date
            )));
        }
        Ok(Snapshot::new(
            response.date,
            response
                .rows
                .into_iter()
                .map(|r| SnapshotRow {
                    code: r.code,
                    name: r.name,
                    price: r.price,
                    pct_change: r.pct_change,
                    volume: r.volume,
                    turnover: r.turnover,
                })
                .collect(),
        ))
    }

    fn fetch_series(
        &self,
        code: &str,
        _name: &str,
        start: NaiveDate,
        bypass_cache: bool,
    ) -> Result<Series, FetchError> {
        // A same-day cache entry is fresh enough unless the caller is
        // explicitly chasing an in-progress session.
        if !bypass_cache {
            if let Some(cache) = &self.disk_cache {
                if let Some(meta) = cache.meta(code) {
                    let today = chrono::Local::now().date_naive();
                    if meta.cached_at.date() == today && meta.start_date <= start {
                        if let Ok(series) = cache.load(code) {
                            return Ok(Series::new(series.from_date(start).to_vec()));
                        }
                    }
                }
            }
        }

        let series = self.fetch_series_upstream(code, start)?;
        if !bypass_cache {
            if let Some(cache) = &self.disk_cache {
                if let Err(e) = cache.write(code, &series) {
                    warn!(code, error = %e, "failed to write series cache");
                }
            }
        }
        Ok(series)
    }

    fn fetch_top_entities(&self, date: NaiveDate) -> Result<HashSet<String>, FetchError> {
        let response: TopEntitiesResponse = self.get_json(&self.top_entities_url(date))?;
        Ok(response.codes.into_iter().collect())
    }
}
