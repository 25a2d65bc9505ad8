//! On-disk series cache with one directory per instrument.
//!
//! Layout: `{cache_dir}/code={CODE}/bars.csv` plus a `meta.json` sidecar
//! (date range, bar count, blake3 content hash, cached-at stamp).
//!
//! Features:
//! - Atomic writes (write to .tmp, rename into place)
//! - Integrity validation on load (parse check, row count > 0)
//! - Quarantine for corrupt files ({filename}.quarantined)

use super::FetchError;
use crate::domain::{Bar, Series};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Metadata sidecar for a cached instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    pub data_hash: String,
    pub cached_at: chrono::NaiveDateTime,
}

/// The CSV-backed series cache.
pub struct SeriesDiskCache {
    cache_dir: PathBuf,
}

impl SeriesDiskCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn code_dir(&self, code: &str) -> PathBuf {
        self.cache_dir.join(format!("code={code}"))
    }

    fn bars_path(&self, code: &str) -> PathBuf {
        self.code_dir(code).join("bars.csv")
    }

    fn meta_path(&self, code: &str) -> PathBuf {
        self.code_dir(code).join("meta.json")
    }

    /// Write an instrument's series to the cache, atomically.
    pub fn write(&self, code: &str, series: &Series) -> Result<(), FetchError> {
        let bars = series.bars();
        if bars.is_empty() {
            return Err(FetchError::CacheError("no bars to cache".into()));
        }

        let dir = self.code_dir(code);
        fs::create_dir_all(&dir)
            .map_err(|e| FetchError::CacheError(format!("failed to create dir: {e}")))?;

        let path = self.bars_path(code);
        let tmp_path = path.with_extension("csv.tmp");
        write_csv(bars, &tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            FetchError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        let meta = CacheMeta {
            code: code.to_string(),
            start_date: bars[0].date,
            end_date: bars[bars.len() - 1].date,
            bar_count: bars.len(),
            data_hash: blake3::hash(
                &serde_json::to_vec(bars)
                    .map_err(|e| FetchError::CacheError(format!("hash serialization: {e}")))?,
            )
            .to_hex()
            .to_string(),
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| FetchError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(code), meta_json)
            .map_err(|e| FetchError::CacheError(format!("meta write: {e}")))?;

        Ok(())
    }

    /// Load a cached series, quarantining the file if it fails to parse.
    pub fn load(&self, code: &str) -> Result<Series, FetchError> {
        let path = self.bars_path(code);
        if !path.exists() {
            return Err(FetchError::CacheError(format!(
                "no cached history for '{code}'"
            )));
        }

        match load_and_validate_csv(&path) {
            Ok(bars) => Ok(Series::new(bars)),
            Err(e) => {
                let quarantine = path.with_extension("csv.quarantined");
                warn!(code, error = %e, "quarantining corrupt cache file");
                let _ = fs::rename(&path, &quarantine);
                Err(e)
            }
        }
    }

    /// The metadata sidecar, if the instrument has been cached.
    pub fn meta(&self, code: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(code)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// True when the cached range reaches `end` at least — a fresh-enough
    /// cache entry to serve instead of an upstream fetch.
    pub fn covers(&self, code: &str, start: NaiveDate, end: NaiveDate) -> bool {
        match self.meta(code) {
            Some(meta) => meta.start_date <= start && meta.end_date >= end,
            None => false,
        }
    }

    /// Cache status for a list of instrument codes.
    pub fn status(&self, codes: &[&str]) -> Vec<CacheStatus> {
        codes
            .iter()
            .map(|code| {
                let meta = self.meta(code);
                CacheStatus {
                    code: code.to_string(),
                    cached: meta.is_some(),
                    start_date: meta.as_ref().map(|m| m.start_date),
                    end_date: meta.as_ref().map(|m| m.end_date),
                    bar_count: meta.as_ref().map(|m| m.bar_count),
                }
            })
            .collect()
    }
}

/// Cache status for a single instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub code: String,
    pub cached: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub bar_count: Option<usize>,
}

// ── CSV I/O helpers ─────────────────────────────────────────────────

fn write_csv(bars: &[Bar], path: &Path) -> Result<(), FetchError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| FetchError::CacheError(format!("create csv: {e}")))?;
    for bar in bars {
        writer
            .serialize(bar)
            .map_err(|e| FetchError::CacheError(format!("write csv row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| FetchError::CacheError(format!("flush csv: {e}")))?;
    Ok(())
}

fn load_and_validate_csv(path: &Path) -> Result<Vec<Bar>, FetchError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| FetchError::CacheError(format!("open csv: {e}")))?;
    let mut bars = Vec::new();
    for row in reader.deserialize::<Bar>() {
        let bar = row.map_err(|e| FetchError::ValidationError(format!("csv row: {e}")))?;
        if !bar.is_sane() {
            return Err(FetchError::ValidationError(format!(
                "invalid bar at {}",
                bar.date
            )));
        }
        bars.push(bar);
    }
    if bars.is_empty() {
        return Err(FetchError::ValidationError("empty cache file".into()));
    }
    Ok(bars)
}
