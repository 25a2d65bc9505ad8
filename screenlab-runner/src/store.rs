//! Persistence port for signals and backtest results, plus the CSV
//! implementation.
//!
//! One file per strategy: `{output_dir}/{strategy}.csv` with columns
//! `date, code, name, day_1 .. day_N`. "Delete-then-insert per date" is a
//! filtered rewrite through a temp file with an atomic rename, which makes
//! partial writes from a crashed run survivable on the next pass.

use chrono::NaiveDate;
use screenlab_core::domain::{ForwardReturns, InstrumentKey};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(String),

    #[error("store format error: {0}")]
    Format(String),
}

/// One persisted signal row: the key plus its (possibly unscored)
/// forward-return columns.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRow {
    pub key: InstrumentKey,
    pub rates: Vec<Option<f64>>,
}

impl SignalRow {
    /// Scored means the terminal forward-day column holds a value.
    pub fn is_scored(&self) -> bool {
        matches!(self.rates.last(), Some(Some(_)))
    }
}

/// Persistence collaborator consumed by the jobs.
///
/// At-least-once delivery is the store's concern: `replace_signals` must
/// be idempotent per (strategy, date).
pub trait SignalStore: Send + Sync {
    /// Drop all rows for (strategy, date) and insert the given keys with
    /// empty backtest columns.
    fn replace_signals(
        &self,
        strategy: &str,
        date: NaiveDate,
        keys: &[InstrumentKey],
    ) -> Result<(), StoreError>;

    /// Keys of rows older than `before` whose terminal forward-day column
    /// is still empty.
    fn unscored_signals(
        &self,
        strategy: &str,
        before: NaiveDate,
    ) -> Result<Vec<InstrumentKey>, StoreError>;

    /// Fill backtest columns for the given keys. Rows absent from
    /// `records` are left untouched.
    fn write_backtest(
        &self,
        strategy: &str,
        records: &HashMap<InstrumentKey, ForwardReturns>,
    ) -> Result<(), StoreError>;

    /// All rows for a strategy, date-ascending.
    fn read_signals(&self, strategy: &str) -> Result<Vec<SignalRow>, StoreError>;
}

/// CSV-file-per-strategy store.
pub struct CsvStore {
    output_dir: PathBuf,
    forward_days: usize,
}

impl CsvStore {
    pub fn new(output_dir: impl Into<PathBuf>, forward_days: usize) -> Self {
        Self {
            output_dir: output_dir.into(),
            forward_days,
        }
    }

    fn path_for(&self, strategy: &str) -> PathBuf {
        self.output_dir.join(format!("{strategy}.csv"))
    }

    fn load(&self, strategy: &str) -> Result<Vec<SignalRow>, StoreError> {
        let path = self.path_for(strategy);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| StoreError::Io(format!("open {}: {e}", path.display())))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| StoreError::Format(e.to_string()))?;
            rows.push(parse_row(&record, self.forward_days)?);
        }
        Ok(rows)
    }

    fn write_all(&self, strategy: &str, rows: &mut Vec<SignalRow>) -> Result<(), StoreError> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| StoreError::Io(format!("create output dir: {e}")))?;

        rows.sort_by(|a, b| (a.key.as_of, &a.key.code).cmp(&(b.key.as_of, &b.key.code)));

        let path = self.path_for(strategy);
        let tmp_path = path.with_extension("csv.tmp");
        write_rows(&tmp_path, rows, self.forward_days)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::Io(format!("atomic rename failed: {e}"))
        })
    }
}

fn parse_row(record: &csv::StringRecord, forward_days: usize) -> Result<SignalRow, StoreError> {
    let field = |i: usize| {
        record
            .get(i)
            .ok_or_else(|| StoreError::Format(format!("missing column {i}")))
    };

    let as_of: NaiveDate = field(0)?
        .parse()
        .map_err(|e| StoreError::Format(format!("bad date: {e}")))?;
    let code = field(1)?.to_string();
    let name = field(2)?.to_string();

    let mut rates = Vec::with_capacity(forward_days);
    for i in 0..forward_days {
        let raw = record.get(3 + i).unwrap_or("");
        if raw.is_empty() {
            rates.push(None);
        } else {
            rates.push(Some(raw.parse().map_err(|e| {
                StoreError::Format(format!("bad rate '{raw}': {e}"))
            })?));
        }
    }

    Ok(SignalRow {
        key: InstrumentKey::new(as_of, code, name),
        rates,
    })
}

fn write_rows(path: &Path, rows: &[SignalRow], forward_days: usize) -> Result<(), StoreError> {
    let mut writer =
        csv::Writer::from_path(path).map_err(|e| StoreError::Io(format!("create csv: {e}")))?;

    let mut header = vec!["date".to_string(), "code".to_string(), "name".to_string()];
    header.extend((1..=forward_days).map(|i| format!("day_{i}")));
    writer
        .write_record(&header)
        .map_err(|e| StoreError::Io(e.to_string()))?;

    for row in rows {
        let mut record = vec![
            row.key.as_of.to_string(),
            row.key.code.clone(),
            row.key.name.clone(),
        ];
        for i in 0..forward_days {
            record.push(match row.rates.get(i).copied().flatten() {
                Some(rate) => format!("{rate:.2}"),
                None => String::new(),
            });
        }
        writer
            .write_record(&record)
            .map_err(|e| StoreError::Io(e.to_string()))?;
    }
    writer.flush().map_err(|e| StoreError::Io(e.to_string()))
}

impl SignalStore for CsvStore {
    fn replace_signals(
        &self,
        strategy: &str,
        date: NaiveDate,
        keys: &[InstrumentKey],
    ) -> Result<(), StoreError> {
        let mut rows = self.load(strategy)?;
        rows.retain(|row| row.key.as_of != date);
        rows.extend(keys.iter().map(|key| SignalRow {
            key: InstrumentKey::new(date, key.code.clone(), key.name.clone()),
            rates: vec![None; self.forward_days],
        }));
        self.write_all(strategy, &mut rows)
    }

    fn unscored_signals(
        &self,
        strategy: &str,
        before: NaiveDate,
    ) -> Result<Vec<InstrumentKey>, StoreError> {
        Ok(self
            .load(strategy)?
            .into_iter()
            .filter(|row| row.key.as_of < before && !row.is_scored())
            .map(|row| row.key)
            .collect())
    }

    fn write_backtest(
        &self,
        strategy: &str,
        records: &HashMap<InstrumentKey, ForwardReturns>,
    ) -> Result<(), StoreError> {
        let mut rows = self.load(strategy)?;
        for row in &mut rows {
            if let Some(record) = records.get(&row.key) {
                row.rates = record.rates.clone();
                row.rates.resize(self.forward_days, None);
            }
        }
        self.write_all(strategy, &mut rows)
    }

    fn read_signals(&self, strategy: &str) -> Result<Vec<SignalRow>, StoreError> {
        self.load(strategy)
    }
}
