//! Snapshot — same-day cross-sectional quote table for the whole market.

use super::InstrumentKey;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One instrument's row in a market snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub code: String,
    pub name: String,
    pub price: f64,
    pub pct_change: f64,
    pub volume: u64,
    /// Traded value for the day, in the quote currency.
    pub turnover: f64,
}

/// Full-market snapshot for one date. Created once per (run, date) by the
/// snapshot cache and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub rows: Vec<SnapshotRow>,
}

impl Snapshot {
    pub fn new(date: NaiveDate, rows: Vec<SnapshotRow>) -> Self {
        Self { date, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The evaluation universe this snapshot defines: one key per row,
    /// anchored at the snapshot date.
    pub fn keys(&self) -> Vec<InstrumentKey> {
        self.rows
            .iter()
            .map(|row| InstrumentKey::new(self.date, row.code.clone(), row.name.clone()))
            .collect()
    }
}
