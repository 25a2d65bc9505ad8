//! InstrumentKey — the join key used across caches, signals, and backtests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one instrument's evaluation context anchored at a date.
///
/// `code` is the natural identity of the instrument; `as_of` selects the
/// run that produced the entry. The full triple is the map key shared by
/// the series cache, the strategy engine, and the backtest scorer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrumentKey {
    pub as_of: NaiveDate,
    pub code: String,
    pub name: String,
}

impl InstrumentKey {
    pub fn new(as_of: NaiveDate, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            as_of,
            code: code.into(),
            name: name.into(),
        }
    }

    /// The same instrument re-anchored at a different date.
    pub fn anchored_at(&self, as_of: NaiveDate) -> Self {
        Self {
            as_of,
            code: self.code.clone(),
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.as_of, self.code, self.name)
    }
}
