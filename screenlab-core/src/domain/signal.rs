//! Strategy signals and forward-return records.

use super::InstrumentKey;
use serde::{Deserialize, Serialize};

/// A strategy match: one instrument flagged by one predicate on its
/// anchor date. Produced by the engine, consumed by the persistence port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrategySignal {
    pub key: InstrumentKey,
    pub strategy: String,
}

impl StrategySignal {
    pub fn new(key: InstrumentKey, strategy: impl Into<String>) -> Self {
        Self {
            key,
            strategy: strategy.into(),
        }
    }
}

/// Forward cumulative returns for one signal.
///
/// `rates[i]` is the percent change of close on forward day `i + 1`
/// relative to the close on the anchor date, rounded to two decimals;
/// `None` where forward data does not exist yet. Immutable once computed —
/// a populated record is never a candidate for re-scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardReturns {
    pub key: InstrumentKey,
    pub rates: Vec<Option<f64>>,
}

impl ForwardReturns {
    /// True once the last requested forward day has a realized value.
    pub fn is_complete(&self) -> bool {
        matches!(self.rates.last(), Some(Some(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn key() -> InstrumentKey {
        InstrumentKey::new(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            "600000",
            "Bank A",
        )
    }

    #[test]
    fn completeness_tracks_terminal_day() {
        let partial = ForwardReturns {
            key: key(),
            rates: vec![Some(1.0), Some(-2.0), None],
        };
        assert!(!partial.is_complete());

        let full = ForwardReturns {
            key: key(),
            rates: vec![Some(1.0), Some(-2.0), Some(0.5)],
        };
        assert!(full.is_complete());

        let empty = ForwardReturns {
            key: key(),
            rates: vec![],
        };
        assert!(!empty.is_complete());
    }
}
