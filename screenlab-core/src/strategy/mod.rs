//! Strategy evaluation — pluggable windowed predicates over cached series.
//!
//! Each strategy is a pure predicate over the date-bounded tail of one
//! instrument's series. Strategies never mutate the cached series: derived
//! columns (moving averages) are computed into fresh local vectors per
//! evaluation. Every predicate fails closed — too few bars is `Ok(false)`,
//! never an error.

pub mod climax_limitdown;
pub mod engine;
pub mod high_tight_flag;
pub mod low_volatility;
pub mod ma;
pub mod ma_alignment;
pub mod ma250_pullback;
pub mod parking_apron;
pub mod platform_breakout;
pub mod registry;
pub mod steady_growth;
pub mod turtle;
pub mod volume_surge;

pub use engine::{StrategyEngine, DEFAULT_EVAL_WORKERS};
pub use registry::{all, create, RegistryError};

use crate::domain::{InstrumentKey, Series};
use chrono::NaiveDate;
use thiserror::Error;

/// A predicate blew up mid-evaluation. The engine logs this and treats the
/// instrument as a non-match; it never aborts the batch.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    #[error("evaluation failed: {0}")]
    Failed(String),
}

/// A windowed screening predicate.
///
/// `matches` inspects the tail slice ending at `as_of`; how many trailing
/// bars that slice needs is the predicate's own business (`window` /
/// `min_bars`). `flagged` carries the per-date auxiliary "top entity"
/// input for strategies that declare it — resolved once per date by the
/// engine and shared read-only across the fan-out.
pub trait Strategy: Send + Sync {
    /// Registry identifier (e.g. "turtle_breakout").
    fn name(&self) -> &str;

    /// Trailing bars the predicate inspects.
    fn window(&self) -> usize;

    /// Minimum series length below which the predicate is always false.
    fn min_bars(&self) -> usize {
        self.window()
    }

    /// Whether this strategy consumes the per-date top-entity dataset.
    fn needs_top_entities(&self) -> bool {
        false
    }

    fn matches(
        &self,
        key: &InstrumentKey,
        series: &Series,
        as_of: NaiveDate,
        flagged: bool,
    ) -> Result<bool, EvalError>;
}

/// Create synthetic bars from close prices for strategy tests.
///
/// Derives pct_change from consecutive closes, open = previous close,
/// high/low bracketing, constant volume.
#[cfg(test)]
pub(crate) fn make_series(closes: &[f64]) -> Series {
    make_series_with_volume(closes, 10_000_000)
}

#[cfg(test)]
pub(crate) fn make_series_with_volume(closes: &[f64], volume: u64) -> Series {
    use crate::domain::Bar;
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    Series::new(
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let open = if i == 0 { close } else { closes[i - 1] };
                let pct_change = if i == 0 || closes[i - 1] == 0.0 {
                    0.0
                } else {
                    100.0 * (close - closes[i - 1]) / closes[i - 1]
                };
                Bar {
                    date: base_date + chrono::Duration::days(i as i64),
                    open,
                    high: open.max(close) + 0.5,
                    low: open.min(close) - 0.5,
                    close,
                    volume,
                    pct_change,
                }
            })
            .collect(),
    )
}

#[cfg(test)]
pub(crate) fn test_key(as_of: NaiveDate) -> InstrumentKey {
    InstrumentKey::new(as_of, "600000", "Test Instrument")
}

#[cfg(test)]
pub(crate) fn last_date(series: &Series) -> NaiveDate {
    series.bars().last().expect("series must not be empty").date
}
