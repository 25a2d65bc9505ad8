//! Forward-return scoring for historical signals.
//!
//! For each signal key: restrict the instrument's series to bars on or
//! after the anchor date, take up to `forward_days + 1` bars, and compute
//! the cumulative percent return of each later close against the anchor
//! close, rounded to two decimals. Days beyond the available data stay
//! `None`. Fewer than two bars means no record at all — insufficient
//! forward data, not an error.

use crate::data::SeriesMap;
use crate::domain::{ForwardReturns, InstrumentKey, Series};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info};

/// Default worker count for scoring.
pub const DEFAULT_SCORE_WORKERS: usize = 40;

/// Default number of forward days to score.
pub const DEFAULT_FORWARD_DAYS: usize = 100;

/// Cumulative forward returns for one key, or `None` when fewer than two
/// bars exist on/after the anchor date.
pub fn forward_returns(
    key: &InstrumentKey,
    series: &Series,
    forward_days: usize,
) -> Option<ForwardReturns> {
    let bars = series.from_date(key.as_of);
    let bars = &bars[..bars.len().min(forward_days + 1)];
    if bars.len() <= 1 {
        return None;
    }

    let entry_close = bars[0].close;
    if entry_close <= 0.0 {
        return None;
    }

    let mut rates: Vec<Option<f64>> = bars[1..]
        .iter()
        .map(|b| Some(round2(100.0 * (b.close - entry_close) / entry_close)))
        .collect();
    rates.resize(forward_days, None);

    Some(ForwardReturns {
        key: key.clone(),
        rates,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Concurrent scorer over a batch of unscored keys.
pub struct BacktestScorer {
    pool: rayon::ThreadPool,
}

impl Default for BacktestScorer {
    fn default() -> Self {
        Self::new(DEFAULT_SCORE_WORKERS)
    }
}

impl BacktestScorer {
    pub fn new(workers: usize) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build()
            .expect("failed to build scoring worker pool");
        Self { pool }
    }

    /// Score every key that has a series and enough forward data;
    /// everything else is skipped, never failing the batch. The caller is
    /// responsible for submitting only unscored keys — a record, once
    /// complete, is not a candidate for re-scoring.
    ///
    /// `series_map` is keyed by the batch's anchor date; each signal key
    /// is looked up re-anchored at `anchor`.
    pub fn score_batch(
        &self,
        unscored: &[InstrumentKey],
        series_map: &SeriesMap,
        anchor: chrono::NaiveDate,
        forward_days: usize,
    ) -> HashMap<InstrumentKey, ForwardReturns> {
        let scored: HashMap<InstrumentKey, ForwardReturns> = self.pool.install(|| {
            unscored
                .par_iter()
                .filter_map(|key| {
                    let Some(series) = series_map.get(&key.anchored_at(anchor)) else {
                        debug!(
                            stage = "backtest",
                            code = %key.code,
                            %anchor,
                            "no series for key"
                        );
                        return None;
                    };
                    let returns = forward_returns(key, series, forward_days)?;
                    Some((key.clone(), returns))
                })
                .collect()
        });

        info!(
            stage = "backtest",
            submitted = unscored.len(),
            scored = scored.len(),
            forward_days,
            "scoring complete"
        );
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use chrono::{Duration, NaiveDate};
    use std::sync::Arc;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn series_of(closes: &[f64], start_day: u32) -> Series {
        Series::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| Bar {
                    date: d(start_day) + Duration::days(i as i64),
                    open: close,
                    high: close + 0.1,
                    low: close - 0.1,
                    close,
                    volume: 1_000,
                    pct_change: 0.0,
                })
                .collect(),
        )
    }

    fn key_at(day: u32) -> InstrumentKey {
        InstrumentKey::new(d(day), "600000", "Bank A")
    }

    #[test]
    fn returns_are_relative_to_entry_close() {
        // Entry close 10.00, forward closes 11.00 then 9.00.
        let series = series_of(&[10.0, 11.0, 9.0], 2);
        let returns = forward_returns(&key_at(2), &series, 2).unwrap();
        assert_eq!(returns.rates, vec![Some(10.0), Some(-10.0)]);
        assert!(returns.is_complete());
    }

    #[test]
    fn missing_forward_days_stay_none() {
        let series = series_of(&[10.0, 11.0, 9.0], 2);
        let returns = forward_returns(&key_at(2), &series, 5).unwrap();
        assert_eq!(
            returns.rates,
            vec![Some(10.0), Some(-10.0), None, None, None]
        );
        assert!(!returns.is_complete());
    }

    #[test]
    fn rounding_is_two_decimals() {
        let series = series_of(&[3.0, 3.1], 2);
        let returns = forward_returns(&key_at(2), &series, 1).unwrap();
        // 100 * 0.1 / 3.0 = 3.3333... -> 3.33
        assert_eq!(returns.rates, vec![Some(3.33)]);
    }

    #[test]
    fn entry_before_series_uses_first_bar_on_or_after() {
        let series = series_of(&[10.0, 12.0], 5);
        let returns = forward_returns(&key_at(3), &series, 1).unwrap();
        assert_eq!(returns.rates, vec![Some(20.0)]);
    }

    #[test]
    fn single_bar_produces_no_record() {
        let series = series_of(&[10.0, 11.0, 12.0], 2);
        // Anchored at the last bar: only one bar on/after it.
        assert!(forward_returns(&key_at(4), &series, 5).is_none());
        // Anchored past the series end: nothing at all.
        assert!(forward_returns(&key_at(9), &series, 5).is_none());
    }

    #[test]
    fn batch_skips_keys_without_series() {
        let scorer = BacktestScorer::new(4);
        let anchor = d(8);
        let mut map: SeriesMap = HashMap::new();
        map.insert(
            InstrumentKey::new(anchor, "600000", "Bank A"),
            Arc::new(series_of(&[10.0, 11.0, 9.0], 2)),
        );

        let unscored = vec![
            key_at(2),
            InstrumentKey::new(d(2), "999999", "Missing"),
        ];
        let scored = scorer.score_batch(&unscored, &map, anchor, 2);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[&key_at(2)].rates, vec![Some(10.0), Some(-10.0)]);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// The rates vector always has exactly `forward_days` slots:
            /// a realized prefix followed by a `None` suffix.
            #[test]
            fn rates_are_prefix_padded(
                closes in proptest::collection::vec(0.5f64..500.0, 2..40),
                forward_days in 1usize..60,
            ) {
                let series = series_of(&closes, 2);
                if let Some(returns) = forward_returns(&key_at(2), &series, forward_days) {
                    prop_assert_eq!(returns.rates.len(), forward_days);
                    let realized = returns
                        .rates
                        .iter()
                        .take_while(|r| r.is_some())
                        .count();
                    prop_assert_eq!(realized, forward_days.min(closes.len() - 1));
                    prop_assert!(returns.rates[realized..].iter().all(|r| r.is_none()));
                }
            }

            /// Day one's return is exactly the close-to-close move.
            #[test]
            fn first_day_matches_close_move(
                entry in 1.0f64..100.0,
                next in 1.0f64..100.0,
            ) {
                let series = series_of(&[entry, next], 2);
                let returns = forward_returns(&key_at(2), &series, 1).unwrap();
                let expected = (100.0 * (next - entry) / entry * 100.0).round() / 100.0;
                prop_assert_eq!(returns.rates[0], Some(expected));
            }
        }
    }

    #[test]
    fn batch_skips_too_recent_signals() {
        let scorer = BacktestScorer::new(4);
        let anchor = d(8);
        let mut map: SeriesMap = HashMap::new();
        map.insert(
            InstrumentKey::new(anchor, "600000", "Bank A"),
            Arc::new(series_of(&[10.0, 11.0, 9.0], 2)),
        );

        // Signal on the series' last bar: no forward data yet.
        let unscored = vec![key_at(4)];
        let scored = scorer.score_batch(&unscored, &map, anchor, 2);
        assert!(scored.is_empty());
    }
}
