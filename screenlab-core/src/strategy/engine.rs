//! Strategy engine — fans one predicate out across the whole universe.
//!
//! Evaluation runs on a private 40-worker pool with an unordered join; a
//! predicate error for one instrument is logged and treated as a
//! non-match, never aborting the batch. Auxiliary per-date inputs (the
//! top-entity dataset) are resolved once per evaluation and shared
//! read-only across the fan-out.

use super::Strategy;
use crate::data::{MarketDataFetcher, SeriesMap};
use crate::domain::InstrumentKey;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info};

/// Default worker count for predicate evaluation.
pub const DEFAULT_EVAL_WORKERS: usize = 40;

pub struct StrategyEngine {
    fetcher: Arc<dyn MarketDataFetcher>,
    pool: rayon::ThreadPool,
}

impl StrategyEngine {
    pub fn new(fetcher: Arc<dyn MarketDataFetcher>) -> Self {
        Self::with_workers(fetcher, DEFAULT_EVAL_WORKERS)
    }

    pub fn with_workers(fetcher: Arc<dyn MarketDataFetcher>, workers: usize) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build()
            .expect("failed to build evaluation worker pool");
        Self { fetcher, pool }
    }

    /// Evaluate one strategy against every instrument in the series map,
    /// returning the matched keys (unordered).
    pub fn evaluate(
        &self,
        strategy: &dyn Strategy,
        date: NaiveDate,
        series_map: &SeriesMap,
    ) -> Vec<InstrumentKey> {
        let top_entities: Option<HashSet<String>> = if strategy.needs_top_entities() {
            match self.fetcher.fetch_top_entities(date) {
                Ok(codes) => Some(codes),
                Err(e) => {
                    // Without the leaderboard every instrument evaluates
                    // un-flagged; gated strategies simply match nothing.
                    error!(
                        stage = "strategy",
                        strategy = strategy.name(),
                        %date,
                        error = %e,
                        "top-entity fetch failed"
                    );
                    None
                }
            }
        } else {
            None
        };

        let matched: Vec<InstrumentKey> = self.pool.install(|| {
            series_map
                .par_iter()
                .filter_map(|(key, series)| {
                    let flagged = top_entities
                        .as_ref()
                        .is_some_and(|codes| codes.contains(&key.code));
                    match strategy.matches(key, series, date, flagged) {
                        Ok(true) => Some(key.clone()),
                        Ok(false) => None,
                        Err(e) => {
                            error!(
                                stage = "strategy",
                                strategy = strategy.name(),
                                %date,
                                code = %key.code,
                                error = %e,
                                "predicate failed"
                            );
                            None
                        }
                    }
                })
                .collect()
        });

        info!(
            stage = "strategy",
            strategy = strategy.name(),
            %date,
            universe = series_map.len(),
            matched = matched.len(),
            "evaluation complete"
        );
        matched
    }
}
