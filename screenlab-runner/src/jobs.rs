//! The two daily jobs, wired to the core caches.
//!
//! - scan: evaluate every registered strategy against the date's universe
//!   and replace that date's rows in the signal store
//! - backtest: score unscored historical signals with forward returns
//!   anchored at the run date
//!
//! The pipeline owns the calendar and both caches and hands them to jobs
//! by reference; tests construct a fresh pipeline per case instead of
//! touching global state.

use crate::config::RunConfig;
use crate::store::SignalStore;
use anyhow::Context;
use chrono::NaiveDate;
use screenlab_core::backtest::BacktestScorer;
use screenlab_core::calendar::TradingCalendar;
use screenlab_core::data::{MarketDataFetcher, SeriesCache, SnapshotCache};
use screenlab_core::domain::StrategySignal;
use screenlab_core::strategy::{self, StrategyEngine};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct Pipeline {
    calendar: Arc<TradingCalendar>,
    series: SeriesCache,
    engine: StrategyEngine,
    scorer: BacktestScorer,
    store: Arc<dyn SignalStore>,
    forward_days: usize,
}

impl Pipeline {
    /// Load the calendar and wire up caches and pools.
    ///
    /// A calendar failure is fatal here — it must never be masked as
    /// "not a trading day" downstream.
    pub fn bootstrap(
        fetcher: Arc<dyn MarketDataFetcher>,
        store: Arc<dyn SignalStore>,
        config: &RunConfig,
    ) -> anyhow::Result<Self> {
        let calendar = Arc::new(
            TradingCalendar::load(fetcher.as_ref())
                .context("trading calendar unavailable — aborting run")?,
        );
        info!(trading_days = calendar.len(), "calendar loaded");

        let snapshots = Arc::new(SnapshotCache::new(Arc::clone(&fetcher)));
        let series = SeriesCache::with_workers(
            Arc::clone(&fetcher),
            snapshots,
            Arc::clone(&calendar),
            config.series_workers,
        );
        let engine = StrategyEngine::with_workers(Arc::clone(&fetcher), config.eval_workers);
        let scorer = BacktestScorer::new(config.score_workers);

        Ok(Self {
            calendar,
            series,
            engine,
            scorer,
            store,
            forward_days: config.forward_days,
        })
    }

    pub fn calendar(&self) -> &Arc<TradingCalendar> {
        &self.calendar
    }

    /// Evaluate every registered strategy for `date`, persist matches,
    /// and return the day's signals.
    pub fn run_scan(&self, date: NaiveDate) -> anyhow::Result<Vec<StrategySignal>> {
        let now = chrono::Local::now().naive_local();
        let series_map = self
            .series
            .get(date, None, now)
            .with_context(|| format!("no series available for {date}"))?;

        let mut signals = Vec::new();
        for strategy in strategy::all() {
            let matched = self.engine.evaluate(strategy.as_ref(), date, &series_map);
            if matched.is_empty() {
                info!(strategy = strategy.name(), %date, "no matches");
                continue;
            }
            if let Err(e) = self.store.replace_signals(strategy.name(), date, &matched) {
                // Persistence failures do not roll back the computation;
                // the per-date replace makes the next run idempotent.
                error!(
                    stage = "persist",
                    strategy = strategy.name(),
                    %date,
                    error = %e,
                    "failed to store signals"
                );
            }
            signals.extend(
                matched
                    .into_iter()
                    .map(|key| StrategySignal::new(key, strategy.name())),
            );
        }
        Ok(signals)
    }

    /// Score unscored signals for every strategy, anchored at `date`.
    pub fn run_backtest(&self, date: NaiveDate) -> anyhow::Result<()> {
        let now = chrono::Local::now().naive_local();
        let series_map = self
            .series
            .get(date, None, now)
            .with_context(|| format!("no series available for {date}"))?;
        let today = now.date();

        for strategy in strategy::all() {
            let unscored = match self.store.unscored_signals(strategy.name(), today) {
                Ok(keys) => keys,
                Err(e) => {
                    error!(
                        stage = "backtest",
                        strategy = strategy.name(),
                        error = %e,
                        "failed to read unscored rows"
                    );
                    continue;
                }
            };
            if unscored.is_empty() {
                continue;
            }

            let scored = self
                .scorer
                .score_batch(&unscored, &series_map, date, self.forward_days);
            if scored.is_empty() {
                warn!(
                    strategy = strategy.name(),
                    submitted = unscored.len(),
                    "nothing scorable yet"
                );
                continue;
            }
            if let Err(e) = self.store.write_backtest(strategy.name(), &scored) {
                error!(
                    stage = "persist",
                    strategy = strategy.name(),
                    error = %e,
                    "failed to store backtest rows"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CsvStore;
    use chrono::{Datelike, Duration, Weekday};
    use screenlab_core::data::SyntheticFetcher;

    fn config(dir: &std::path::Path) -> RunConfig {
        RunConfig {
            cache_dir: dir.join("cache"),
            output_dir: dir.join("signals"),
            synthetic_instruments: 12,
            forward_days: 5,
            series_workers: 4,
            eval_workers: 4,
            score_workers: 4,
            ..RunConfig::default()
        }
    }

    fn pipeline(dir: &std::path::Path) -> (Pipeline, Arc<CsvStore>) {
        let config = config(dir);
        let fetcher: Arc<dyn MarketDataFetcher> = Arc::new(SyntheticFetcher::new(12, 99));
        let store = Arc::new(CsvStore::new(&config.output_dir, config.forward_days));
        let pipeline =
            Pipeline::bootstrap(fetcher, Arc::clone(&store) as Arc<dyn SignalStore>, &config)
                .unwrap();
        (pipeline, store)
    }

    /// A weekday in the synthetic calendar with plenty of history before
    /// and forward data after it.
    fn scan_date() -> NaiveDate {
        let mut date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date += Duration::days(1);
        }
        date
    }

    #[test]
    fn bootstrap_loads_calendar() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(dir.path());
        assert!(pipeline.calendar().is_trading_date(scan_date()));
    }

    #[test]
    fn scan_then_backtest_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, store) = pipeline(dir.path());
        let date = scan_date();

        let signals = pipeline.run_scan(date).unwrap();

        // Whatever was flagged is unscored until the backtest runs.
        let flagged: std::collections::HashSet<String> =
            signals.iter().map(|s| s.strategy.clone()).collect();
        for name in &flagged {
            assert!(!store.read_signals(name).unwrap().is_empty());
        }

        // Backtest anchored two weeks later so forward bars exist.
        let anchor = pipeline.calendar().next_trading_date(date + Duration::days(14));
        pipeline.run_backtest(anchor).unwrap();

        for name in flagged {
            let rows = store.read_signals(&name).unwrap();
            assert!(rows
                .iter()
                .all(|row| row.rates.iter().filter(|r| r.is_some()).count() == 5));
        }
    }

    #[test]
    fn scan_is_idempotent_per_date() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, store) = pipeline(dir.path());
        let date = scan_date();

        pipeline.run_scan(date).unwrap();
        let first: Vec<usize> = strategy::all()
            .iter()
            .map(|s| store.read_signals(s.name()).unwrap().len())
            .collect();

        pipeline.run_scan(date).unwrap();
        let second: Vec<usize> = strategy::all()
            .iter()
            .map(|s| store.read_signals(s.name()).unwrap().len())
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn backtest_on_weekend_anchor_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(dir.path());
        let saturday = NaiveDate::from_ymd_opt(2025, 6, 7).unwrap();
        assert_eq!(saturday.weekday(), Weekday::Sat);
        // The synthetic provider has no snapshot on weekends, so the
        // series universe cannot be derived.
        assert!(pipeline.run_backtest(saturday).is_err());
    }
}
