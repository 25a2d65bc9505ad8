//! ScreenLab Core — daily equity screening pipeline.
//!
//! This crate contains the heart of the screening system:
//! - Domain types (bars, series, instrument keys, snapshots, signals)
//! - Trading calendar with session-clock helpers
//! - Per-run memoized snapshot and history caches with bounded fan-out
//! - Pluggable strategy predicates evaluated across the whole universe
//! - Forward cumulative-return scoring for historical signals

pub mod backtest;
pub mod calendar;
pub mod data;
pub mod domain;
pub mod strategy;
