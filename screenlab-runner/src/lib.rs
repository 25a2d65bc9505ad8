//! ScreenLab Runner — orchestration over the core pipeline.
//!
//! - `schedule` — parses a date specification and dispatches one job per
//!   trading date with paced submission
//! - `jobs` — the scan (strategy screening) and backtest (forward-return
//!   scoring) jobs wired to the core caches
//! - `store` — the persistence port and its CSV implementation
//! - `config` — TOML run configuration

pub mod config;
pub mod jobs;
pub mod schedule;
pub mod store;

pub use config::RunConfig;
pub use jobs::Pipeline;
pub use schedule::{DateSpec, JobKind, ScheduleDriver, ScheduleError};
pub use store::{CsvStore, SignalRow, SignalStore, StoreError};
