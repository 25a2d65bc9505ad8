//! Domain types shared across the pipeline.

pub mod bar;
pub mod key;
pub mod signal;
pub mod snapshot;

pub use bar::{Bar, Series};
pub use key::InstrumentKey;
pub use signal::{ForwardReturns, StrategySignal};
pub use snapshot::{Snapshot, SnapshotRow};
