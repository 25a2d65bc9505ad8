//! Data layer — fetch collaborator trait, per-run caches, providers.
//!
//! The `MarketDataFetcher` trait abstracts over upstream quote sources so
//! the pipeline can run against a REST endpoint, the synthetic generator,
//! or a counting stub in tests. The cache layer sits above the trait —
//! providers know nothing about memoization.

pub mod disk_cache;
pub mod fetcher;
pub mod rest;
pub mod series_cache;
pub mod snapshot_cache;
pub mod synthetic;

pub use disk_cache::{CacheMeta, CacheStatus, SeriesDiskCache};
pub use fetcher::{FetchError, MarketDataFetcher};
pub use rest::RestFetcher;
pub use series_cache::{SeriesCache, SeriesMap};
pub use snapshot_cache::SnapshotCache;
pub use synthetic::SyntheticFetcher;
