//! Run configuration, loaded from TOML.

use screenlab_core::backtest::{DEFAULT_FORWARD_DAYS, DEFAULT_SCORE_WORKERS};
use screenlab_core::data::series_cache::DEFAULT_SERIES_WORKERS;
use screenlab_core::strategy::DEFAULT_EVAL_WORKERS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory for the on-disk series cache.
    pub cache_dir: PathBuf,

    /// Directory the signal store writes to.
    pub output_dir: PathBuf,

    /// Quote-API base URL. When absent, the synthetic provider is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest_base_url: Option<String>,

    /// Universe size for the synthetic provider.
    pub synthetic_instruments: usize,

    /// Forward days scored by the backtest job.
    pub forward_days: usize,

    /// Worker pool bounds.
    pub series_workers: usize,
    pub eval_workers: usize,
    pub score_workers: usize,

    /// Seconds between schedule submissions.
    pub pacing_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("data/cache"),
            output_dir: PathBuf::from("data/signals"),
            rest_base_url: None,
            synthetic_instruments: 200,
            forward_days: DEFAULT_FORWARD_DAYS,
            series_workers: DEFAULT_SERIES_WORKERS,
            eval_workers: DEFAULT_EVAL_WORKERS,
            score_workers: DEFAULT_SCORE_WORKERS,
            pacing_secs: 2,
        }
    }
}

impl RunConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("read config {}: {e}", path.display()))?;
        toml::from_str(&content).map_err(|e| anyhow::anyhow!("parse config: {e}"))
    }

    /// Load from a file when given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }
}
