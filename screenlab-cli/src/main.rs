//! ScreenLab CLI — daily screening and backtest jobs.
//!
//! Commands:
//! - `scan` — evaluate every strategy for the resolved trading dates
//! - `backtest` — score unscored historical signals with forward returns
//! - `cache status` — report on-disk series cache coverage
//!
//! Date arguments follow the schedule surface: none resolves the latest
//! valid trading date from the session clock, one is a comma-separated
//! list, two are an inclusive range.

use anyhow::Result;
use clap::{Parser, Subcommand};
use screenlab_core::data::{
    MarketDataFetcher, RestFetcher, SeriesDiskCache, SyntheticFetcher,
};
use screenlab_runner::{
    CsvStore, DateSpec, JobKind, Pipeline, RunConfig, ScheduleDriver, SignalStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "screenlab", about = "ScreenLab CLI — daily equity screening pipeline")]
struct Cli {
    /// Path to a TOML run configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the strategy scan for the given dates.
    Scan {
        /// Zero dates (implicit), one comma-separated list, or two for a range.
        #[arg(num_args = 0..=2)]
        dates: Vec<String>,
    },
    /// Score unscored historical signals for the given dates.
    Backtest {
        /// Zero dates (implicit), one comma-separated list, or two for a range.
        #[arg(num_args = 0..=2)]
        dates: Vec<String>,
    },
    /// On-disk cache commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached instruments and their date ranges.
    Status {
        /// Instrument codes to inspect.
        #[arg(required = true)]
        codes: Vec<String>,
    },
}

fn build_fetcher(config: &RunConfig) -> Arc<dyn MarketDataFetcher> {
    match &config.rest_base_url {
        Some(base_url) => Arc::new(
            RestFetcher::new(base_url.clone())
                .with_disk_cache(SeriesDiskCache::new(&config.cache_dir)),
        ),
        None => Arc::new(SyntheticFetcher::new(config.synthetic_instruments, 1)),
    }
}

fn run_job(
    config: &RunConfig,
    dates: &[String],
    kind: JobKind,
    job: impl Fn(&Pipeline, chrono::NaiveDate) -> Result<()> + Send + Sync,
) -> Result<()> {
    let fetcher = build_fetcher(config);
    let store: Arc<dyn SignalStore> =
        Arc::new(CsvStore::new(&config.output_dir, config.forward_days));
    let pipeline = Pipeline::bootstrap(fetcher, store, config)?;

    let spec = DateSpec::from_args(dates)?;
    let driver = ScheduleDriver::new(Arc::clone(pipeline.calendar()))
        .with_pacing(Duration::from_secs(config.pacing_secs));

    let summary = driver.run(&spec, kind, None, |date| job(&pipeline, date))?;
    println!(
        "done: {} dates submitted, {} failed",
        summary.submitted, summary.failed
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = RunConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan { dates } => run_job(
            &config,
            &dates,
            JobKind::LatestAvailable,
            |pipeline, date| pipeline.run_scan(date).map(|_| ()),
        ),
        Commands::Backtest { dates } => run_job(
            &config,
            &dates,
            JobKind::Finalized,
            |pipeline, date| pipeline.run_backtest(date),
        ),
        Commands::Cache {
            action: CacheAction::Status { codes },
        } => {
            let cache = SeriesDiskCache::new(&config.cache_dir);
            let codes: Vec<&str> = codes.iter().map(String::as_str).collect();
            for status in cache.status(&codes) {
                match (status.start_date, status.end_date, status.bar_count) {
                    (Some(start), Some(end), Some(count)) => {
                        println!("{}: {count} bars, {start} .. {end}", status.code)
                    }
                    _ => println!("{}: not cached", status.code),
                }
            }
            Ok(())
        }
    }
}
