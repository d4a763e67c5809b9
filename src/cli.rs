//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use hansard_core::Overrides;

/// Ingest Hansard documents and attribute statements to MPs.
///
/// Walks the Hansard listing, downloads new sitting reports, extracts
/// speaker-attributed statements, and stores them idempotently.
#[derive(Parser, Debug)]
#[command(name = "hansard")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Config file (default: ./hansard.toml when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Listing page URL
    #[arg(long, value_name = "URL")]
    pub listing_url: Option<String>,

    /// Document store directory
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Concurrent document workers (1-64)
    #[arg(short = 'w', long, value_parser = clap::value_parser!(u8).range(1..=64))]
    pub workers: Option<u8>,

    /// Oldest sitting date to ingest (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub start_date: Option<NaiveDate>,

    /// Newest sitting date to ingest (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub end_date: Option<NaiveDate>,

    /// Simulate the run without writing files or the database
    #[arg(long)]
    pub dry_run: bool,

    /// Reprocess documents that already have a session
    #[arg(long)]
    pub force_reprocess: bool,

    /// Skip listing discovery and downloads
    #[arg(long)]
    pub skip_scrape: bool,

    /// Skip text extraction and statement storage
    #[arg(long)]
    pub skip_process: bool,

    /// Fetch attempts per URL (1-10)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: Option<u32>,

    /// Delay between requests to the same host in milliseconds (0 to disable, max 60000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub request_delay_ms: Option<u64>,

    /// Per-request timeout in seconds (1-600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=600))]
    pub request_timeout_secs: Option<u64>,

    /// Minimum fuzzy name similarity (0.5-1.0)
    #[arg(long)]
    pub fuzzy_threshold: Option<f64>,

    /// Do not run migrations; fail if the schema is incomplete
    #[arg(long)]
    pub no_migrate: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// Command-line values for merging over the config file.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            listing_url: self.listing_url.clone(),
            data_dir: self.data_dir.clone(),
            database: self.database.clone(),
            workers: self.workers.map(usize::from),
            request_delay_ms: self.request_delay_ms,
            request_timeout_secs: self.request_timeout_secs,
            max_attempts: self.max_attempts,
            fuzzy_threshold: self.fuzzy_threshold,
            start_date: self.start_date,
            end_date: self.end_date,
            dry_run: self.dry_run,
            force_reprocess: self.force_reprocess,
            skip_scrape: self.skip_scrape,
            skip_process: self.skip_process,
            no_migrate: self.no_migrate,
        }
    }
}
