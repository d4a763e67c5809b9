//! Run configuration: optional TOML file, command-line overrides, defaults.
//!
//! Precedence is command line, then file, then the defaults below. Every
//! value is range-checked after merging so a bad file value and a bad flag
//! fail the same way.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::attribute::DEFAULT_FUZZY_THRESHOLD;
use crate::db::DatabaseOptions;
use crate::fetch::DEFAULT_MAX_ATTEMPTS;
use crate::fetch::constants::{DEFAULT_REQUEST_DELAY, DEFAULT_REQUEST_TIMEOUT};
use crate::listing::DateFilter;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "hansard.toml";

/// National Assembly Hansard listing.
pub const DEFAULT_LISTING_URL: &str =
    "https://www.parliament.go.ke/the-national-assembly/house-business/hansard";

/// Default document store.
pub const DEFAULT_DATA_DIR: &str = "hansard-data";

/// Default database file.
pub const DEFAULT_DATABASE: &str = "hansard.db";

/// Default processing width.
pub const DEFAULT_WORKERS: usize = 4;

const WORKERS_RANGE: std::ops::RangeInclusive<usize> = 1..=64;
const TIMEOUT_SECS_RANGE: std::ops::RangeInclusive<u64> = 1..=600;
const ATTEMPTS_RANGE: std::ops::RangeInclusive<u32> = 1..=10;
const MAX_DELAY_MS: u64 = 60_000;
const THRESHOLD_RANGE: std::ops::RangeInclusive<f64> = 0.5..=1.0;
const DB_CONNECTIONS_RANGE: std::ops::RangeInclusive<u32> = 1..=20;
const MAX_DB_BUSY_TIMEOUT_MS: u64 = 120_000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value is outside its accepted range.
    #[error("invalid value for `{field}`: {value}. Expected range: {range}")]
    OutOfRange {
        field: &'static str,
        value: String,
        range: &'static str,
    },

    /// A date is not `YYYY-MM-DD`.
    #[error("invalid date for `{field}`: '{value}'. Expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },

    /// The date window is inverted.
    #[error("start date {start} is after end date {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },
}

impl ConfigError {
    fn out_of_range(field: &'static str, value: impl ToString, range: &'static str) -> Self {
        Self::OutOfRange {
            field,
            value: value.to_string(),
            range,
        }
    }
}

/// TOML-backed file configuration. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Listing page to walk.
    pub listing_url: Option<String>,
    /// Document store root.
    pub data_dir: Option<PathBuf>,
    /// SQLite database file.
    pub database: Option<PathBuf>,
    /// Processing worker count (1..=64).
    pub workers: Option<usize>,
    /// Delay between requests to the same host, in milliseconds (0..=60000).
    pub request_delay_ms: Option<u64>,
    /// Per-request timeout in seconds (1..=600).
    pub request_timeout_secs: Option<u64>,
    /// Fetch attempts per URL (1..=10).
    pub max_attempts: Option<u32>,
    /// Minimum fuzzy name similarity (0.5..=1.0).
    pub fuzzy_threshold: Option<f64>,
    /// Oldest sitting date to ingest, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Newest sitting date to ingest, `YYYY-MM-DD`.
    pub end_date: Option<String>,
    /// Default log filter when neither `RUST_LOG` nor a flag sets one.
    pub log_level: Option<String>,
    /// Database pool size (1..=20).
    pub db_max_connections: Option<u32>,
    /// Database busy timeout in milliseconds (0..=120000).
    pub db_busy_timeout_ms: Option<u64>,
}

impl FileConfig {
    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    pub fn parse(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&raw, path)?;
        debug!(path = %path.display(), "config file loaded");
        Ok(config)
    }

    /// Loads `explicit`, or `./hansard.toml` when present, or nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if a chosen file cannot be read or parsed. An
    /// explicit path that does not exist is an error; a missing default is not.
    pub fn discover(explicit: Option<&Path>) -> Result<Option<Self>, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path).map(Some);
        }
        let default = Path::new(DEFAULT_CONFIG_FILE);
        if default.is_file() {
            Self::load(default).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Values given on the command line; `None` defers to the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listing_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub workers: Option<usize>,
    pub request_delay_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub fuzzy_threshold: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub dry_run: bool,
    pub force_reprocess: bool,
    pub skip_scrape: bool,
    pub skip_process: bool,
    pub no_migrate: bool,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub listing_url: String,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub workers: usize,
    pub request_delay: Duration,
    pub request_timeout: Duration,
    pub max_attempts: u32,
    pub fuzzy_threshold: f64,
    pub date_filter: DateFilter,
    pub dry_run: bool,
    pub force_reprocess: bool,
    pub skip_scrape: bool,
    pub skip_process: bool,
    pub database: DatabaseOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            database_path: PathBuf::from(DEFAULT_DATABASE),
            workers: DEFAULT_WORKERS,
            request_delay: DEFAULT_REQUEST_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            date_filter: DateFilter::default(),
            dry_run: false,
            force_reprocess: false,
            skip_scrape: false,
            skip_process: false,
            database: DatabaseOptions::default(),
        }
    }
}

impl Settings {
    /// Merges overrides over the file over defaults, then validates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for any out-of-range value, unparsable date,
    /// or a start date after the end date.
    pub fn resolve(file: Option<&FileConfig>, cli: &Overrides) -> Result<Self, ConfigError> {
        let file = file.cloned().unwrap_or_default();
        let defaults = Self::default();

        let workers = cli.workers.or(file.workers).unwrap_or(defaults.workers);
        if !WORKERS_RANGE.contains(&workers) {
            return Err(ConfigError::out_of_range("workers", workers, "1..=64"));
        }

        let delay_ms = cli.request_delay_ms.or(file.request_delay_ms);
        if let Some(ms) = delay_ms
            && ms > MAX_DELAY_MS
        {
            return Err(ConfigError::out_of_range("request_delay_ms", ms, "0..=60000"));
        }

        let timeout_secs = cli.request_timeout_secs.or(file.request_timeout_secs);
        if let Some(secs) = timeout_secs
            && !TIMEOUT_SECS_RANGE.contains(&secs)
        {
            return Err(ConfigError::out_of_range("request_timeout_secs", secs, "1..=600"));
        }

        let max_attempts = cli
            .max_attempts
            .or(file.max_attempts)
            .unwrap_or(defaults.max_attempts);
        if !ATTEMPTS_RANGE.contains(&max_attempts) {
            return Err(ConfigError::out_of_range("max_attempts", max_attempts, "1..=10"));
        }

        let fuzzy_threshold = cli
            .fuzzy_threshold
            .or(file.fuzzy_threshold)
            .unwrap_or(defaults.fuzzy_threshold);
        if !THRESHOLD_RANGE.contains(&fuzzy_threshold) {
            return Err(ConfigError::out_of_range(
                "fuzzy_threshold",
                fuzzy_threshold,
                "0.5..=1.0",
            ));
        }

        let mut database = defaults.database.clone();
        if let Some(connections) = file.db_max_connections {
            if !DB_CONNECTIONS_RANGE.contains(&connections) {
                return Err(ConfigError::out_of_range("db_max_connections", connections, "1..=20"));
            }
            database.max_connections = connections;
        }
        if let Some(ms) = file.db_busy_timeout_ms {
            if ms > MAX_DB_BUSY_TIMEOUT_MS {
                return Err(ConfigError::out_of_range("db_busy_timeout_ms", ms, "0..=120000"));
            }
            database.busy_timeout = Duration::from_millis(ms);
        }
        database.run_migrations = !cli.no_migrate;

        let start = match cli.start_date {
            Some(date) => Some(date),
            None => parse_file_date("start_date", file.start_date.as_deref())?,
        };
        let end = match cli.end_date {
            Some(date) => Some(date),
            None => parse_file_date("end_date", file.end_date.as_deref())?,
        };
        if let (Some(start), Some(end)) = (start, end)
            && start > end
        {
            return Err(ConfigError::InvertedDateRange { start, end });
        }

        Ok(Self {
            listing_url: cli
                .listing_url
                .clone()
                .or(file.listing_url)
                .unwrap_or(defaults.listing_url),
            data_dir: cli.data_dir.clone().or(file.data_dir).unwrap_or(defaults.data_dir),
            database_path: cli
                .database
                .clone()
                .or(file.database)
                .unwrap_or(defaults.database_path),
            workers,
            request_delay: delay_ms.map_or(defaults.request_delay, Duration::from_millis),
            request_timeout: timeout_secs.map_or(defaults.request_timeout, Duration::from_secs),
            max_attempts,
            fuzzy_threshold,
            date_filter: DateFilter { start, end },
            dry_run: cli.dry_run,
            force_reprocess: cli.force_reprocess,
            skip_scrape: cli.skip_scrape,
            skip_process: cli.skip_process,
            database,
        })
    }
}

fn parse_file_date(field: &'static str, value: Option<&str>) -> Result<Option<NaiveDate>, ConfigError> {
    value
        .map(|raw| {
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| ConfigError::InvalidDate {
                field,
                value: raw.to_string(),
            })
        })
        .transpose()
}
