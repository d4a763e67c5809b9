//! End-to-end ingestion run.
//!
//! # Overview
//!
//! 1. Open the database and verify its schema. A missing table aborts the
//!    run before any network or file activity.
//! 2. Scrape: walk the listing and reconcile every in-window reference
//!    ([`scrape`]).
//! 3. Process: extract, segment, attribute and persist every stored,
//!    unprocessed document across a bounded worker pool ([`ProcessingEngine`]).
//! 4. Return [`RunStatistics`] for the summary and exit code.
//!
//! A dry run takes the same path against a [`DryRunStorage`] overlay and an
//! in-memory snapshot of the database.

mod process;
mod report;
mod scrape;
mod stats;

pub use process::{EngineError, ProcessingEngine};
pub use report::{render_human, render_json};
pub use scrape::scrape;
pub use stats::{Failure, RunOutcome, RunStatistics, StatsRecorder};

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::attribute::{Attributor, MpRoster};
use crate::catalog::{Catalog, CatalogError, CatalogRepository};
use crate::config::Settings;
use crate::db::{Database, DbError};
use crate::fetch::{FetchError, Fetcher, HttpFetcher, RateLimiter, RetryPolicy};
use crate::listing::{ListingError, ListingWalker};
use crate::reconcile::Reconciler;
use crate::storage::{DryRunStorage, LocalStorage, StoragePort};

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Opening, migrating, or verifying the database failed.
    #[error(transparent)]
    Database(#[from] DbError),

    /// A run-level catalog query failed.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The processing engine could not start.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The listing URL is unusable.
    #[error(transparent)]
    Listing(#[from] ListingError),

    /// The database directory could not be created.
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Runs one ingestion pass with `settings`.
///
/// # Errors
///
/// Returns [`PipelineError`] only for run-level failures (schema integrity,
/// client construction, run-level queries). Per-document failures are in the
/// returned statistics.
#[instrument(skip_all, fields(dry_run = settings.dry_run))]
pub async fn run(settings: &Settings) -> Result<RunStatistics, PipelineError> {
    let database = open_database(settings).await?;
    let catalog = Arc::new(Catalog::new(database.clone()));
    let stats = Arc::new(StatsRecorder::new());

    let local: Arc<dyn StoragePort> = Arc::new(LocalStorage::new(&settings.data_dir));
    let storage: Arc<dyn StoragePort> = if settings.dry_run {
        info!("dry run: document writes are held in memory");
        Arc::new(DryRunStorage::new(local))
    } else {
        local
    };

    if settings.skip_scrape {
        info!("scrape stage skipped");
    } else {
        let fetcher = build_fetcher(settings)?;
        let walker = ListingWalker::new(Arc::clone(&fetcher), &settings.listing_url)?;
        let reconciler = Reconciler::new(fetcher, Arc::clone(&storage), catalog.clone());
        info!(listing = %settings.listing_url, "scrape stage starting");
        scrape(&walker, &reconciler, settings.date_filter, &stats).await;
    }

    if settings.skip_process {
        info!("processing stage skipped");
    } else {
        let roster = MpRoster::new(catalog.load_mps().await?);
        if roster.is_empty() {
            warn!("MP roster is empty; every statement will be unattributed");
        }
        let attributor = Arc::new(Attributor::new(roster, settings.fuzzy_threshold));
        let repository: Arc<dyn CatalogRepository> = catalog.clone();
        let engine =
            ProcessingEngine::new(settings.workers, Arc::clone(&storage), repository, attributor)?;

        let records = catalog.records_to_process(settings.force_reprocess).await?;
        info!(
            documents = records.len(),
            force = settings.force_reprocess,
            "processing stage starting"
        );
        engine.process_all(records, &stats).await?;
    }

    let result = stats.snapshot();
    info!(
        discovered = result.documents_discovered,
        downloaded = result.downloaded,
        failed = result.download_failed,
        processed = result.documents_processed,
        inserted = result.statements_inserted,
        duplicates = result.statements_duplicate_skipped,
        failures = result.failures.len(),
        "run complete"
    );

    database.close().await;
    Ok(result)
}

fn build_fetcher(settings: &Settings) -> Result<Arc<dyn Fetcher>, FetchError> {
    let rate_limiter = if settings.request_delay.is_zero() {
        debug!("request spacing disabled");
        Arc::new(RateLimiter::disabled())
    } else {
        Arc::new(RateLimiter::new(settings.request_delay))
    };
    let fetcher = HttpFetcher::with_timeout(
        rate_limiter,
        RetryPolicy::with_max_attempts(settings.max_attempts),
        settings.request_timeout,
    )?;
    Ok(Arc::new(fetcher))
}

/// Opens and verifies the database a run works against.
///
/// A dry run never migrates or writes the live file: it verifies the live
/// schema and works on an in-memory copy, or on a fresh in-memory database
/// when no file exists yet.
async fn open_database(settings: &Settings) -> Result<Database, PipelineError> {
    let path = &settings.database_path;

    if settings.dry_run {
        if !path.exists() {
            info!(path = %path.display(), "dry run: no database yet, starting from an empty schema");
            return Ok(Database::new_in_memory().await?);
        }
        let live = Database::open_read_only(path, &settings.database).await?;
        live.verify_schema().await?;
        let snapshot = live.dry_run_snapshot().await?;
        live.close().await;
        return Ok(snapshot);
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| PipelineError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let database = Database::new(path, &settings.database).await?;
    database.verify_schema().await?;
    Ok(database)
}
