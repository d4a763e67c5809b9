//! Processing engine: stored documents to persisted statements.
//!
//! Coordinates concurrent document processing with a semaphore, one Tokio
//! task per document. Extraction, segmentation and attribution are CPU-bound
//! and run on the blocking pool; persistence is one transaction per
//! document. A failure in one document is logged and counted and never
//! stops the others.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::stats::StatsRecorder;
use crate::attribute::Attributor;
use crate::catalog::{CatalogError, CatalogRepository, DownloadRecord, NewStatement, PersistSummary};
use crate::extract::{DocumentExtractor, Extraction, TextExtractor};
use crate::segment::segment;
use crate::storage::StoragePort;

/// Minimum allowed worker count.
const MIN_WORKERS: usize = 1;

/// Maximum allowed worker count.
const MAX_WORKERS: usize = 64;

/// Attempts at persisting a document while the database is locked.
const PERSIST_ATTEMPTS: u32 = 3;

/// Pause between persistence attempts on a locked database.
const PERSIST_BACKOFF: Duration = Duration::from_millis(200);

/// Error type for processing engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid worker count provided.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkers {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// What processing one document amounted to.
#[derive(Debug)]
enum DocumentOutcome {
    Processed {
        statements: Vec<NewStatement>,
        summary: PersistSummary,
    },
    NoText {
        pages: usize,
    },
    Failed {
        reason: String,
    },
}

/// Statements prepared off the async runtime.
enum Prepared {
    Statements(Vec<NewStatement>),
    NoText { pages: usize },
    Failed { reason: String },
}

/// Fans document processing out across a bounded worker pool.
pub struct ProcessingEngine {
    semaphore: Arc<Semaphore>,
    workers: usize,
    storage: Arc<dyn StoragePort>,
    catalog: Arc<dyn CatalogRepository>,
    extractor: Arc<DocumentExtractor>,
    attributor: Arc<Attributor>,
}

impl ProcessingEngine {
    /// Creates an engine with `workers` concurrent documents.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidWorkers`] outside 1..=64.
    pub fn new(
        workers: usize,
        storage: Arc<dyn StoragePort>,
        catalog: Arc<dyn CatalogRepository>,
        attributor: Arc<Attributor>,
    ) -> Result<Self, EngineError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&workers) {
            return Err(EngineError::InvalidWorkers { value: workers });
        }
        debug!(workers, roster = attributor.roster().len(), "creating processing engine");

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(workers)),
            workers,
            storage,
            catalog,
            extractor: Arc::new(DocumentExtractor::default()),
            attributor,
        })
    }

    /// Replaces the default extractor chain.
    #[must_use]
    pub fn with_extractor(mut self, extractor: DocumentExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Returns the configured worker count.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Processes every record, returning when all are done.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SemaphoreClosed`] if the semaphore is closed.
    /// Individual document failures are recorded in `stats`, not returned.
    #[instrument(skip_all, fields(documents = records.len(), workers = self.workers))]
    pub async fn process_all(
        &self,
        records: Vec<DownloadRecord>,
        stats: &Arc<StatsRecorder>,
    ) -> Result<(), EngineError> {
        let mut handles = Vec::with_capacity(records.len());
        info!("starting document processing");

        for record in records {
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| EngineError::SemaphoreClosed)?;

            let storage = Arc::clone(&self.storage);
            let catalog = Arc::clone(&self.catalog);
            let extractor = Arc::clone(&self.extractor);
            let attributor = Arc::clone(&self.attributor);
            let stats = Arc::clone(stats);

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let source = record.file_path.clone();

                match process_document(&record, storage, catalog, extractor, attributor).await {
                    DocumentOutcome::Processed { statements, summary } => {
                        info!(
                            file = %source,
                            session_id = summary.session_id,
                            inserted = summary.inserted,
                            duplicates = summary.duplicates,
                            "document processed"
                        );
                        stats.record_processed(&statements, summary.inserted, summary.duplicates);
                    }
                    DocumentOutcome::NoText { pages } => {
                        info!(file = %source, pages, "no extractable text");
                        stats.record_no_text();
                    }
                    DocumentOutcome::Failed { reason } => {
                        warn!(file = %source, url = %record.source_url, reason = %reason, "document processing failed");
                        stats.record_processing_failure(&source, reason);
                    }
                }
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "processing task panicked");
                stats.record_processing_failure("worker", format!("task panicked: {e}"));
            }
        }

        info!("document processing complete");
        Ok(())
    }
}

#[instrument(skip_all, fields(record_id = record.id, file = %record.file_path))]
async fn process_document(
    record: &DownloadRecord,
    storage: Arc<dyn StoragePort>,
    catalog: Arc<dyn CatalogRepository>,
    extractor: Arc<DocumentExtractor>,
    attributor: Arc<Attributor>,
) -> DocumentOutcome {
    let bytes = match storage.read(&record.file_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return DocumentOutcome::Failed {
                reason: e.to_string(),
            };
        }
    };

    let prepared = tokio::task::spawn_blocking(move || match extractor.extract(&bytes) {
        Extraction::Text(pages) => {
            let segments = segment(&pages);
            Prepared::Statements(attributor.attribute(&segments))
        }
        Extraction::NoText { pages } => Prepared::NoText { pages },
        Extraction::Failed { reason } => Prepared::Failed { reason },
    })
    .await;

    match prepared {
        Ok(Prepared::Statements(statements)) => {
            debug!(statements = statements.len(), "statements prepared");
            match persist_with_retry(catalog.as_ref(), record, &statements).await {
                Ok(summary) => DocumentOutcome::Processed { statements, summary },
                Err(e) => DocumentOutcome::Failed {
                    reason: e.to_string(),
                },
            }
        }
        // Linking an empty session marks the document done so it is not retried.
        Ok(Prepared::NoText { pages }) => match persist_with_retry(catalog.as_ref(), record, &[]).await {
            Ok(_) => DocumentOutcome::NoText { pages },
            Err(e) => DocumentOutcome::Failed {
                reason: e.to_string(),
            },
        },
        Ok(Prepared::Failed { reason }) => DocumentOutcome::Failed { reason },
        Err(e) => DocumentOutcome::Failed {
            reason: format!("extraction task failed: {e}"),
        },
    }
}

async fn persist_with_retry(
    catalog: &dyn CatalogRepository,
    record: &DownloadRecord,
    statements: &[NewStatement],
) -> Result<PersistSummary, CatalogError> {
    let mut attempt = 1;
    loop {
        match catalog.persist_document(record, statements).await {
            Err(e) if e.is_busy_or_locked() && attempt < PERSIST_ATTEMPTS => {
                debug!(attempt, error = %e, "database busy, retrying persist");
                tokio::time::sleep(PERSIST_BACKOFF * attempt).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::attribute::{DEFAULT_FUZZY_THRESHOLD, MpRoster};
    use crate::catalog::{Catalog, DownloadStatus, Mp, RecordUpsert};
    use crate::db::Database;
    use crate::document::SessionPeriod;
    use crate::storage::LocalStorage;
    use chrono::NaiveDate;

    struct Fixture {
        _dir: tempfile::TempDir,
        storage: Arc<dyn StoragePort>,
        catalog: Arc<Catalog>,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn StoragePort> = Arc::new(LocalStorage::new(dir.path()));
        let catalog = Arc::new(Catalog::new(Database::new_in_memory().await.unwrap()));
        Fixture {
            _dir: dir,
            storage,
            catalog,
        }
    }

    async fn stored(fx: &Fixture, url: &str, path: &str, bytes: &[u8]) -> DownloadRecord {
        fx.storage.write(path, bytes).await.unwrap();
        fx.catalog
            .upsert_record(&RecordUpsert {
                source_url: url,
                file_path: path,
                title: "Afternoon Session 4th December 2025",
                published_date: NaiveDate::from_ymd_opt(2025, 12, 4),
                session_period: SessionPeriod::Afternoon,
                file_size: bytes.len() as u64,
                content_checksum: None,
                status: DownloadStatus::Downloaded,
                last_error: None,
            })
            .await
            .unwrap()
    }

    fn engine(fx: &Fixture, workers: usize) -> ProcessingEngine {
        let roster = MpRoster::new(vec![Mp {
            id: 7,
            name: "Jane Doe".to_string(),
            constituency: None,
            party: None,
            term_id: None,
        }]);
        let catalog: Arc<dyn CatalogRepository> = fx.catalog.clone();
        ProcessingEngine::new(
            workers,
            Arc::clone(&fx.storage),
            catalog,
            Arc::new(Attributor::new(roster, DEFAULT_FUZZY_THRESHOLD)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_worker_bounds() {
        let fx = fixture().await;
        let attributor = Arc::new(Attributor::new(MpRoster::default(), DEFAULT_FUZZY_THRESHOLD));
        let catalog: Arc<dyn CatalogRepository> = fx.catalog.clone();
        for bad in [0, 65] {
            assert!(matches!(
                ProcessingEngine::new(
                    bad,
                    Arc::clone(&fx.storage),
                    Arc::clone(&catalog),
                    Arc::clone(&attributor)
                ),
                Err(EngineError::InvalidWorkers { .. })
            ));
        }
        assert_eq!(engine(&fx, 64).workers(), 64);
    }

    #[tokio::test]
    async fn test_custom_extractor_chain_limits_accepted_formats() {
        use crate::extract::PdfExtractor;

        let fx = fixture().await;
        let text = stored(&fx, "http://x/a.pdf", "hansard_20251204_A.pdf", b"Hon. Jane Doe: Aye.").await;

        let stats = Arc::new(StatsRecorder::new());
        engine(&fx, 1)
            .with_extractor(DocumentExtractor::new(vec![Box::new(PdfExtractor)]))
            .process_all(vec![text], &stats)
            .await
            .unwrap();

        let s = stats.snapshot();
        assert_eq!(s.documents_processed, 0);
        assert_eq!(s.processing_errors, 1);
        assert_eq!(fx.catalog.count_statements().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_other_documents() {
        let fx = fixture().await;
        let good = stored(
            &fx,
            "http://x/a.pdf",
            "hansard_20251204_A.pdf",
            b"PRAYERS\nHon. Jane Doe: I beg to move.\nHon. Members: Aye!",
        )
        .await;
        let corrupt = stored(&fx, "http://x/b.pdf", "hansard_20251204_A_2.pdf", b"%PDF-1.4 garbage").await;
        let blank = stored(&fx, "http://x/c.pdf", "hansard_20251204_A_3.pdf", b"\x0c \x0c").await;
        let mut missing = good.clone();
        missing.file_path = "gone.pdf".to_string();

        let stats = Arc::new(StatsRecorder::new());
        engine(&fx, 2)
            .process_all(vec![good, corrupt, blank, missing], &stats)
            .await
            .unwrap();

        let s = stats.snapshot();
        assert_eq!(s.documents_processed, 1);
        assert_eq!(s.documents_no_text, 1);
        assert_eq!(s.processing_errors, 2);
        assert_eq!(s.statements_inserted, 3);
        assert_eq!(s.statements_exact, 1);
        assert_eq!(s.statements_unattributed, 2);
        assert_eq!(s.mps_identified, 1);
        assert_eq!(fx.catalog.count_statements().await.unwrap(), 3);

        let pending = fx.catalog.records_to_process(false).await.unwrap();
        assert_eq!(pending.len(), 1, "only the corrupt document is left to retry");
    }
}
