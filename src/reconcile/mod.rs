//! Download reconciliation.
//!
//! For each listed document the reconciler compares two facts, whether the
//! target file is in the store and whether a download record exists, and
//! takes exactly one action:
//!
//! | file | record | action |
//! |------|--------|--------|
//! | no   | no     | download, write, create record (`downloaded`) |
//! | yes  | no     | create record from the file (`pre_existing`) |
//! | no   | yes    | download again, refresh size and checksum |
//! | yes  | yes    | skip |

mod filename;
mod locks;

use std::collections::HashSet;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{CatalogError, CatalogRepository, DownloadRecord, DownloadStatus, RecordUpsert};
use crate::document::RemoteDocumentRef;
use crate::fetch::{Fetcher, fetch_document};
use crate::storage::{StorageError, StoragePort};

pub use filename::{allocate_filename, candidate_name, slot_stem};
pub use locks::SlotLocks;

/// The single action chosen for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Neither file nor record: fetch and record.
    Download,
    /// File without record: record the file as found.
    AdoptExisting,
    /// Record without file: fetch again.
    Redownload,
    /// Both present: nothing to do.
    Skip,
}

/// Maps `(file_exists, record_exists)` to its action.
///
/// ```
/// use hansard_core::reconcile::{ReconcileAction, decide};
///
/// assert_eq!(decide(false, false), ReconcileAction::Download);
/// assert_eq!(decide(true, true), ReconcileAction::Skip);
/// ```
#[must_use]
pub fn decide(file_exists: bool, record_exists: bool) -> ReconcileAction {
    match (file_exists, record_exists) {
        (false, false) => ReconcileAction::Download,
        (true, false) => ReconcileAction::AdoptExisting,
        (false, true) => ReconcileAction::Redownload,
        (true, true) => ReconcileAction::Skip,
    }
}

/// What happened to one listed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Fetched for the first time (or after an earlier failed attempt).
    Downloaded {
        /// Stored file name.
        file_path: String,
        /// Bytes written.
        bytes: u64,
    },
    /// Fetched again because the stored file was missing.
    Redownloaded {
        /// Stored file name.
        file_path: String,
        /// Bytes written.
        bytes: u64,
    },
    /// An unrecorded file was found and recorded.
    PreExisting {
        /// Stored file name.
        file_path: String,
    },
    /// File and record already present.
    Skipped {
        /// Stored file name.
        file_path: String,
    },
    /// The document could not be stored.
    Failed {
        /// Why.
        reason: String,
    },
}

/// Errors that stop reconciliation of one document.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Catalog read or write failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Store read or write failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Returns the hex SHA-256 of raw document bytes.
#[must_use]
pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Resolves listed documents against the store and the catalog.
pub struct Reconciler {
    fetcher: Arc<dyn Fetcher>,
    storage: Arc<dyn StoragePort>,
    catalog: Arc<dyn CatalogRepository>,
    locks: SlotLocks,
}

impl Reconciler {
    /// Creates a reconciler over the given collaborators.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        storage: Arc<dyn StoragePort>,
        catalog: Arc<dyn CatalogRepository>,
    ) -> Self {
        Self {
            fetcher,
            storage,
            catalog,
            locks: SlotLocks::new(),
        }
    }

    /// Reconciles one listed document.
    ///
    /// Download failures are recorded (`status = failed`) and returned as
    /// [`ReconcileOutcome::Failed`]; they are not errors.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] when the catalog or store itself fails.
    #[instrument(skip(self, doc), fields(url = %doc.source_url))]
    pub async fn reconcile(&self, doc: &RemoteDocumentRef) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(date) = doc.published_date else {
            warn!(title = %doc.title, "no sitting date in title or file name");
            return Ok(ReconcileOutcome::Failed {
                reason: "no sitting date in title or file name".to_string(),
            });
        };

        let stem = slot_stem(date, doc.session_period);
        let _slot = self.locks.lock(&stem).await;

        let record = self.catalog.find_record_by_url(&doc.source_url).await?;
        let file_path = match &record {
            Some(existing) => existing.file_path.clone(),
            None => {
                let claimed: HashSet<String> = self
                    .catalog
                    .claimed_paths(&stem, &doc.source_url)
                    .await?
                    .into_iter()
                    .collect();
                allocate_filename(&stem, &claimed)
            }
        };

        let file_exists = self.storage.exists(&file_path).await?;
        let action = decide(file_exists, record.is_some());
        debug!(file = %file_path, ?action, "reconcile decision");

        match action {
            ReconcileAction::Skip => Ok(ReconcileOutcome::Skipped { file_path }),
            ReconcileAction::AdoptExisting => self.adopt(doc, &file_path).await,
            ReconcileAction::Download | ReconcileAction::Redownload => {
                self.download(doc, &file_path, record.as_ref()).await
            }
        }
    }

    async fn adopt(
        &self,
        doc: &RemoteDocumentRef,
        file_path: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let bytes = self.storage.read(file_path).await?;
        let sum = checksum(&bytes);
        self.catalog
            .upsert_record(&RecordUpsert {
                source_url: &doc.source_url,
                file_path,
                title: &doc.title,
                published_date: doc.published_date,
                session_period: doc.session_period,
                file_size: bytes.len() as u64,
                content_checksum: Some(&sum),
                status: DownloadStatus::PreExisting,
                last_error: None,
            })
            .await?;

        info!(file = %file_path, "recorded pre-existing file");
        Ok(ReconcileOutcome::PreExisting {
            file_path: file_path.to_string(),
        })
    }

    async fn download(
        &self,
        doc: &RemoteDocumentRef,
        file_path: &str,
        previous: Option<&DownloadRecord>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let body = match fetch_document(self.fetcher.as_ref(), &doc.source_url).await {
            Ok(body) => body,
            Err(error) => {
                let reason = error.to_string();
                warn!(file = %file_path, error = %reason, "download failed");
                self.catalog
                    .upsert_record(&RecordUpsert {
                        source_url: &doc.source_url,
                        file_path,
                        title: &doc.title,
                        published_date: doc.published_date,
                        session_period: doc.session_period,
                        file_size: 0,
                        content_checksum: None,
                        status: DownloadStatus::Failed,
                        last_error: Some(&reason),
                    })
                    .await?;
                return Ok(ReconcileOutcome::Failed { reason });
            }
        };

        self.storage.write(file_path, &body.bytes).await?;
        let sum = checksum(&body.bytes);
        let bytes = body.bytes.len() as u64;

        self.catalog
            .upsert_record(&RecordUpsert {
                source_url: &doc.source_url,
                file_path,
                title: &doc.title,
                published_date: doc.published_date,
                session_period: doc.session_period,
                file_size: bytes,
                content_checksum: Some(&sum),
                status: DownloadStatus::Downloaded,
                last_error: None,
            })
            .await?;

        let file_path = file_path.to_string();
        match previous {
            Some(record) if record.status() != DownloadStatus::Failed => {
                info!(file = %file_path, bytes, "re-downloaded missing file");
                Ok(ReconcileOutcome::Redownloaded { file_path, bytes })
            }
            _ => {
                info!(file = %file_path, bytes, "downloaded");
                Ok(ReconcileOutcome::Downloaded { file_path, bytes })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::db::Database;
    use crate::document::SessionPeriod;
    use crate::fetch::{FetchError, FetchedBody};
    use crate::storage::LocalStorage;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct StubFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubFetcher {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedBody, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::http_status(url, 404));
            }
            Ok(FetchedBody {
                bytes: format!("%PDF-1.4 {url}").into_bytes(),
                content_type: Some("application/pdf".to_string()),
            })
        }
    }

    struct Fixture {
        _dir: TempDir,
        storage: Arc<LocalStorage>,
        catalog: Arc<Catalog>,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()));
        let catalog = Arc::new(Catalog::new(Database::new_in_memory().await.unwrap()));
        Fixture {
            _dir: dir,
            storage,
            catalog,
        }
    }

    fn reconciler(f: &Fixture, fetcher: Arc<StubFetcher>) -> Reconciler {
        Reconciler::new(fetcher, f.storage.clone(), f.catalog.clone())
    }

    fn doc(url: &str) -> RemoteDocumentRef {
        RemoteDocumentRef {
            source_url: url.to_string(),
            title: "Afternoon Session 4th December 2025".to_string(),
            published_date: NaiveDate::from_ymd_opt(2025, 12, 4),
            session_period: SessionPeriod::Afternoon,
        }
    }

    // ==================== Decision Table ====================

    #[test]
    fn test_decide_covers_every_combination() {
        assert_eq!(decide(false, false), ReconcileAction::Download);
        assert_eq!(decide(true, false), ReconcileAction::AdoptExisting);
        assert_eq!(decide(false, true), ReconcileAction::Redownload);
        assert_eq!(decide(true, true), ReconcileAction::Skip);
    }

    #[test]
    fn test_checksum_is_sha256_hex() {
        assert_eq!(
            checksum(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    // ==================== Reconcile Flows ====================

    #[tokio::test]
    async fn test_download_then_skip() {
        let f = fixture().await;
        let fetcher = StubFetcher::ok();
        let r = reconciler(&f, fetcher.clone());

        let first = r.reconcile(&doc("http://x/a.pdf")).await.unwrap();
        let second = r.reconcile(&doc("http://x/a.pdf")).await.unwrap();

        assert!(matches!(first, ReconcileOutcome::Downloaded { ref file_path, .. } if file_path == "hansard_20251204_A.pdf"));
        assert!(matches!(second, ReconcileOutcome::Skipped { .. }));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        let record = f.catalog.find_record_by_url("http://x/a.pdf").await.unwrap().unwrap();
        assert_eq!(record.status(), DownloadStatus::Downloaded);
        assert_eq!(record.content_checksum, Some(checksum(b"%PDF-1.4 http://x/a.pdf")));
    }

    #[tokio::test]
    async fn test_second_document_same_slot_gets_suffix() {
        let f = fixture().await;
        let r = reconciler(&f, StubFetcher::ok());

        r.reconcile(&doc("http://x/a.pdf")).await.unwrap();
        let second = r.reconcile(&doc("http://x/b.pdf")).await.unwrap();
        let third = r.reconcile(&doc("http://x/c.pdf")).await.unwrap();

        assert!(matches!(second, ReconcileOutcome::Downloaded { ref file_path, .. } if file_path == "hansard_20251204_A_2.pdf"));
        assert!(matches!(third, ReconcileOutcome::Downloaded { ref file_path, .. } if file_path == "hansard_20251204_A_3.pdf"));
    }

    #[tokio::test]
    async fn test_existing_file_without_record_is_adopted() {
        let f = fixture().await;
        f.storage.write("hansard_20251204_A.pdf", b"local").await.unwrap();
        let fetcher = StubFetcher::ok();
        let r = reconciler(&f, fetcher.clone());

        let outcome = r.reconcile(&doc("http://x/a.pdf")).await.unwrap();

        assert!(matches!(outcome, ReconcileOutcome::PreExisting { .. }));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        let record = f.catalog.find_record_by_url("http://x/a.pdf").await.unwrap().unwrap();
        assert_eq!(record.status(), DownloadStatus::PreExisting);
        assert_eq!(record.file_size, 5);
    }

    #[tokio::test]
    async fn test_missing_file_with_record_is_redownloaded() {
        let f = fixture().await;
        let r = reconciler(&f, StubFetcher::ok());
        r.reconcile(&doc("http://x/a.pdf")).await.unwrap();
        f.storage.delete("hansard_20251204_A.pdf").await.unwrap();

        let outcome = r.reconcile(&doc("http://x/a.pdf")).await.unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Redownloaded { .. }));
        assert!(f.storage.exists("hansard_20251204_A.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_download_is_recorded_and_retried_later() {
        let f = fixture().await;

        let failed = reconciler(&f, StubFetcher::failing())
            .reconcile(&doc("http://x/a.pdf"))
            .await
            .unwrap();
        assert!(matches!(failed, ReconcileOutcome::Failed { .. }));
        let record = f.catalog.find_record_by_url("http://x/a.pdf").await.unwrap().unwrap();
        assert_eq!(record.status(), DownloadStatus::Failed);
        assert_eq!(record.file_size, 0);
        assert!(record.last_error.unwrap().contains("404"));

        let retried = reconciler(&f, StubFetcher::ok())
            .reconcile(&doc("http://x/a.pdf"))
            .await
            .unwrap();
        assert!(matches!(retried, ReconcileOutcome::Downloaded { .. }));
    }

    #[tokio::test]
    async fn test_undated_document_fails_without_record() {
        let f = fixture().await;
        let mut undated = doc("http://x/op.pdf");
        undated.published_date = None;

        let outcome = reconciler(&f, StubFetcher::ok()).reconcile(&undated).await.unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Failed { .. }));
        assert!(f.catalog.find_record_by_url("http://x/op.pdf").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_same_slot_documents_get_distinct_names() {
        let f = fixture().await;
        let r = Arc::new(reconciler(&f, StubFetcher::ok()));

        let mut handles = Vec::new();
        for i in 0..5 {
            let r = Arc::clone(&r);
            handles.push(tokio::spawn(async move {
                r.reconcile(&doc(&format!("http://x/{i}.pdf"))).await.unwrap()
            }));
        }

        let mut names = HashSet::new();
        for handle in handles {
            if let ReconcileOutcome::Downloaded { file_path, .. } = handle.await.unwrap() {
                names.insert(file_path);
            }
        }

        let expected: HashSet<String> = (1..=5)
            .map(|n| candidate_name("hansard_20251204_A", n))
            .collect();
        assert_eq!(names, expected);
    }
}
