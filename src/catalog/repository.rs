//! Repository seam for catalog persistence operations.
//!
//! The reconciler and processing engine depend on this trait rather than on
//! [`Catalog`] directly, so either can be driven against a test double.

use async_trait::async_trait;

use super::{Catalog, DownloadRecord, Mp, NewStatement, PersistSummary, RecordUpsert, Result};

/// Data-access contract for ingestion.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Looks up the record for a listing URL.
    async fn find_record_by_url(&self, source_url: &str) -> Result<Option<DownloadRecord>>;

    /// Returns paths starting with `prefix` claimed by other records.
    async fn claimed_paths(&self, prefix: &str, source_url: &str) -> Result<Vec<String>>;

    /// Creates or refreshes a download record.
    async fn upsert_record(&self, values: &RecordUpsert<'_>) -> Result<DownloadRecord>;

    /// Returns stored documents awaiting processing.
    async fn records_to_process(&self, force: bool) -> Result<Vec<DownloadRecord>>;

    /// Loads the MP roster.
    async fn load_mps(&self) -> Result<Vec<Mp>>;

    /// Persists one processed document atomically.
    async fn persist_document(
        &self,
        record: &DownloadRecord,
        statements: &[NewStatement],
    ) -> Result<PersistSummary>;
}

#[async_trait]
impl CatalogRepository for Catalog {
    async fn find_record_by_url(&self, source_url: &str) -> Result<Option<DownloadRecord>> {
        Catalog::find_record_by_url(self, source_url).await
    }

    async fn claimed_paths(&self, prefix: &str, source_url: &str) -> Result<Vec<String>> {
        Catalog::claimed_paths(self, prefix, source_url).await
    }

    async fn upsert_record(&self, values: &RecordUpsert<'_>) -> Result<DownloadRecord> {
        Catalog::upsert_record(self, values).await
    }

    async fn records_to_process(&self, force: bool) -> Result<Vec<DownloadRecord>> {
        Catalog::records_to_process(self, force).await
    }

    async fn load_mps(&self) -> Result<Vec<Mp>> {
        Catalog::load_mps(self).await
    }

    async fn persist_document(
        &self,
        record: &DownloadRecord,
        statements: &[NewStatement],
    ) -> Result<PersistSummary> {
        Catalog::persist_document(self, record, statements).await
    }
}
