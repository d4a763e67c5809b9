//! Scrape stage: walk the listing and reconcile each reference.
//!
//! Runs sequentially so the per-host request delay holds across listing
//! pages and document downloads alike.

use std::pin::pin;

use futures_util::StreamExt;
use tracing::{debug, info, instrument, warn};

use super::stats::StatsRecorder;
use crate::listing::{DateFilter, ListingError, ListingWalker};
use crate::reconcile::{ReconcileOutcome, Reconciler};

/// Walks every in-window listing page and reconciles its references.
///
/// Listing and per-document failures are recorded in `stats`; nothing here
/// aborts the run.
#[instrument(skip_all)]
pub async fn scrape(
    walker: &ListingWalker,
    reconciler: &Reconciler,
    filter: DateFilter,
    stats: &StatsRecorder,
) {
    let mut pages = pin!(walker.walk(filter));

    while let Some(page) = pages.next().await {
        let page = match page {
            Ok(page) => page,
            Err(e) => {
                let source = match &e {
                    ListingError::Fetch { page, .. } => walker.page_url(*page).to_string(),
                    ListingError::InvalidUrl { url } => url.clone(),
                };
                warn!(source = %source, error = %e, "listing walk stopped");
                stats.record_listing_failure(&source, e.to_string());
                break;
            }
        };

        debug!(page = page.index, refs = page.refs.len(), filtered = page.filtered, "listing page");
        stats.record_listing_page(page.refs.len(), page.filtered);

        for doc in &page.refs {
            match reconciler.reconcile(doc).await {
                Ok(ReconcileOutcome::Downloaded { file_path, bytes }) => {
                    info!(url = %doc.source_url, file = %file_path, bytes, "downloaded");
                    stats.record_downloaded();
                }
                Ok(ReconcileOutcome::Redownloaded { file_path, bytes }) => {
                    info!(url = %doc.source_url, file = %file_path, bytes, "re-downloaded missing file");
                    stats.record_redownloaded();
                }
                Ok(ReconcileOutcome::PreExisting { file_path }) => {
                    info!(url = %doc.source_url, file = %file_path, "recorded pre-existing file");
                    stats.record_pre_existing();
                }
                Ok(ReconcileOutcome::Skipped { file_path }) => {
                    debug!(url = %doc.source_url, file = %file_path, "already present");
                    stats.record_already_present();
                }
                Ok(ReconcileOutcome::Failed { reason }) => {
                    warn!(url = %doc.source_url, reason = %reason, "download failed");
                    stats.record_download_failure(&doc.source_url, reason);
                }
                Err(e) => {
                    warn!(url = %doc.source_url, error = %e, "reconciliation failed");
                    stats.record_download_failure(&doc.source_url, e.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::catalog::Catalog;
    use crate::db::Database;
    use crate::fetch::{FetchError, FetchedBody, Fetcher};
    use crate::storage::{LocalStorage, StoragePort};

    struct SiteFetcher {
        bodies: HashMap<String, (Vec<u8>, &'static str)>,
    }

    #[async_trait]
    impl Fetcher for SiteFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedBody, FetchError> {
            match self.bodies.get(url) {
                Some((bytes, content_type)) => Ok(FetchedBody {
                    bytes: bytes.clone(),
                    content_type: Some((*content_type).to_string()),
                }),
                None => Err(FetchError::http_status(url, 404)),
            }
        }
    }

    #[tokio::test]
    async fn test_scrape_counts_each_outcome() {
        let listing = r#"<table>
            <tr><td><a href="/a.pdf">Afternoon Session 4th December 2025</a></td></tr>
            <tr><td><a href="/b.pdf">Morning Session 4th December 2025</a></td></tr>
            <tr><td><a href="/order.pdf">Order Paper</a></td></tr>
        </table>"#;
        let mut bodies = HashMap::new();
        bodies.insert(
            "http://x/hansard?page=0".to_string(),
            (listing.as_bytes().to_vec(), "text/html"),
        );
        bodies.insert(
            "http://x/a.pdf".to_string(),
            (b"%PDF-1.4 a".to_vec(), "application/pdf"),
        );
        let fetcher: Arc<dyn Fetcher> = Arc::new(SiteFetcher { bodies });

        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn StoragePort> = Arc::new(LocalStorage::new(dir.path()));
        let catalog = Arc::new(Catalog::new(Database::new_in_memory().await.unwrap()));

        let walker = ListingWalker::new(Arc::clone(&fetcher), "http://x/hansard").unwrap();
        let reconciler = Reconciler::new(fetcher, storage, catalog);
        let stats = StatsRecorder::new();

        scrape(&walker, &reconciler, DateFilter::default(), &stats).await;
        let first = stats.snapshot();
        assert_eq!(first.documents_discovered, 3);
        assert_eq!(first.downloaded, 1);
        // b.pdf is a 404; order.pdf carries no date.
        assert_eq!(first.download_failed, 2);

        let again = StatsRecorder::new();
        scrape(&walker, &reconciler, DateFilter::default(), &again).await;
        let second = again.snapshot();
        assert_eq!(second.already_present, 1);
        assert_eq!(second.downloaded, 0);
    }
}
