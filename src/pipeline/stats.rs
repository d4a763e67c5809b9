//! Run statistics.
//!
//! Workers update a shared [`StatsRecorder`] through atomic counters; the
//! finished run is read out as a plain, serialisable [`RunStatistics`].

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::attribute::AttributionConfidence;
use crate::catalog::NewStatement;

/// One failed listing page, download, or document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// URL or stored file the failure concerns.
    pub source: String,
    /// Why.
    pub reason: String,
}

/// Aggregate counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    /// Document links seen on listing pages, including filtered ones.
    pub documents_discovered: u64,
    /// Links dropped by the date window.
    pub filtered_by_date: u64,
    /// Documents fetched for the first time.
    pub downloaded: u64,
    /// Known documents fetched again because their file was missing.
    pub redownloaded: u64,
    /// Files already on disk that were recorded without fetching.
    pub pre_existing: u64,
    /// Documents with both a record and a file; nothing done.
    pub already_present: u64,
    /// Downloads that failed after retries.
    pub download_failed: u64,
    /// Documents segmented and persisted.
    pub documents_processed: u64,
    /// Documents with no extractable text.
    pub documents_no_text: u64,
    /// Documents that could not be read, extracted or persisted.
    pub processing_errors: u64,
    /// Statements written.
    pub statements_inserted: u64,
    /// Statements already stored under the same content hash.
    pub statements_duplicate_skipped: u64,
    /// Statements attributed by exact name match.
    pub statements_exact: u64,
    /// Statements attributed by fuzzy match.
    pub statements_fuzzy: u64,
    /// Statements with no attributed MP.
    pub statements_unattributed: u64,
    /// Distinct MPs attributed at least once.
    pub mps_identified: u64,
    /// Every failure, in the order it happened.
    pub failures: Vec<Failure>,
}

/// Overall result of a run, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing failed.
    Success,
    /// Some work succeeded and some failed.
    Partial,
    /// Something failed and nothing succeeded.
    Failed,
}

impl RunOutcome {
    /// Process exit code: 0, 2, or 1.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Partial => 2,
            Self::Failed => 1,
        }
    }
}

impl RunStatistics {
    /// Number of documents that ended in a good state this run.
    #[must_use]
    pub fn successes(&self) -> u64 {
        self.downloaded
            + self.redownloaded
            + self.pre_existing
            + self.already_present
            + self.documents_processed
            + self.documents_no_text
    }

    /// Classifies the run for the exit code.
    #[must_use]
    pub fn outcome(&self) -> RunOutcome {
        if self.failures.is_empty() {
            RunOutcome::Success
        } else if self.successes() > 0 {
            RunOutcome::Partial
        } else {
            RunOutcome::Failed
        }
    }
}

/// Thread-safe accumulator shared by the scrape driver and workers.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    documents_discovered: AtomicU64,
    filtered_by_date: AtomicU64,
    downloaded: AtomicU64,
    redownloaded: AtomicU64,
    pre_existing: AtomicU64,
    already_present: AtomicU64,
    download_failed: AtomicU64,
    documents_processed: AtomicU64,
    documents_no_text: AtomicU64,
    processing_errors: AtomicU64,
    statements_inserted: AtomicU64,
    statements_duplicate_skipped: AtomicU64,
    statements_exact: AtomicU64,
    statements_fuzzy: AtomicU64,
    statements_unattributed: AtomicU64,
    mp_ids: Mutex<HashSet<i64>>,
    failures: Mutex<Vec<Failure>>,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::SeqCst);
}

impl StatsRecorder {
    /// Creates a recorder with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_listing_page(&self, emitted: usize, filtered: usize) {
        bump(&self.documents_discovered, (emitted + filtered) as u64);
        bump(&self.filtered_by_date, filtered as u64);
    }

    pub(crate) fn record_listing_failure(&self, source: &str, reason: String) {
        self.push_failure(source, reason);
    }

    pub(crate) fn record_downloaded(&self) {
        bump(&self.downloaded, 1);
    }

    pub(crate) fn record_redownloaded(&self) {
        bump(&self.redownloaded, 1);
    }

    pub(crate) fn record_pre_existing(&self) {
        bump(&self.pre_existing, 1);
    }

    pub(crate) fn record_already_present(&self) {
        bump(&self.already_present, 1);
    }

    pub(crate) fn record_download_failure(&self, source: &str, reason: String) {
        bump(&self.download_failed, 1);
        self.push_failure(source, reason);
    }

    pub(crate) fn record_no_text(&self) {
        bump(&self.documents_no_text, 1);
    }

    pub(crate) fn record_processing_failure(&self, source: &str, reason: String) {
        bump(&self.processing_errors, 1);
        self.push_failure(source, reason);
    }

    /// Records a persisted document and its statements' attribution tiers.
    pub(crate) fn record_processed(&self, statements: &[NewStatement], inserted: u64, duplicates: u64) {
        bump(&self.documents_processed, 1);
        bump(&self.statements_inserted, inserted);
        bump(&self.statements_duplicate_skipped, duplicates);

        let mut ids = self.mp_ids.lock().unwrap_or_else(PoisonError::into_inner);
        for statement in statements {
            let counter = match statement.attribution {
                AttributionConfidence::Exact => &self.statements_exact,
                AttributionConfidence::Fuzzy => &self.statements_fuzzy,
                AttributionConfidence::Unattributed => &self.statements_unattributed,
            };
            bump(counter, 1);
            if let Some(id) = statement.mp_id {
                ids.insert(id);
            }
        }
    }

    fn push_failure(&self, source: &str, reason: String) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Failure {
                source: source.to_string(),
                reason,
            });
    }

    /// Reads out the current totals.
    #[must_use]
    pub fn snapshot(&self) -> RunStatistics {
        let load = |counter: &AtomicU64| counter.load(Ordering::SeqCst);
        let mps_identified = self.mp_ids.lock().unwrap_or_else(PoisonError::into_inner).len() as u64;
        RunStatistics {
            documents_discovered: load(&self.documents_discovered),
            filtered_by_date: load(&self.filtered_by_date),
            downloaded: load(&self.downloaded),
            redownloaded: load(&self.redownloaded),
            pre_existing: load(&self.pre_existing),
            already_present: load(&self.already_present),
            download_failed: load(&self.download_failed),
            documents_processed: load(&self.documents_processed),
            documents_no_text: load(&self.documents_no_text),
            processing_errors: load(&self.processing_errors),
            statements_inserted: load(&self.statements_inserted),
            statements_duplicate_skipped: load(&self.statements_duplicate_skipped),
            statements_exact: load(&self.statements_exact),
            statements_fuzzy: load(&self.statements_fuzzy),
            statements_unattributed: load(&self.statements_unattributed),
            mps_identified,
            failures: self
                .failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}
