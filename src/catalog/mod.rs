//! SQLite-backed catalog of downloads, sessions and statements.
//!
//! # Overview
//!
//! - [`Catalog`] - main interface over the shared [`Database`]
//! - [`DownloadRecord`] / [`DownloadStatus`] - one row per source document
//! - [`NewStatement`] / [`PersistSummary`] - statement persistence
//! - [`Mp`] - read-only roster rows
//! - [`CatalogRepository`] - async seam used by the reconciler and processor
//!
//! # Example
//!
//! ```ignore
//! use hansard_core::catalog::Catalog;
//! use hansard_core::Database;
//!
//! let db = Database::new_in_memory().await?;
//! let catalog = Catalog::new(db);
//! for record in catalog.records_to_process(false).await? {
//!     println!("{record}");
//! }
//! ```

mod error;
mod record;
mod repository;
mod statement;

pub use error::CatalogError;
pub use record::{DownloadRecord, DownloadStatus, RecordUpsert};
pub use repository::CatalogRepository;
pub use statement::{Mp, NewStatement, PersistSummary};

use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::dedup::{self, InsertOutcome};
use crate::document::SessionPeriod;
use record::DATE_FORMAT;

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Catalog manager over the ingestion tables.
#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

impl Catalog {
    /// Creates a catalog over `db`.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the underlying database.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Looks up the record for a listing URL.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn find_record_by_url(&self, source_url: &str) -> Result<Option<DownloadRecord>> {
        let record = sqlx::query_as::<_, DownloadRecord>(
            r"SELECT * FROM download_records WHERE source_url = ?",
        )
        .bind(source_url)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(record)
    }

    /// Returns file paths claimed by records other than `source_url` that
    /// start with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    pub async fn claimed_paths(&self, prefix: &str, source_url: &str) -> Result<Vec<String>> {
        // substr() instead of LIKE: file names contain `_` wildcards.
        let rows: Vec<(String,)> = sqlx::query_as(
            r"SELECT file_path FROM download_records
              WHERE substr(file_path, 1, length(?1)) = ?1 AND source_url != ?2
              ORDER BY file_path",
        )
        .bind(prefix)
        .bind(source_url)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(|(path,)| path).collect())
    }

    /// Creates the record for `values.source_url`, or refreshes it in place.
    ///
    /// The record's `session_id` is never touched.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the upsert fails.
    #[instrument(skip(self, values), fields(url = %values.source_url, status = %values.status))]
    pub async fn upsert_record(&self, values: &RecordUpsert<'_>) -> Result<DownloadRecord> {
        let record = sqlx::query_as::<_, DownloadRecord>(
            r"INSERT INTO download_records (
                  source_url, file_path, title, published_date, session_period,
                  file_size, content_checksum, status, last_error
              ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
              ON CONFLICT(source_url) DO UPDATE SET
                  file_path = excluded.file_path,
                  title = excluded.title,
                  published_date = excluded.published_date,
                  session_period = excluded.session_period,
                  file_size = excluded.file_size,
                  content_checksum = excluded.content_checksum,
                  status = excluded.status,
                  last_error = excluded.last_error,
                  updated_at = datetime('now')
              RETURNING *",
        )
        .bind(values.source_url)
        .bind(values.file_path)
        .bind(values.title)
        .bind(values.published_date.map(format_date))
        .bind(values.session_period.as_str())
        .bind(i64::try_from(values.file_size).unwrap_or(i64::MAX))
        .bind(values.content_checksum)
        .bind(values.status.as_str())
        .bind(values.last_error)
        .fetch_one(self.db.pool())
        .await?;

        debug!(id = record.id, file = %record.file_path, "download record stored");
        Ok(record)
    }

    /// Returns stored documents awaiting processing, oldest sitting first.
    ///
    /// With `force`, already-processed documents are included too.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn records_to_process(&self, force: bool) -> Result<Vec<DownloadRecord>> {
        let records = sqlx::query_as::<_, DownloadRecord>(
            r"SELECT * FROM download_records
              WHERE status IN ('downloaded', 'pre_existing')
                AND (session_id IS NULL OR ?)
              ORDER BY published_date ASC, id ASC",
        )
        .bind(force)
        .fetch_all(self.db.pool())
        .await?;

        Ok(records)
    }

    /// Loads the MP roster.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    pub async fn load_mps(&self) -> Result<Vec<Mp>> {
        let mps = sqlx::query_as::<_, Mp>(
            r"SELECT id, name, constituency, party, term_id FROM mps ORDER BY id",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(mps)
    }

    /// Returns the parliamentary term whose date range contains `date`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    pub async fn term_for_date(&self, date: NaiveDate) -> Result<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as(TERM_FOR_DATE_SQL)
            .bind(format_date(date))
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|(id,)| id))
    }

    /// Writes a processed document as one transaction.
    ///
    /// Gets or creates the session for `record`, inserts `statements` in
    /// order (hash conflicts count as duplicates), and links the record to
    /// the session. Nothing is written if any step fails.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::RecordNotFound`] if the record vanished,
    /// [`CatalogError::MissingDate`] if it has no sitting date, or
    /// [`CatalogError::Database`] if a statement fails.
    #[instrument(skip(self, record, statements), fields(record_id = record.id, statements = statements.len()))]
    pub async fn persist_document(
        &self,
        record: &DownloadRecord,
        statements: &[NewStatement],
    ) -> Result<PersistSummary> {
        let date = record
            .published_date()
            .ok_or(CatalogError::MissingDate(record.id))?;

        let mut tx = self.db.pool().begin().await?;

        // Write first so the transaction holds the write lock before reading.
        let touched = sqlx::query(
            r"UPDATE download_records SET updated_at = datetime('now') WHERE id = ?",
        )
        .bind(record.id)
        .execute(&mut *tx)
        .await?;
        if touched.rows_affected() == 0 {
            return Err(CatalogError::RecordNotFound(record.id));
        }

        let existing: Option<(i64,)> =
            sqlx::query_as(r"SELECT id FROM sessions WHERE download_record_id = ?")
                .bind(record.id)
                .fetch_optional(&mut *tx)
                .await?;

        let (session_id, session_created) = if let Some((id,)) = existing {
            (id, false)
        } else {
            let term: Option<(i64,)> = sqlx::query_as(TERM_FOR_DATE_SQL)
                .bind(format_date(date))
                .fetch_optional(&mut *tx)
                .await?;
            let (id,): (i64,) = sqlx::query_as(
                r"INSERT INTO sessions (session_date, session_period, download_record_id, term_id)
                  VALUES (?, ?, ?, ?)
                  RETURNING id",
            )
            .bind(format_date(date))
            .bind(record.session_period().as_str())
            .bind(record.id)
            .bind(term.map(|(t,)| t))
            .fetch_one(&mut *tx)
            .await?;
            (id, true)
        };

        let mut summary = PersistSummary {
            session_id,
            session_created,
            ..PersistSummary::default()
        };

        for (sequence, statement) in (0u32..).zip(statements) {
            match dedup::try_insert(&mut tx, session_id, sequence, statement).await? {
                InsertOutcome::Inserted => summary.inserted += 1,
                InsertOutcome::Duplicate => summary.duplicates += 1,
            }
        }

        sqlx::query(r"UPDATE download_records SET session_id = ? WHERE id = ?")
            .bind(session_id)
            .bind(record.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(
            session_id,
            session_created,
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            "document persisted"
        );
        Ok(summary)
    }

    /// Returns the number of stored statements.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    pub async fn count_statements(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(r"SELECT COUNT(*) FROM statements")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    /// Returns the number of sessions for `period` on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Database`] if the query fails.
    pub async fn count_sessions_on(&self, date: NaiveDate, period: SessionPeriod) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r"SELECT COUNT(*) FROM sessions WHERE session_date = ? AND session_period = ?",
        )
        .bind(format_date(date))
        .bind(period.as_str())
        .fetch_one(self.db.pool())
        .await?;
        Ok(count)
    }
}

const TERM_FOR_DATE_SQL: &str = r"SELECT id FROM parliamentary_terms
    WHERE start_date <= ?1 AND (end_date IS NULL OR end_date >= ?1)
    ORDER BY start_date DESC
    LIMIT 1";

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::attribute::AttributionConfidence;

    async fn catalog() -> Catalog {
        Catalog::new(Database::new_in_memory().await.unwrap())
    }

    fn upsert<'a>(url: &'a str, path: &'a str, status: DownloadStatus) -> RecordUpsert<'a> {
        RecordUpsert {
            source_url: url,
            file_path: path,
            title: "Afternoon Session 4th December 2025",
            published_date: NaiveDate::from_ymd_opt(2025, 12, 4),
            session_period: SessionPeriod::Afternoon,
            file_size: 10,
            content_checksum: Some("abc"),
            status,
            last_error: None,
        }
    }

    fn statement(text: &str, mp_id: Option<i64>) -> NewStatement {
        NewStatement {
            speaker_raw: Some("Hon. Jane Doe".to_string()),
            mp_id,
            attribution: if mp_id.is_some() {
                AttributionConfidence::Exact
            } else {
                AttributionConfidence::Unattributed
            },
            raw_text: text.to_string(),
            page_number: 1,
            bill_references: Vec::new(),
        }
    }

    // ==================== Record Tests ====================

    #[tokio::test]
    async fn test_upsert_creates_then_updates_single_record() {
        let catalog = catalog().await;

        let first = catalog
            .upsert_record(&upsert("http://x/a.pdf", "hansard_20251204_A.pdf", DownloadStatus::Downloaded))
            .await
            .unwrap();
        let mut refreshed = upsert("http://x/a.pdf", "hansard_20251204_A.pdf", DownloadStatus::Downloaded);
        refreshed.file_size = 99;
        let second = catalog.upsert_record(&refreshed).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.file_size, 99);
        assert_eq!(second.status(), DownloadStatus::Downloaded);
        assert_eq!(second.session_period(), SessionPeriod::Afternoon);
        assert_eq!(second.published_date(), NaiveDate::from_ymd_opt(2025, 12, 4));
        assert!(catalog.find_record_by_url("http://x/a.pdf").await.unwrap().is_some());
        assert!(catalog.find_record_by_url("http://x/b.pdf").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_claimed_paths_excludes_own_record_and_treats_underscore_literally() {
        let catalog = catalog().await;
        catalog
            .upsert_record(&upsert("http://x/a.pdf", "hansard_20251204_A.pdf", DownloadStatus::Downloaded))
            .await
            .unwrap();
        catalog
            .upsert_record(&upsert("http://x/b.pdf", "hansard_20251204_A_2.pdf", DownloadStatus::Failed))
            .await
            .unwrap();
        catalog
            .upsert_record(&upsert("http://x/c.pdf", "hansardX20251204_A.pdf", DownloadStatus::Downloaded))
            .await
            .unwrap();

        let claimed = catalog
            .claimed_paths("hansard_20251204_A", "http://x/b.pdf")
            .await
            .unwrap();

        assert_eq!(claimed, vec!["hansard_20251204_A.pdf"]);
    }

    #[tokio::test]
    async fn test_records_to_process_skips_failed_and_processed() {
        let catalog = catalog().await;
        let done = catalog
            .upsert_record(&upsert("http://x/a.pdf", "a.pdf", DownloadStatus::Downloaded))
            .await
            .unwrap();
        catalog
            .upsert_record(&upsert("http://x/b.pdf", "b.pdf", DownloadStatus::PreExisting))
            .await
            .unwrap();
        catalog
            .upsert_record(&upsert("http://x/c.pdf", "c.pdf", DownloadStatus::Failed))
            .await
            .unwrap();
        catalog.persist_document(&done, &[]).await.unwrap();

        let pending = catalog.records_to_process(false).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].file_path, "b.pdf");

        assert_eq!(catalog.records_to_process(true).await.unwrap().len(), 2);
    }

    // ==================== Persistence Tests ====================

    #[tokio::test]
    async fn test_persist_document_is_idempotent() {
        let catalog = catalog().await;
        sqlx::query("INSERT INTO mps (name) VALUES ('Jane Doe')")
            .execute(catalog.database().pool())
            .await
            .unwrap();
        let record = catalog
            .upsert_record(&upsert("http://x/a.pdf", "a.pdf", DownloadStatus::Downloaded))
            .await
            .unwrap();
        let statements = vec![statement("First.", Some(1)), statement("Second.", None)];

        let first = catalog.persist_document(&record, &statements).await.unwrap();
        let second = catalog.persist_document(&record, &statements).await.unwrap();

        assert!(first.session_created);
        assert_eq!(first.inserted, 2);
        assert!(!second.session_created);
        assert_eq!(second.session_id, first.session_id);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 2);
        assert_eq!(catalog.count_statements().await.unwrap(), 2);

        let linked = catalog.find_record_by_url("http://x/a.pdf").await.unwrap().unwrap();
        assert_eq!(linked.session_id, Some(first.session_id));

        let date = NaiveDate::from_ymd_opt(2025, 12, 4).unwrap();
        assert_eq!(catalog.count_sessions_on(date, SessionPeriod::Afternoon).await.unwrap(), 1);
        assert_eq!(catalog.count_sessions_on(date, SessionPeriod::Morning).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_persist_document_assigns_term_by_date() {
        let catalog = catalog().await;
        sqlx::query(
            "INSERT INTO parliamentary_terms (name, start_date, end_date) VALUES ('12th', '2017-08-31', '2022-08-08'), ('13th', '2022-09-08', NULL)",
        )
        .execute(catalog.database().pool())
        .await
        .unwrap();
        let record = catalog
            .upsert_record(&upsert("http://x/a.pdf", "a.pdf", DownloadStatus::Downloaded))
            .await
            .unwrap();

        let summary = catalog.persist_document(&record, &[]).await.unwrap();

        let (term,): (Option<i64>,) = sqlx::query_as("SELECT term_id FROM sessions WHERE id = ?")
            .bind(summary.session_id)
            .fetch_one(catalog.database().pool())
            .await
            .unwrap();
        assert_eq!(term, Some(2));
        assert_eq!(
            catalog
                .term_for_date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
                .await
                .unwrap(),
            Some(1)
        );
        assert_eq!(
            catalog
                .term_for_date(NaiveDate::from_ymd_opt(2022, 8, 20).unwrap())
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_persist_document_requires_date() {
        let catalog = catalog().await;
        let mut values = upsert("http://x/a.pdf", "a.pdf", DownloadStatus::Downloaded);
        values.published_date = None;
        let record = catalog.upsert_record(&values).await.unwrap();

        assert!(matches!(
            catalog.persist_document(&record, &[]).await,
            Err(CatalogError::MissingDate(_))
        ));
    }
}
