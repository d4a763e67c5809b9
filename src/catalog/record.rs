//! Download record types and status definitions.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::document::SessionPeriod;

/// Storage format for dates in the catalog.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// How a download record came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// Bytes were fetched and stored by this system.
    Downloaded,
    /// The file was already in the store when the record was created.
    PreExisting,
    /// The last download attempt failed; the file is absent.
    Failed,
}

impl DownloadStatus {
    /// Returns the database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Downloaded => "downloaded",
            Self::PreExisting => "pre_existing",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DownloadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "downloaded" => Ok(Self::Downloaded),
            "pre_existing" => Ok(Self::PreExisting),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid download status: {s}")),
        }
    }
}

/// One row of `download_records`.
#[derive(Debug, Clone, FromRow)]
pub struct DownloadRecord {
    /// Unique identifier.
    pub id: i64,
    /// Listing URL of the document (unique).
    pub source_url: String,
    /// Store-relative file name.
    pub file_path: String,
    /// Listing title.
    pub title: Option<String>,
    /// Sitting date as `YYYY-MM-DD`; parsed via `published_date()`.
    #[sqlx(rename = "published_date")]
    pub published_date_str: Option<String>,
    /// Sitting period; parsed via `session_period()`.
    #[sqlx(rename = "session_period")]
    pub session_period_str: String,
    /// Stored size in bytes (0 for failed records).
    pub file_size: i64,
    /// SHA-256 of the stored bytes.
    pub content_checksum: Option<String>,
    /// Session created from this document, once processed.
    pub session_id: Option<i64>,
    /// Status string; parsed via `status()`.
    #[sqlx(rename = "status")]
    pub status_str: String,
    /// Last download error, for failed records.
    pub last_error: Option<String>,
    /// When the record was created.
    pub created_at: String,
    /// When the record was last updated.
    pub updated_at: String,
}

impl DownloadRecord {
    /// Returns the parsed status.
    ///
    /// Falls back to `Failed` if the stored string is invalid.
    #[must_use]
    pub fn status(&self) -> DownloadStatus {
        self.status_str.parse().unwrap_or(DownloadStatus::Failed)
    }

    /// Returns the parsed session period.
    #[must_use]
    pub fn session_period(&self) -> SessionPeriod {
        self.session_period_str.parse().unwrap_or_default()
    }

    /// Returns the parsed sitting date.
    #[must_use]
    pub fn published_date(&self) -> Option<NaiveDate> {
        self.published_date_str
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
    }
}

impl fmt::Display for DownloadRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DownloadRecord {{ id: {}, file: {}, status: {} }}",
            self.id,
            self.file_path,
            self.status()
        )
    }
}

/// Values written when a record is created or refreshed.
#[derive(Debug, Clone)]
pub struct RecordUpsert<'a> {
    /// Listing URL (conflict key).
    pub source_url: &'a str,
    /// Store-relative file name.
    pub file_path: &'a str,
    /// Listing title.
    pub title: &'a str,
    /// Sitting date.
    pub published_date: Option<NaiveDate>,
    /// Sitting period.
    pub session_period: SessionPeriod,
    /// Stored size in bytes.
    pub file_size: u64,
    /// SHA-256 of the stored bytes.
    pub content_checksum: Option<&'a str>,
    /// Resulting status.
    pub status: DownloadStatus,
    /// Error text for failed records.
    pub last_error: Option<&'a str>,
}
