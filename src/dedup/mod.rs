//! Statement fingerprints and at-most-once insertion.
//!
//! A statement's content hash covers the session, the attributed MP (or an
//! `unattributed` marker) and the whitespace-normalised text. The same
//! document reprocessed against the same roster therefore produces the same
//! hashes, and the `UNIQUE` constraint on `statements.content_hash` turns
//! repeat inserts into counted duplicates.

use sha2::{Digest, Sha256};
use sqlx::SqliteConnection;
use tracing::trace;

use crate::catalog::NewStatement;

/// Marker hashed in place of an MP id for unattributed statements.
const UNATTRIBUTED_MARKER: &str = "unattributed";

/// Field separator (ASCII unit separator) inside the hashed payload.
const SEPARATOR: char = '\u{1f}';

/// Result of trying to persist one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written.
    Inserted,
    /// A row with the same content hash already exists.
    Duplicate,
}

/// Collapses runs of whitespace to single spaces and trims the ends.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Computes the hex SHA-256 content hash for a statement.
///
/// ```
/// use hansard_core::dedup::content_hash;
///
/// let a = content_hash(7, Some(12), "Thank you,   Mr Speaker.");
/// let b = content_hash(7, Some(12), "Thank you, Mr Speaker.\n");
/// assert_eq!(a, b);
/// assert_ne!(a, content_hash(7, None, "Thank you, Mr Speaker."));
/// ```
#[must_use]
pub fn content_hash(session_id: i64, mp_id: Option<i64>, text: &str) -> String {
    let speaker = mp_id.map_or_else(|| UNATTRIBUTED_MARKER.to_string(), |id| id.to_string());
    let payload = format!(
        "{session_id}{SEPARATOR}{speaker}{SEPARATOR}{}",
        normalize_text(text)
    );

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Inserts `statement` unless its content hash is already stored.
///
/// `sequence` is the statement's position within its document.
///
/// # Errors
///
/// Returns the database error for anything other than a hash conflict.
pub async fn try_insert(
    conn: &mut SqliteConnection,
    session_id: i64,
    sequence: u32,
    statement: &NewStatement,
) -> Result<InsertOutcome, sqlx::Error> {
    let hash = content_hash(session_id, statement.mp_id, &statement.raw_text);
    let bills = serde_json::to_string(&statement.bill_references)
        .unwrap_or_else(|_| "[]".to_string());

    let result = sqlx::query(
        r"INSERT INTO statements (
              session_id, mp_id, speaker_raw, attribution, raw_text,
              page_number, sequence, content_hash, bill_references
          ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
          ON CONFLICT(content_hash) DO NOTHING",
    )
    .bind(session_id)
    .bind(statement.mp_id)
    .bind(statement.speaker_raw.as_deref())
    .bind(statement.attribution.as_str())
    .bind(&statement.raw_text)
    .bind(i64::from(statement.page_number))
    .bind(i64::from(sequence))
    .bind(&hash)
    .bind(bills)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        trace!(session_id, sequence, hash = %hash, "duplicate statement skipped");
        Ok(InsertOutcome::Duplicate)
    } else {
        Ok(InsertOutcome::Inserted)
    }
}
