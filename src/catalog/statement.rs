//! Statement and reference-table row types.

use serde::Serialize;
use sqlx::FromRow;

use crate::attribute::AttributionConfidence;

/// An attributed statement ready to persist.
///
/// Its position in the slice handed to `persist_document` becomes its
/// `sequence`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStatement {
    /// Speaker marker as it appeared in the text, if any.
    pub speaker_raw: Option<String>,
    /// Matched MP, when attribution succeeded.
    pub mp_id: Option<i64>,
    /// How the MP was matched.
    pub attribution: AttributionConfidence,
    /// Statement text.
    pub raw_text: String,
    /// One-based source page.
    pub page_number: u32,
    /// Bills mentioned, in order of first appearance.
    pub bill_references: Vec<String>,
}

/// Counts from persisting one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PersistSummary {
    /// Session the statements belong to.
    pub session_id: i64,
    /// Whether the session row was created by this call.
    pub session_created: bool,
    /// Statements written.
    pub inserted: u64,
    /// Statements skipped because their hash already existed.
    pub duplicates: u64,
}

/// One row of the externally populated `mps` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Mp {
    /// Unique identifier.
    pub id: i64,
    /// Display name, possibly with titles.
    pub name: String,
    /// Constituency, when recorded.
    pub constituency: Option<String>,
    /// Party, when recorded.
    pub party: Option<String>,
    /// Parliamentary term, when recorded.
    pub term_id: Option<i64>,
}
