//! Collision-free stored file names.
//!
//! Names follow `hansard_{YYYYMMDD}_{A|P|E}[_{N}].pdf`. The first document of
//! a date and period takes the bare name; later ones take `_2`, `_3`, ...

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::document::SessionPeriod;

/// Extension of stored documents.
const EXTENSION: &str = ".pdf";

/// Returns the name stem shared by every document of `date` and `period`.
///
/// The stem doubles as the allocation lock key.
///
/// ```
/// use chrono::NaiveDate;
/// use hansard_core::document::SessionPeriod;
/// use hansard_core::reconcile::slot_stem;
///
/// let date = NaiveDate::from_ymd_opt(2025, 12, 4).unwrap();
/// assert_eq!(slot_stem(date, SessionPeriod::Afternoon), "hansard_20251204_A");
/// ```
#[must_use]
pub fn slot_stem(date: NaiveDate, period: SessionPeriod) -> String {
    format!("hansard_{}_{}", date.format("%Y%m%d"), period.file_code())
}

/// Returns the `n`th candidate name for `stem` (1-based; 1 has no suffix).
#[must_use]
pub fn candidate_name(stem: &str, n: u32) -> String {
    if n <= 1 {
        format!("{stem}{EXTENSION}")
    } else {
        format!("{stem}_{n}{EXTENSION}")
    }
}

/// Picks the first candidate for `stem` not present in `claimed`.
///
/// Pure over its inputs: with `base, _2, ..., _k` claimed the result is
/// `_{k+1}`, and a free bare name is always preferred.
#[must_use]
pub fn allocate_filename(stem: &str, claimed: &HashSet<String>) -> String {
    (1u32..)
        .map(|n| candidate_name(stem, n))
        .find(|name| !claimed.contains(name))
        .unwrap_or_else(|| candidate_name(stem, u32::MAX))
}
