//! Lines that repeat on every page and belong to no speaker.

use std::sync::LazyLock;

use regex::Regex;

/// Publisher disclaimer, possibly wrapped over two lines.
#[allow(clippy::expect_used)]
static DISCLAIMER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*disclaimer\s*:|electronic\s+version\s+of\s+the\s+official\s+hansard|certified\s+version\s+of\s+this\s+report",
    )
    .expect("disclaimer regex is valid") // Static pattern, safe to panic
});

/// A page number alone on its line.
#[allow(clippy::expect_used)]
static PAGE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:page\s+)?\d{1,4}\s*$").expect("page number regex is valid"));

/// Running header: "December 4, 2025 NATIONAL ASSEMBLY DEBATES 23" or the
/// mirrored "23 NATIONAL ASSEMBLY DEBATES December 4, 2025".
#[allow(clippy::expect_used)]
static RUNNING_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:.{0,40}\b\d{4}\s+[\p{L} ]{0,40}\bdebates\s+\d{1,4}|\d{1,4}\s+[\p{L} ]{0,40}\bdebates\b.{0,40}\b\d{4})\s*$",
    )
    .expect("running header regex is valid")
});

/// Returns true when `line` is page furniture rather than proceedings.
#[must_use]
pub fn is_boilerplate(line: &str) -> bool {
    DISCLAIMER.is_match(line) || PAGE_NUMBER.is_match(line) || RUNNING_HEADER.is_match(line)
}

/// Removes boilerplate lines from one page of text.
#[must_use]
pub fn strip_boilerplate(page: &str) -> Vec<&str> {
    page.lines().filter(|line| !is_boilerplate(line)).collect()
}
