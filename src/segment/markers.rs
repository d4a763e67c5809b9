//! Speaker marker recognition.
//!
//! A marker opens a line and ends with a colon:
//!
//! * presiding officers: `The Temporary Deputy Speaker (Hon. Jane Doe):`
//! * honorific names: `Hon. (Dr.) John Mbadi (Suba South, ODM):`
//! * collective markers: `Hon. Members:`, `An Hon. Member:`

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static SPEAKER_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    let name = r"\p{Lu}[\p{L}'’.\-]*";
    let name_part = format!(r"(?:{name}|wa|ole|bin|de|van|von|arap|\((?i:dr|prof)\.?\))");
    let honorific = r"(?:(?i:hon|sen|dr|mr|mrs|ms|prof|amb|eng)\.?\s+)";
    let presiding = r"(?:The\s+)?(?:Temporary\s+)?(?:Deputy\s+)?(?:Speaker|Chairperson|Chairman|Chair|Clerk)(?:\s*\([^)]{2,120}\))?";
    let member = format!(
        r"(?:(?:An|Some|Several)\s+)?{honorific}+(?:\((?i:dr|prof)\.?\)\s+)?{name}(?:\s+{name_part}){{0,5}}(?:\s*\([^)]{{1,120}}\))?"
    );
    Regex::new(&format!(
        r"^\s*(?P<speaker>{presiding}|{member})\s*:\s*(?P<rest>.*)$"
    ))
    .expect("speaker marker regex is valid") // Static pattern, safe to panic
});

/// A speaker marker found at the start of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker<'a> {
    /// The marker text without the trailing colon.
    pub speaker: &'a str,
    /// Whatever follows the colon on the same line.
    pub rest: &'a str,
}

/// Matches a speaker marker at the start of `line`.
#[must_use]
pub fn match_marker(line: &str) -> Option<Marker<'_>> {
    let caps = SPEAKER_MARKER.captures(line)?;
    let speaker = caps.name("speaker")?.as_str().trim();
    let rest = caps.name("rest").map_or("", |m| m.as_str().trim());
    Some(Marker { speaker, rest })
}
