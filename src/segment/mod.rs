//! Statement segmentation.
//!
//! Pages are stripped of boilerplate and scanned line by line. A line that
//! opens with a speaker marker starts a new segment; every other line
//! belongs to the segment in progress. Text before the first marker forms
//! an unattributed segment. Segments run across page breaks and carry the
//! page on which they started.

mod bills;
mod boilerplate;
mod markers;
mod names;

pub use bills::extract_bill_references;
pub use boilerplate::{is_boilerplate, strip_boilerplate};
pub use markers::{Marker, match_marker};
pub use names::{SpeakerName, normalize_name, speaker_name};

use crate::extract::PageText;

/// One speaker's uninterrupted contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Marker text as printed, `None` before the first marker.
    pub speaker_raw: Option<String>,
    /// Spoken text with page furniture removed.
    pub text: String,
    /// Page on which the segment starts (1-based).
    pub page_number: u32,
}

#[derive(Debug)]
struct OpenSegment {
    speaker_raw: Option<String>,
    lines: Vec<String>,
    page_number: u32,
}

impl OpenSegment {
    fn new(speaker_raw: Option<String>, page_number: u32) -> Self {
        Self {
            speaker_raw,
            lines: Vec::new(),
            page_number,
        }
    }

    fn push(&mut self, line: &str) {
        let line = line.trim();
        if !line.is_empty() {
            self.lines.push(line.to_string());
        }
    }

    fn close(self) -> Option<Segment> {
        if self.lines.is_empty() {
            return None;
        }
        Some(Segment {
            speaker_raw: self.speaker_raw,
            text: self.lines.join("\n"),
            page_number: self.page_number,
        })
    }
}

/// Splits ordered pages into speaker segments, preserving page order.
///
/// Never fails: any input, including empty pages, yields a (possibly empty)
/// list.
#[must_use]
pub fn segment(pages: &[PageText]) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current: Option<OpenSegment> = None;

    for page in pages {
        for line in strip_boilerplate(&page.text) {
            if let Some(marker) = match_marker(line) {
                if let Some(done) = current.take().and_then(OpenSegment::close) {
                    segments.push(done);
                }
                let speaker = marker.speaker.split_whitespace().collect::<Vec<_>>().join(" ");
                let mut open = OpenSegment::new(Some(speaker), page.page_number);
                open.push(marker.rest);
                current = Some(open);
            } else {
                current
                    .get_or_insert_with(|| OpenSegment::new(None, page.page_number))
                    .push(line);
            }
        }
    }

    if let Some(done) = current.and_then(OpenSegment::close) {
        segments.push(done);
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page_number: u32, text: &str) -> PageText {
        PageText {
            page_number,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_preamble_is_unattributed() {
        let segments = segment(&[page(
            1,
            "PARLIAMENT OF KENYA\nPRAYERS\nHon. Jane Doe (Nairobi, ODM): I beg to move.",
        )]);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].speaker_raw, None);
        assert_eq!(segments[0].text, "PARLIAMENT OF KENYA\nPRAYERS");
        assert_eq!(segments[1].speaker_raw.as_deref(), Some("Hon. Jane Doe (Nairobi, ODM)"));
        assert_eq!(segments[1].text, "I beg to move.");
    }

    #[test]
    fn test_segments_continue_across_pages() {
        let segments = segment(&[
            page(1, "Hon. Jane Doe: The first part\nDecember 4, 2025 NATIONAL ASSEMBLY DEBATES 1"),
            page(2, "2 NATIONAL ASSEMBLY DEBATES December 4, 2025\ncontinues here.\nThe Speaker: Order!"),
        ]);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "The first part\ncontinues here.");
        assert_eq!(segments[0].page_number, 1);
        assert_eq!(segments[1].speaker_raw.as_deref(), Some("The Speaker"));
        assert_eq!(segments[1].page_number, 2);
    }

    #[test]
    fn test_marker_text_on_following_lines() {
        let segments = segment(&[page(3, "Hon. Members:\n(Applause)\nHon. John Mbadi:\nAye.")]);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "(Applause)");
        assert_eq!(segments[1].text, "Aye.");
        assert_eq!(segments[1].page_number, 3);
    }

    #[test]
    fn test_empty_markers_are_dropped() {
        let segments = segment(&[page(1, "Hon. Jane Doe:\nHon. John Mbadi: Aye.")]);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].speaker_raw.as_deref(), Some("Hon. John Mbadi"));
    }

    #[test]
    fn test_degenerate_input_never_panics() {
        assert!(segment(&[]).is_empty());
        assert!(segment(&[page(1, ""), page(2, "   \n\n")]).is_empty());

        let adversarial = [
            page(1, ":::\n(((((\nHon. (\nHon. ):\n\u{0}\u{feff}\u{202e}"),
            page(2, &"Hon. A: ".repeat(500)),
            page(3, "Mr.\u{00a0}Ωμέγα Ñandú (Ø): ünïcödé"),
        ];
        let segments = segment(&adversarial);
        assert!(!segments.is_empty());
        assert!(segments.iter().all(|s| !s.text.trim().is_empty()));
    }
}
