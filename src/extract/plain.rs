//! Plain-text documents, paginated by form feeds.

use super::{Extraction, PageText, TextExtractor};

/// Page separator in text exports.
const FORM_FEED: char = '\u{0c}';

/// Extracts UTF-8 text, one page per form-feed-separated chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn accepts(&self, bytes: &[u8]) -> bool {
        std::str::from_utf8(bytes).is_ok()
    }

    fn extract(&self, bytes: &[u8]) -> Extraction {
        let Ok(text) = std::str::from_utf8(bytes) else {
            return Extraction::Failed {
                reason: "document is not valid UTF-8".to_string(),
            };
        };

        let pages = (1u32..)
            .zip(text.split(FORM_FEED))
            .map(|(page_number, chunk)| PageText {
                page_number,
                text: chunk.to_string(),
            })
            .collect();

        Extraction::from_pages(pages)
    }
}
