//! Text extraction from stored documents.
//!
//! Extraction is synchronous and CPU-bound; async callers run it on the
//! blocking pool. Every outcome is a value: a document with no text at all
//! is [`Extraction::NoText`], not an error.

mod pdf;
mod plain;

pub use pdf::PdfExtractor;
pub use plain::PlainTextExtractor;

/// Text of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// One-based page number.
    pub page_number: u32,
    /// Extracted text; empty for image-only pages.
    pub text: String,
}

/// Result of extracting a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// At least one page produced text. Pages are in document order.
    Text(Vec<PageText>),
    /// The document parsed but no page produced any text.
    NoText {
        /// Number of pages seen.
        pages: usize,
    },
    /// The document could not be read.
    Failed {
        /// Why.
        reason: String,
    },
}

impl Extraction {
    /// Classifies extracted pages as `Text` or `NoText`.
    #[must_use]
    pub fn from_pages(pages: Vec<PageText>) -> Self {
        if pages.iter().all(|p| p.text.trim().is_empty()) {
            Self::NoText { pages: pages.len() }
        } else {
            Self::Text(pages)
        }
    }
}

/// Converts raw document bytes into paginated text.
pub trait TextExtractor: Send + Sync {
    /// Returns true when this extractor understands `bytes`.
    fn accepts(&self, bytes: &[u8]) -> bool;

    /// Extracts every page of `bytes`.
    fn extract(&self, bytes: &[u8]) -> Extraction;
}

/// Picks an extractor by content sniffing.
pub struct DocumentExtractor {
    extractors: Vec<Box<dyn TextExtractor>>,
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self {
            extractors: vec![Box::new(PdfExtractor), Box::new(PlainTextExtractor)],
        }
    }
}

impl DocumentExtractor {
    /// Creates a dispatcher over the given extractors, tried in order.
    #[must_use]
    pub fn new(extractors: Vec<Box<dyn TextExtractor>>) -> Self {
        Self { extractors }
    }
}

impl TextExtractor for DocumentExtractor {
    fn accepts(&self, bytes: &[u8]) -> bool {
        self.extractors.iter().any(|e| e.accepts(bytes))
    }

    fn extract(&self, bytes: &[u8]) -> Extraction {
        match self.extractors.iter().find(|e| e.accepts(bytes)) {
            Some(extractor) => extractor.extract(bytes),
            None => Extraction::Failed {
                reason: "unrecognised document format".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pages_with_only_blank_pages_is_no_text() {
        let pages = vec![
            PageText {
                page_number: 1,
                text: String::new(),
            },
            PageText {
                page_number: 2,
                text: " \n".to_string(),
            },
        ];
        assert_eq!(Extraction::from_pages(pages), Extraction::NoText { pages: 2 });
        assert_eq!(Extraction::from_pages(Vec::new()), Extraction::NoText { pages: 0 });
    }

    #[test]
    fn test_dispatch_rejects_binary_garbage() {
        let extractor = DocumentExtractor::default();
        let garbage = [0xff, 0xfe, 0x00, 0x81];
        assert!(!extractor.accepts(&garbage));
        assert!(matches!(
            extractor.extract(&garbage),
            Extraction::Failed { .. }
        ));
    }

    #[test]
    fn test_dispatch_routes_plain_text() {
        let extractor = DocumentExtractor::default();
        match extractor.extract(b"Hon. Jane Doe: Thank you.") {
            Extraction::Text(pages) => assert_eq!(pages.len(), 1),
            other => panic!("unexpected extraction: {other:?}"),
        }
    }
}
