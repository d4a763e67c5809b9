//! PDF text extraction, one entry per page.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::debug;

use super::{Extraction, PageText, TextExtractor};

/// Leading bytes of every PDF file.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Extracts per-page text with `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn accepts(&self, bytes: &[u8]) -> bool {
        // Some generators emit a BOM or blank line before the header.
        bytes
            .windows(PDF_MAGIC.len())
            .take(16)
            .any(|window| window == PDF_MAGIC)
    }

    fn extract(&self, bytes: &[u8]) -> Extraction {
        // The parser panics on some malformed inputs; contain it to this document.
        let result = catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }));

        match result {
            Ok(Ok(pages)) => {
                debug!(pages = pages.len(), "extracted PDF text");
                Extraction::from_pages(
                    (1u32..)
                        .zip(pages)
                        .map(|(page_number, text)| PageText { page_number, text })
                        .collect(),
                )
            }
            Ok(Err(error)) => Extraction::Failed {
                reason: format!("unreadable PDF: {error}"),
            },
            Err(_) => Extraction::Failed {
                reason: "PDF parser panicked".to_string(),
            },
        }
    }
}
