//! Native PDF text extraction.

use warraq_core::{Error, Result};

/// Structured-text extraction boundary.
///
/// Returns one string per page, in page order; a page with no extractable
/// text yields an empty string rather than an error. The page count of the
/// returned vector is authoritative for the document.
pub trait DocumentParser: Send + Sync {
    /// Extracts per-page text from PDF bytes.
    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>>;
}

/// Parser backed by `pdf-extract`.
///
/// `pdf-extract` returns the whole document as one string with form feed
/// characters (`\x0C`) between pages; splitting on them recovers the page
/// boundaries.
#[derive(Debug, Clone, Default)]
pub struct PdfParser;

impl PdfParser {
    /// Creates a new parser.
    pub fn new() -> Self {
        Self
    }
}

impl DocumentParser for PdfParser {
    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| Error::extraction(format!("pdf parse failed: {e}")))?;
        Ok(split_pages(&text))
    }
}

/// Splits extracted text into pages.
///
/// Form feeds are the page markers `pdf-extract` emits; text without them
/// falls back to triple-newline breaks. Blank extractions (scanned books
/// with no text layer at all) yield no pages.
fn split_pages(text: &str) -> Vec<String> {
    if text.contains('\x0C') {
        text.split('\x0C').map(str::to_string).collect()
    } else if !text.trim().is_empty() {
        text.split("\n\n\n").map(str::to_string).collect()
    } else {
        Vec::new()
    }
}
