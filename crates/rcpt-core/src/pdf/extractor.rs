//! PDF text-layer extraction using lopdf and pdf-extract.

use lopdf::Document;
use tracing::{debug, trace};

use super::{PageSource, Result, TextLayer};
use crate::error::PdfError;
use crate::models::config::PdfConfig;

/// Text-layer extractor backed by lopdf.
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    config: PdfConfig,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new(config: PdfConfig) -> Self {
        Self { config }
    }

    /// Parse a PDF, decrypting it with the empty password when needed.
    pub fn load(&self, data: &[u8]) -> Result<PdfDocument> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        let raw_data = if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract needs the decrypted bytes for the fallback path
            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        let total_pages = doc.get_pages().len() as u32;
        if total_pages == 0 {
            return Err(PdfError::NoPages);
        }

        let page_count = match self.config.max_pages {
            0 => total_pages,
            max => total_pages.min(max),
        };

        debug!("Loaded PDF with {} pages, reading {}", total_pages, page_count);
        Ok(PdfDocument {
            document: doc,
            raw_data,
            page_count,
        })
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new(PdfConfig::default())
    }
}

impl TextLayer for PdfExtractor {
    fn is_available(&self) -> bool {
        self.config.text_layer
    }

    fn open(&self, data: &[u8]) -> Result<Box<dyn PageSource>> {
        Ok(Box::new(self.load(data)?))
    }
}

/// A loaded PDF, read page by page.
pub struct PdfDocument {
    document: Document,
    raw_data: Vec<u8>,
    page_count: u32,
}

impl PdfDocument {
    fn whole_document_text(&self) -> Result<String> {
        pdf_extract::extract_text_from_mem(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }
}

impl PageSource for PdfDocument {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn page_text(&self, page: u32) -> Result<String> {
        if page == 0 || page > self.page_count {
            return Err(PdfError::InvalidPage(page));
        }

        match self.document.extract_text(&[page]) {
            Ok(text) => {
                trace!("Page {}: {} chars", page, text.len());
                Ok(text)
            }
            Err(e) if self.page_count == 1 => {
                debug!("lopdf text extraction failed ({}), trying pdf-extract", e);
                self.whole_document_text()
            }
            Err(e) => Err(PdfError::TextExtraction(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support::text_pdf;

    #[test]
    fn test_rejects_garbage() {
        let err = PdfExtractor::default().load(b"not a pdf").err().unwrap();
        assert!(matches!(err, PdfError::Parse(_)));
    }

    #[test]
    fn test_availability_follows_config() {
        let enabled = PdfExtractor::default();
        let disabled = PdfExtractor::new(PdfConfig {
            text_layer: false,
            ..PdfConfig::default()
        });
        assert!(enabled.is_available());
        assert!(!disabled.is_available());
    }

    #[test]
    fn test_max_pages_bounds_page_count() {
        let data = text_pdf(&[&["one"], &["two"], &["three"]]);
        let extractor = PdfExtractor::new(PdfConfig {
            max_pages: 2,
            ..PdfConfig::default()
        });
        assert_eq!(extractor.load(&data).unwrap().page_count(), 2);
        assert_eq!(PdfExtractor::default().load(&data).unwrap().page_count(), 3);
    }

    #[test]
    fn test_page_text() {
        let data = text_pdf(&[&["ACME HARDWARE", "Total: $19.99"], &["Page two"]]);
        let doc = PdfExtractor::default().load(&data).unwrap();

        let first = doc.page_text(1).unwrap();
        assert!(first.contains("ACME HARDWARE"));
        assert!(first.contains("19.99"));
        assert!(doc.page_text(2).unwrap().contains("Page two"));
        assert!(matches!(doc.page_text(3), Err(PdfError::InvalidPage(3))));
    }
}
