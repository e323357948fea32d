//! ISBN recovery from scanned PDFs.
//!
//! Trailing matter (back cover, colophon) is the most likely place for a
//! printed ISBN, so the last `page_window` pages are scanned from the back.

pub mod ocr;
pub mod raster;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::identifiers::extract_isbn_from_ocr_text;
use shelfscan_core::ScanConfig;

pub use ocr::{OcrEngine, TesseractOcr};
pub use raster::{PageRasterizer, PdftoppmRasterizer, RawPage};

pub const DEFAULT_PAGE_WINDOW: usize = 13;

#[derive(Clone)]
pub struct IsbnScanner {
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: Arc<dyn OcrEngine>,
    page_window: usize,
}

impl IsbnScanner {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self {
            rasterizer,
            ocr,
            page_window: DEFAULT_PAGE_WINDOW,
        }
    }

    /// Scanner backed by `pdftoppm` and `tesseract`.
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(
            Arc::new(PdftoppmRasterizer::new(
                &config.pdftoppm_program,
                &config.pdfinfo_program,
                config.dpi,
            )),
            Arc::new(TesseractOcr::new(&config.tesseract_program, &config.ocr_language)),
        )
        .with_page_window(config.page_window)
    }

    /// A window of zero is treated as one page.
    pub fn with_page_window(mut self, page_window: usize) -> Self {
        self.page_window = page_window.max(1);
        self
    }

    pub fn page_window(&self) -> usize {
        self.page_window
    }

    /// Page numbers to scan, last page first.
    fn pages_to_scan(&self, total_pages: u32) -> impl Iterator<Item = u32> {
        let window = u32::try_from(self.page_window).unwrap_or(u32::MAX);
        let first = if total_pages > window {
            total_pages - window + 1
        } else {
            1
        };
        (first..=total_pages).rev()
    }

    /// Find the ISBN printed in `pdf_path`.
    ///
    /// `Ok(None)` means no page in the window carried a recognizable ISBN.
    /// An unreadable PDF is an error; an OCR failure only skips that page.
    pub fn scan(&self, pdf_path: &Path) -> Result<Option<String>> {
        let total_pages = self.rasterizer.page_count(pdf_path)?;
        debug!(path = %pdf_path.display(), total_pages, window = self.page_window, "scanning for ISBN");

        // Rendered pages are removed with the directory on every return path.
        let scratch = tempfile::Builder::new().prefix("shelfscan-pages-").tempdir()?;

        for page in self.pages_to_scan(total_pages) {
            let raw = self.rasterizer.render_page(pdf_path, page, scratch.path())?;
            let text = match self.ocr.recognize(&raw.image) {
                Ok(text) => text,
                Err(err) => {
                    warn!(path = %pdf_path.display(), page, error = %err, "OCR failed, skipping page");
                    continue;
                }
            };

            if let Some(isbn) = extract_isbn_from_ocr_text(&text) {
                info!(path = %pdf_path.display(), page, %isbn, "found ISBN");
                return Ok(Some(isbn));
            }
        }

        Ok(None)
    }
}
