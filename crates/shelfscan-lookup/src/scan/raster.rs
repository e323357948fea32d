use std::path::{Path, PathBuf};
use std::process::Command;

use lopdf::Document;
use tracing::debug;

use crate::error::{LookupError, Result};

/// One rendered PDF page living inside a scan's scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    /// 1-based page number.
    pub number: u32,
    pub image: PathBuf,
}

pub trait PageRasterizer: Send + Sync {
    fn page_count(&self, pdf_path: &Path) -> Result<u32>;

    /// Render a single page into `scratch_dir`.
    fn render_page(&self, pdf_path: &Path, page: u32, scratch_dir: &Path) -> Result<RawPage>;
}

/// Page counts via `lopdf` (falling back to `pdfinfo`), rendering via `pdftoppm`.
pub struct PdftoppmRasterizer {
    pdftoppm_program: String,
    pdfinfo_program: String,
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(pdftoppm_program: &str, pdfinfo_program: &str, dpi: u32) -> Self {
        Self {
            pdftoppm_program: pdftoppm_program.to_string(),
            pdfinfo_program: pdfinfo_program.to_string(),
            dpi,
        }
    }

    fn page_count_with_pdfinfo(&self, pdf_path: &Path) -> Option<u32> {
        let output = Command::new(&self.pdfinfo_program).arg(pdf_path).output().ok()?;
        if !output.status.success() {
            return None;
        }
        parse_pdfinfo_pages_output(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new("pdftoppm", "pdfinfo", 300)
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn page_count(&self, pdf_path: &Path) -> Result<u32> {
        match Document::load(pdf_path) {
            Ok(document) => u32::try_from(document.get_pages().len()).map_err(|_| {
                LookupError::Pdf(format!("page count overflow in {}", pdf_path.display()))
            }),
            Err(err) => {
                debug!(path = %pdf_path.display(), error = %err, "lopdf failed, trying pdfinfo");
                self.page_count_with_pdfinfo(pdf_path).ok_or_else(|| {
                    LookupError::Pdf(format!(
                        "cannot read page count of {}: {err}",
                        pdf_path.display()
                    ))
                })
            }
        }
    }

    fn render_page(&self, pdf_path: &Path, page: u32, scratch_dir: &Path) -> Result<RawPage> {
        let prefix = scratch_dir.join(format!("page-{page}"));
        let output = Command::new(&self.pdftoppm_program)
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg("-singlefile")
            .arg(pdf_path)
            .arg(&prefix)
            .output()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    LookupError::Pdf(format!("{} is not installed", self.pdftoppm_program))
                } else {
                    LookupError::Pdf(format!("failed to run {}: {err}", self.pdftoppm_program))
                }
            })?;

        if !output.status.success() {
            return Err(LookupError::Pdf(format!(
                "{} exited with status {} on page {page} of {}: {}",
                self.pdftoppm_program,
                output.status,
                pdf_path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let image = prefix.with_extension("png");
        if !image.is_file() {
            return Err(LookupError::Pdf(format!(
                "{} produced no image for page {page}",
                self.pdftoppm_program
            )));
        }
        Ok(RawPage { number: page, image })
    }
}

fn parse_pdfinfo_pages_output(stdout: &str) -> Option<u32> {
    stdout.lines().find_map(|line| {
        let trimmed = line.trim();
        if !trimmed.to_ascii_lowercase().starts_with("pages:") {
            return None;
        }
        trimmed
            .split(':')
            .nth(1)
            .and_then(|value| value.split_whitespace().next())
            .and_then(|value| value.parse::<u32>().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pdfinfo_page_line() {
        let stdout = "Title:          scan\nProducer:       ScanSnap\nPages:          214\nEncrypted:      no\n";
        assert_eq!(parse_pdfinfo_pages_output(stdout), Some(214));
        assert_eq!(parse_pdfinfo_pages_output("Title: x\n"), None);
    }

    #[test]
    fn unreadable_pdf_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let pdf = dir.path().join("broken.pdf");
        std::fs::write(&pdf, b"not a pdf").unwrap();

        let rasterizer = PdftoppmRasterizer::new("pdftoppm", "shelfscan-no-such-pdfinfo", 150);
        assert!(matches!(rasterizer.page_count(&pdf), Err(LookupError::Pdf(_))));
    }
}
