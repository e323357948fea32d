use std::path::Path;
use std::process::Command;

use crate::error::{LookupError, Result};

pub trait OcrEngine: Send + Sync {
    /// Best-effort transcription of one page image.
    fn recognize(&self, image: &Path) -> Result<String>;
}

/// Runs the `tesseract` CLI, reading the transcription from stdout.
pub struct TesseractOcr {
    program: String,
    language: String,
    page_segmentation_mode: u8,
}

impl TesseractOcr {
    pub fn new(program: &str, language: &str) -> Self {
        Self {
            program: program.to_string(),
            language: language.to_string(),
            // fully automatic page segmentation, no OSD
            page_segmentation_mode: 3,
        }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("tesseract", "jpn+eng")
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &Path) -> Result<String> {
        let output = Command::new(&self.program)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.page_segmentation_mode.to_string())
            .output()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    LookupError::Ocr(format!("{} is not installed", self.program))
                } else {
                    LookupError::Ocr(format!("failed to run {}: {err}", self.program))
                }
            })?;

        if !output.status.success() {
            return Err(LookupError::Ocr(format!(
                "{} exited with status {} for {}",
                self.program,
                output.status,
                image.display()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
