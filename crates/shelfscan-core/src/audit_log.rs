//! Append-only TSV status log: one `time\tSTATUS\tdetail` row per processed file.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStatus {
    Success,
    Error,
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogStatus::Success => f.write_str("SUCCESS"),
            LogStatus::Error => f.write_str("ERROR"),
        }
    }
}

pub struct AuditLog {
    path: PathBuf,
    file: File,
}

impl AuditLog {
    /// Open the log for appending, creating it (and its directory) if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn success(&mut self, destination: &Path) -> Result<()> {
        self.write(LogStatus::Success, &destination.display().to_string())
    }

    pub fn error(&mut self, cause: &str) -> Result<()> {
        self.write(LogStatus::Error, cause)
    }

    pub fn write(&mut self, status: LogStatus, detail: &str) -> Result<()> {
        let row = format_row(Local::now(), status, detail);
        self.file.write_all(row.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }
}

fn format_row(at: DateTime<Local>, status: LogStatus, detail: &str) -> String {
    // Keep one row per file even if the detail carries line breaks.
    let detail = detail.replace(['\n', '\r', '\t'], " ");
    format!("{}\t{status}\t{detail}\n", at.format("%Y-%m-%d %H:%M"))
}
