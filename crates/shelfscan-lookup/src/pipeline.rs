//! Per-file processing: scan, resolve, classify, move, persist.
//!
//! Files are handled strictly one at a time. A file ends in exactly one of
//! three places: shelved under the output root, quarantined, or left where it
//! was because every failing source failed transiently.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use shelfscan_core::{
    AppConfig, AuditLog, BookRecord, Classifier, LibraryStore, ShelfError, file_ops,
};
use tracing::{debug, info, warn};

use crate::error::{LookupError, Result};
use crate::identifiers::normalize_isbn_input;
use crate::resolve::{MetadataResolver, Resolution};
use crate::scan::IsbnScanner;

const PDF_EXTENSION: &str = "pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scanning,
    Resolving,
    Classifying,
    Moving,
    Persisting,
    Done,
    Errored,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Scanning => "scanning",
            Stage::Resolving => "resolving",
            Stage::Classifying => "classifying",
            Stage::Moving => "moving",
            Stage::Persisting => "persisting",
            Stage::Done => "done",
            Stage::Errored => "errored",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Shelved {
        destination: PathBuf,
        record: BookRecord,
    },
    /// Moved into the quarantine directory for manual follow-up.
    Quarantined { destination: PathBuf, cause: String },
    /// Left in place; a later run may succeed.
    Deferred { cause: String },
    /// Moved by hand-written instruction (CSV completion), no lookup done.
    Relocated { destination: PathBuf },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub shelved: usize,
    pub quarantined: usize,
    pub deferred: usize,
    pub relocated: usize,
    pub failed: usize,
}

impl RunSummary {
    fn add(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Shelved { .. } => self.shelved += 1,
            FileOutcome::Quarantined { .. } => self.quarantined += 1,
            FileOutcome::Deferred { .. } => self.deferred += 1,
            FileOutcome::Relocated { .. } => self.relocated += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.shelved + self.quarantined + self.deferred + self.relocated + self.failed
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} shelved, {} quarantined, {} deferred, {} relocated, {} failed",
            self.shelved, self.quarantined, self.deferred, self.relocated, self.failed
        )
    }
}

pub struct Orchestrator {
    scanner: IsbnScanner,
    resolver: MetadataResolver,
    classifier: Classifier,
    store: LibraryStore,
    audit: AuditLog,
    output_dir: PathBuf,
    quarantine_dir: PathBuf,
}

impl Orchestrator {
    pub fn new(
        scanner: IsbnScanner,
        resolver: MetadataResolver,
        classifier: Classifier,
        store: LibraryStore,
        audit: AuditLog,
        output_dir: PathBuf,
        quarantine_dir: PathBuf,
    ) -> Self {
        Self {
            scanner,
            resolver,
            classifier,
            store,
            audit,
            output_dir,
            quarantine_dir,
        }
    }

    /// Open the store and audit log named in `config` and build the
    /// production scanner and sources.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let schema_path = config.schema_path();
        let store = LibraryStore::open_with_schema(&config.database_path(), schema_path.as_deref())?;
        let audit = AuditLog::open(&config.log_path())?;

        Ok(Self::new(
            IsbnScanner::from_config(&config.scan),
            MetadataResolver::from_config(&config.sources)?,
            Classifier::from_config(&config.shelving),
            store,
            audit,
            config.output_dir(),
            config.quarantine_dir(),
        ))
    }

    pub fn store(&self) -> &LibraryStore {
        &self.store
    }

    pub fn audit_log_path(&self) -> &Path {
        self.audit.path()
    }

    /// Scan `path` for an ISBN and shelve it.
    ///
    /// `Err` is reserved for defects of the file itself (unreadable PDF,
    /// render failure) and for store or log failures.
    pub async fn process_file(&mut self, path: &Path) -> Result<FileOutcome> {
        enter(Stage::Scanning, path);
        match self.scanner.scan(path)? {
            Some(isbn) => self.process_with_isbn(path, &isbn).await,
            None => self.quarantine(path, format!("ISBN not found: {}", path.display())),
        }
    }

    /// Shelve `path` under a known ISBN, skipping the scan.
    pub async fn process_with_isbn(&mut self, path: &Path, isbn: &str) -> Result<FileOutcome> {
        enter(Stage::Resolving, path);
        let report = self.resolver.resolve(isbn).await;
        let record = match &report.resolution {
            Resolution::Resolved(record) => record.clone(),
            Resolution::NoData => {
                return self.quarantine(
                    path,
                    format!("no bibliographic data for ISBN {isbn}: {}", path.display()),
                );
            }
            Resolution::Unavailable => {
                let cause = format!(
                    "sources unavailable for ISBN {isbn} ({}): {}",
                    report.failure_summary(),
                    path.display()
                );
                return self.defer(path, cause);
            }
        };

        enter(Stage::Classifying, path);
        let destination =
            file_ops::vacant_path(&self.output_dir.join(self.classifier.classify(&record)));

        enter(Stage::Moving, path);
        file_ops::move_file(path, &destination)?;
        self.audit.success(&destination)?;

        // The file has already moved; a store failure here is not rolled back.
        enter(Stage::Persisting, path);
        let id = self.store.store(&record, &destination)?;

        enter(Stage::Done, path);
        info!(id, isbn, destination = %destination.display(), "shelved");
        Ok(FileOutcome::Shelved { destination, record })
    }

    /// Process every PDF under `input_dir` in path order.
    ///
    /// A defect in one file is logged and the run moves on. Store failures
    /// stop the run.
    pub async fn run(&mut self, input_dir: &Path) -> Result<RunSummary> {
        let files = file_ops::collect_files(input_dir, PDF_EXTENSION, true)?;
        info!(count = files.len(), input = %input_dir.display(), "starting run");

        let mut summary = RunSummary::default();
        for file in files {
            let outcome = self.process_file(&file).await;
            self.tally(&mut summary, &file, outcome)?;
        }

        info!(%summary, "run finished");
        Ok(summary)
    }

    /// Apply hand-written rows of `path,isbn-or-directory`.
    ///
    /// An ISBN (digits and hyphens) re-runs resolution for the file. Anything
    /// else is a directory the file is moved into as-is.
    pub async fn complete_from_csv(&mut self, csv_path: &Path) -> Result<RunSummary> {
        let content = fs::read_to_string(csv_path)?;
        let mut summary = RunSummary::default();

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((path, target)) = parse_csv_row(line) else {
                warn!(line = index + 1, "malformed completion row");
                self.audit
                    .error(&format!("malformed row {} in {}: {line}", index + 1, csv_path.display()))?;
                summary.failed += 1;
                continue;
            };

            let outcome = if is_isbn_like(target) {
                match normalize_isbn_input(target) {
                    Some(isbn) => self.process_with_isbn(&path, &isbn).await,
                    None => Err(LookupError::InvalidIsbn(target.to_string())),
                }
            } else {
                self.relocate(&path, Path::new(target))
            };
            self.tally(&mut summary, &path, outcome)?;
        }

        Ok(summary)
    }

    fn relocate(&mut self, path: &Path, dir: &Path) -> Result<FileOutcome> {
        enter(Stage::Moving, path);
        let destination = file_ops::move_into_dir(path, dir)?;
        self.audit.success(&destination)?;
        Ok(FileOutcome::Relocated { destination })
    }

    fn quarantine(&mut self, path: &Path, cause: String) -> Result<FileOutcome> {
        enter(Stage::Errored, path);
        warn!(path = %path.display(), %cause, "quarantining");
        let destination = file_ops::move_into_dir(path, &self.quarantine_dir)?;
        self.audit.error(&cause)?;
        Ok(FileOutcome::Quarantined { destination, cause })
    }

    fn defer(&mut self, path: &Path, cause: String) -> Result<FileOutcome> {
        warn!(path = %path.display(), %cause, "leaving file for a later run");
        self.audit.error(&cause)?;
        Ok(FileOutcome::Deferred { cause })
    }

    fn tally(
        &mut self,
        summary: &mut RunSummary,
        path: &Path,
        outcome: Result<FileOutcome>,
    ) -> Result<()> {
        match outcome {
            Ok(outcome) => summary.add(&outcome),
            Err(err) if stops_run(&err) => return Err(err),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "file failed");
                self.audit.error(&format!("{}: {err}", path.display()))?;
                summary.failed += 1;
            }
        }
        Ok(())
    }
}

fn enter(stage: Stage, path: &Path) {
    debug!(%stage, path = %path.display());
}

fn stops_run(err: &LookupError) -> bool {
    matches!(
        err,
        LookupError::Core(ShelfError::Database(_) | ShelfError::SchemaScriptMissing(_))
    )
}

fn parse_csv_row(line: &str) -> Option<(PathBuf, &str)> {
    let (path, target) = line.split_once(',')?;
    let path = path.trim().trim_matches('"');
    let target = target.trim().trim_matches('"');
    if path.is_empty() || target.is_empty() {
        return None;
    }
    Some((PathBuf::from(path), target))
}

/// Digits and hyphens, optionally ending in an ISBN-10 `X` check character.
fn is_isbn_like(value: &str) -> bool {
    let body = value.strip_suffix(['X', 'x']).unwrap_or(value);
    body.chars().any(|c| c.is_ascii_digit())
        && body.chars().all(|c| c.is_ascii_digit() || c == '-')
}
