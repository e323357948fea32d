//! shelfscan lookup: ISBN scanning, bibliographic sources, resolution and
//! the per-file pipeline.

pub mod error;
pub mod http;
pub mod identifiers;
pub mod scan;
pub mod sources;
pub mod resolve;
pub mod pipeline;

pub use error::{LookupError, Result};
pub use identifiers::{Isbn, extract_isbn_from_ocr_text, repair_check_digit};
pub use pipeline::{FileOutcome, Orchestrator, RunSummary, Stage};
pub use resolve::{MetadataResolver, Resolution, ResolveReport, SourceFailure};
pub use scan::IsbnScanner;
pub use sources::{BookSource, SeriesSource, SourceOutcome};
