use std::fmt;
use std::sync::Arc;

use shelfscan_core::normalize::{format_title, normalize_record};
use shelfscan_core::{BookRecord, SourcesConfig};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::identifiers::Isbn;
use crate::sources::{
    BookSource, SeriesSource, SourceOutcome, build_series_source, build_sources,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(BookRecord),
    /// Every source answered that it has no record.
    NoData,
    /// Nothing was found and at least one source could not be consulted.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: String,
    pub message: String,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolveReport {
    pub isbn: String,
    pub resolution: Resolution,
    /// Sources that failed transiently, in the order they were tried. Kept
    /// even when a later source resolved the ISBN.
    pub transient_failures: Vec<SourceFailure>,
}

impl ResolveReport {
    pub fn record(&self) -> Option<&BookRecord> {
        match &self.resolution {
            Resolution::Resolved(record) => Some(record),
            _ => None,
        }
    }

    pub fn failure_summary(&self) -> String {
        self.transient_failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Asks each source in turn until one returns a titled record, then
/// decorates the winner with a series name.
pub struct MetadataResolver {
    sources: Vec<Arc<dyn BookSource>>,
    series: Option<Arc<dyn SeriesSource>>,
}

impl MetadataResolver {
    pub fn new(sources: Vec<Arc<dyn BookSource>>, series: Option<Arc<dyn SeriesSource>>) -> Self {
        Self { sources, series }
    }

    pub fn from_config(config: &SourcesConfig) -> Result<Self> {
        Ok(Self::new(build_sources(config)?, build_series_source(config)?))
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub async fn resolve(&self, isbn: &str) -> ResolveReport {
        if let Err(err) = Isbn::parse(isbn) {
            warn!(isbn, error = %err, "ISBN fails checksum validation, resolving anyway");
        }

        let mut transient_failures = Vec::new();
        for source in &self.sources {
            let name = source.name();
            match source.fetch(isbn).await {
                SourceOutcome::Found(partial) if partial.has_title() => {
                    let Some(mut record) = normalize_record(partial, isbn, name) else {
                        debug!(source = name, isbn, "title empty after normalization");
                        continue;
                    };
                    if let Some(series) = self.lookup_series(isbn).await {
                        record.series = Some(series);
                    }
                    info!(source = name, isbn, title = %record.title, "resolved");
                    return ResolveReport {
                        isbn: isbn.to_string(),
                        resolution: Resolution::Resolved(record),
                        transient_failures,
                    };
                }
                SourceOutcome::Found(_) => {
                    debug!(source = name, isbn, "record without title, treated as not found");
                }
                SourceOutcome::NotFound => {
                    debug!(source = name, isbn, "not found");
                }
                SourceOutcome::Transient(message) => {
                    warn!(source = name, isbn, error = %message, "source unavailable");
                    transient_failures.push(SourceFailure {
                        source: name.to_string(),
                        message,
                    });
                }
            }
        }

        let resolution = if transient_failures.is_empty() {
            Resolution::NoData
        } else {
            Resolution::Unavailable
        };
        ResolveReport {
            isbn: isbn.to_string(),
            resolution,
            transient_failures,
        }
    }

    async fn lookup_series(&self, isbn: &str) -> Option<String> {
        let series_source = self.series.as_ref()?;
        match series_source.fetch_series(isbn).await {
            SourceOutcome::Found(series) => {
                Some(format_title(&series)).filter(|s| !s.is_empty())
            }
            SourceOutcome::NotFound => None,
            SourceOutcome::Transient(message) => {
                debug!(source = series_source.name(), isbn, error = %message, "series lookup failed");
                None
            }
        }
    }
}
