//! Bibliographic sources.
//!
//! Every source answers with the same three-way [`SourceOutcome`], so callers
//! can always tell "this source has no record" apart from "this source could
//! not be asked right now".

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use shelfscan_core::{BookRecordPartial, SourcesConfig};

use crate::error::{LookupError, Result};
use crate::http::TransportConfig;

pub mod ehon;
pub mod honto;
mod html;
pub mod ndl;
pub mod openbd;

pub use ehon::EhonSource;
pub use honto::{HontoSource, HontoStore};
pub use ndl::NdlSource;
pub use openbd::OpenBdSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome<T> {
    Found(T),
    NotFound,
    /// The source could not be consulted (network, server or parse failure).
    Transient(String),
}

impl<T> SourceOutcome<T> {
    /// Collapse an adapter's internal result: `Ok(None)` is a genuine miss,
    /// any error is transient.
    pub fn from_result(result: Result<Option<T>>) -> Self {
        match result {
            Ok(Some(value)) => SourceOutcome::Found(value),
            Ok(None) => SourceOutcome::NotFound,
            Err(err) => SourceOutcome::Transient(err.to_string()),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SourceOutcome::Found(_))
    }
}

#[async_trait]
pub trait BookSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, isbn: &str) -> SourceOutcome<BookRecordPartial>;
}

#[async_trait]
pub trait SeriesSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_series(&self, isbn: &str) -> SourceOutcome<String>;
}

/// Sources that can be named in the `sources.order` config list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Honto,
    HontoEbook,
    OpenBd,
    Ndl,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Honto => "honto",
            SourceKind::HontoEbook => "honto-ebook",
            SourceKind::OpenBd => "openbd",
            SourceKind::Ndl => "ndl",
        }
    }

    pub fn build(self, config: &SourcesConfig) -> Result<Arc<dyn BookSource>> {
        let transport = TransportConfig::for_source(config, self.as_str());
        let source: Arc<dyn BookSource> = match self {
            SourceKind::Honto => Arc::new(HontoSource::new(HontoStore::PaperAndEbook, &transport)?),
            SourceKind::HontoEbook => Arc::new(HontoSource::new(HontoStore::Ebook, &transport)?),
            SourceKind::OpenBd => Arc::new(OpenBdSource::new(&transport)?),
            SourceKind::Ndl => Arc::new(NdlSource::new(&transport)?),
        };
        Ok(source)
    }
}

impl FromStr for SourceKind {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "honto" => Ok(SourceKind::Honto),
            "honto-ebook" | "honto_ebook" => Ok(SourceKind::HontoEbook),
            "openbd" => Ok(SourceKind::OpenBd),
            "ndl" | "jpndl" => Ok(SourceKind::Ndl),
            other => Err(LookupError::UnknownSource(other.to_string())),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the configured sources in fallback order.
pub fn build_sources(config: &SourcesConfig) -> Result<Vec<Arc<dyn BookSource>>> {
    config
        .order
        .iter()
        .map(|name| name.parse::<SourceKind>()?.build(config))
        .collect()
}

pub fn build_series_source(config: &SourcesConfig) -> Result<Option<Arc<dyn SeriesSource>>> {
    if !config.series_lookup {
        return Ok(None);
    }
    let transport = TransportConfig::for_source(config, "ehon");
    Ok(Some(Arc::new(EhonSource::new(&transport)?)))
}
