//! Metadata provider plugins with a trait-based architecture.
//!
//! This module defines the [`Source`] trait that all metadata providers
//! implement. Providers are queried in a fixed priority order by the
//! enrichment engine; the order lives in [`SourceRegistry`], so a new
//! provider plugs in by implementing the trait and taking a slot in the
//! relevant chain without the engine changing.

mod crossref;
mod datacite;
mod europe_pmc;
mod openalex;
mod registry;
mod semantic;
mod unpaywall;

pub mod mock;

pub use crossref::CrossrefSource;
pub use datacite::DataCiteSource;
pub use europe_pmc::EuropePmcSource;
pub use mock::MockSource;
pub use openalex::OpenAlexSource;
pub use registry::{SourceCapabilities, SourceRegistry, StepGate, TitleStep};
pub use semantic::SemanticScholarSource;
pub use unpaywall::UnpaywallSource;

use crate::models::MetadataRecord;
use async_trait::async_trait;

/// A metadata provider queried for bibliographic fields.
///
/// # Implementing a New Source
///
/// 1. Create a struct holding an `HttpClient`
/// 2. Implement `id`, `name`, `capabilities`, and whichever of `lookup_doi`
///    / `search_title` the provider supports
/// 3. Add it to the chains in [`SourceRegistry`]
///
/// Implementations map the provider's response into [`MetadataRecord`],
/// leaving any field the source does not carry unset — never a placeholder.
/// A DOI surfaced by a title search must come back normalized (bare, no
/// resolver prefix).
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g. "openalex", "crossref")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Describe the capabilities of this source
    fn capabilities(&self) -> SourceCapabilities;

    /// Whether this source supports lookup by DOI
    fn supports_doi_lookup(&self) -> bool {
        self.capabilities().contains(SourceCapabilities::DOI_LOOKUP)
    }

    /// Whether this source supports free-text title search
    fn supports_title_search(&self) -> bool {
        self.capabilities()
            .contains(SourceCapabilities::TITLE_SEARCH)
    }

    /// Fetch metadata for a bare DOI
    async fn lookup_doi(&self, _doi: &str) -> Result<MetadataRecord, SourceError> {
        Err(SourceError::NotImplemented)
    }

    /// Find the best-matching work for a free-text title
    async fn search_title(&self, _title: &str) -> Result<MetadataRecord, SourceError> {
        Err(SourceError::NotImplemented)
    }
}

/// Errors that can occur when interacting with a source.
///
/// The enrichment engine absorbs all of these as "no data from this
/// provider" — they exist so the failure can be logged with its cause, not
/// so it can propagate.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The requested operation is not implemented for this source
    #[error("Operation not implemented for this source")]
    NotImplemented,

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (JSON, HTML)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Work not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// API error from the source
    #[error("API error: {0}")]
    Api(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_capabilities() {
        let caps = SourceCapabilities::DOI_LOOKUP | SourceCapabilities::TITLE_SEARCH;

        assert!(caps.contains(SourceCapabilities::DOI_LOOKUP));
        assert!(caps.contains(SourceCapabilities::TITLE_SEARCH));

        let doi_only = SourceCapabilities::DOI_LOOKUP;
        assert!(!doi_only.contains(SourceCapabilities::TITLE_SEARCH));
    }
}
