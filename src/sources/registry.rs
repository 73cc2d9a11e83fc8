//! Priority-ordered registry of metadata providers.

use std::sync::Arc;

use super::{
    crossref::CrossrefSource, datacite::DataCiteSource, europe_pmc::EuropePmcSource,
    openalex::OpenAlexSource, semantic::SemanticScholarSource, unpaywall::UnpaywallSource, Source,
};

bitflags::bitflags! {
    /// Capabilities that a source can support
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SourceCapabilities: u32 {
        const DOI_LOOKUP = 1 << 0;
        const TITLE_SEARCH = 1 << 1;
    }
}

/// When a title-chain step may run, relative to whether a DOI has already
/// been discovered by an earlier step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepGate {
    /// Title search, skipped once a DOI is known
    TitleOnly,
    /// DOI lookup, skipped until a DOI is known
    RequiresDoi,
    /// DOI lookup when a DOI is known, title search otherwise
    DoiOrTitle,
}

/// One step of the title-driven chain.
#[derive(Debug, Clone)]
pub struct TitleStep {
    pub source: Arc<dyn Source>,
    pub gate: StepGate,
}

impl TitleStep {
    pub fn new(source: Arc<dyn Source>, gate: StepGate) -> Self {
        Self { source, gate }
    }
}

/// The two provider chains the enrichment engine walks.
///
/// Priority is positional: earlier sources win every field they fill. The
/// DOI chain leans on the richest bibliographic indexes first; the title
/// chain leads with the search APIs most likely to surface a DOI, then
/// switches to DOI lookups once one is known.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    doi_chain: Vec<Arc<dyn Source>>,
    title_chain: Vec<TitleStep>,
}

impl SourceRegistry {
    /// Build the production chains.
    ///
    /// `email` is the contact address Unpaywall requires.
    pub fn new(email: &str) -> Self {
        let openalex: Arc<dyn Source> = Arc::new(OpenAlexSource::new());
        let datacite: Arc<dyn Source> = Arc::new(DataCiteSource::new());
        let crossref: Arc<dyn Source> = Arc::new(CrossrefSource::new());
        let unpaywall: Arc<dyn Source> = Arc::new(UnpaywallSource::new(email));
        let europe_pmc: Arc<dyn Source> = Arc::new(EuropePmcSource::new());
        let semantic: Arc<dyn Source> = Arc::new(SemanticScholarSource::new());

        let doi_chain = vec![
            Arc::clone(&openalex),
            Arc::clone(&datacite),
            Arc::clone(&crossref),
            Arc::clone(&unpaywall),
            Arc::clone(&europe_pmc),
            Arc::clone(&semantic),
        ];

        let title_chain = vec![
            TitleStep::new(Arc::clone(&openalex), StepGate::TitleOnly),
            TitleStep::new(Arc::clone(&crossref), StepGate::TitleOnly),
            TitleStep::new(Arc::clone(&europe_pmc), StepGate::TitleOnly),
            TitleStep::new(Arc::clone(&datacite), StepGate::RequiresDoi),
            TitleStep::new(Arc::clone(&semantic), StepGate::DoiOrTitle),
        ];

        Self {
            doi_chain,
            title_chain,
        }
    }

    /// Build a registry with explicit chains (tests, alternate stacks).
    pub fn with_chains(doi_chain: Vec<Arc<dyn Source>>, title_chain: Vec<TitleStep>) -> Self {
        Self {
            doi_chain,
            title_chain,
        }
    }

    /// Sources queried, in order, for a DOI-driven enrichment.
    pub fn doi_chain(&self) -> &[Arc<dyn Source>] {
        &self.doi_chain
    }

    /// Gated steps walked, in order, for a title-driven enrichment.
    pub fn title_chain(&self) -> &[TitleStep] {
        &self.title_chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_chain_order() {
        let registry = SourceRegistry::new("tests@example.org");

        let doi_ids: Vec<&str> = registry.doi_chain().iter().map(|s| s.id()).collect();
        assert_eq!(
            doi_ids,
            ["openalex", "datacite", "crossref", "unpaywall", "europe_pmc", "semantic"]
        );

        let title_ids: Vec<&str> = registry
            .title_chain()
            .iter()
            .map(|s| s.source.id())
            .collect();
        assert_eq!(
            title_ids,
            ["openalex", "crossref", "europe_pmc", "datacite", "semantic"]
        );
    }

    #[test]
    fn title_chain_gates() {
        let registry = SourceRegistry::new("tests@example.org");
        let gates: Vec<StepGate> = registry.title_chain().iter().map(|s| s.gate).collect();
        assert_eq!(
            gates,
            [
                StepGate::TitleOnly,
                StepGate::TitleOnly,
                StepGate::TitleOnly,
                StepGate::RequiresDoi,
                StepGate::DoiOrTitle,
            ]
        );
    }

    #[test]
    fn chain_sources_declare_needed_capabilities() {
        let registry = SourceRegistry::new("tests@example.org");
        for source in registry.doi_chain() {
            assert!(
                source.supports_doi_lookup(),
                "{} sits in the DOI chain without DOI_LOOKUP",
                source.id()
            );
        }
        for step in registry.title_chain() {
            match step.gate {
                StepGate::TitleOnly => assert!(step.source.supports_title_search()),
                StepGate::RequiresDoi => assert!(step.source.supports_doi_lookup()),
                StepGate::DoiOrTitle => {
                    assert!(step.source.supports_doi_lookup());
                    assert!(step.source.supports_title_search());
                }
            }
        }
    }
}
