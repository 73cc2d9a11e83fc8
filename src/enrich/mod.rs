//! Progressive multi-source enrichment: the waterfall merge engine.
//!
//! Drives the provider chains from [`SourceRegistry`] strictly in priority
//! order, merging each partial result field-by-field with fill-only-if-empty
//! semantics and stopping as soon as the record is complete. A provider
//! fault is logged and treated as "no data"; it never aborts the chain.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::models::MetadataRecord;
use crate::sources::{SourceRegistry, StepGate};
use crate::utils::doi::{fallback_url, normalize_doi};

/// Default pause between consecutive provider calls.
pub const DEFAULT_CALL_DELAY: Duration = Duration::from_millis(200);

/// Waterfall enrichment engine over a fixed provider priority order.
#[derive(Debug, Clone)]
pub struct MergeEngine {
    registry: SourceRegistry,
    delay: Duration,
}

impl MergeEngine {
    pub fn new(registry: SourceRegistry) -> Self {
        Self {
            registry,
            delay: DEFAULT_CALL_DELAY,
        }
    }

    /// Override the inter-call delay (zero in tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Enrich starting from an identifier.
    ///
    /// Accepts a bare DOI or a resolver URL; returns `None` only for blank
    /// input. Exhausting the chain without completeness is not an error —
    /// whatever accumulated is returned, with the resolver URL filled in as
    /// a last resort.
    pub async fn enrich_doi(&self, doi: &str) -> Option<MetadataRecord> {
        let doi = normalize_doi(doi)?;
        let mut record = MetadataRecord {
            doi: Some(doi.clone()),
            ..Default::default()
        };

        let mut first = true;
        for source in self.registry.doi_chain() {
            if !std::mem::take(&mut first) {
                tokio::time::sleep(self.delay).await;
            }
            match source.lookup_doi(&doi).await {
                Ok(partial) => {
                    record = record.merged(&partial);
                    if record.is_complete() {
                        tracing::debug!(source = source.id(), doi = %doi, "record complete, stopping chain");
                        return Some(record);
                    }
                }
                Err(err) => {
                    tracing::debug!(source = source.id(), doi = %doi, error = %err, "provider yielded no data");
                }
            }
        }

        if record.url.is_none() {
            record.url = Some(fallback_url(&doi));
        }
        Some(record)
    }

    /// Enrich starting from a free-text title.
    ///
    /// Walks the gated title chain: title searches until a DOI surfaces,
    /// DOI lookups afterwards. Completeness here additionally requires the
    /// DOI itself, since discovering it is the point of this mode.
    pub async fn enrich_title(&self, title: &str) -> Option<MetadataRecord> {
        let title = clean_search_title(title)?;
        let mut record = MetadataRecord::default();

        enum Call {
            Doi(String),
            Title,
        }

        let mut first = true;
        for step in self.registry.title_chain() {
            let known_doi = record.doi.clone();
            let call = match (step.gate, known_doi) {
                (StepGate::TitleOnly, None) => Call::Title,
                (StepGate::RequiresDoi, Some(doi)) => Call::Doi(doi),
                (StepGate::DoiOrTitle, Some(doi)) => Call::Doi(doi),
                (StepGate::DoiOrTitle, None) => Call::Title,
                // Gated out at this point in the chain; no call, no delay
                (StepGate::TitleOnly, Some(_)) | (StepGate::RequiresDoi, None) => continue,
            };

            if !std::mem::take(&mut first) {
                tokio::time::sleep(self.delay).await;
            }

            let result = match call {
                Call::Doi(doi) => step.source.lookup_doi(&doi).await,
                Call::Title => step.source.search_title(&title).await,
            };

            match result {
                Ok(partial) => {
                    record = record.merged(&partial);
                    if record.doi.is_some() && record.is_complete() {
                        tracing::debug!(source = step.source.id(), "record complete, stopping chain");
                        return Some(record);
                    }
                }
                Err(err) => {
                    tracing::debug!(source = step.source.id(), error = %err, "provider yielded no data");
                }
            }
        }

        if record.url.is_none() {
            if let Some(doi) = record.doi.clone() {
                record.url = Some(fallback_url(&doi));
            }
        }
        Some(record)
    }
}

/// Prepare a title for provider search: drop a trailing "(YYYY)" year
/// marker and any trailing punctuation. Returns `None` for blank input.
pub fn clean_search_title(title: &str) -> Option<String> {
    static YEAR_MARKER: OnceLock<Regex> = OnceLock::new();
    static TRAILING_PUNCT: OnceLock<Regex> = OnceLock::new();

    let year_marker = YEAR_MARKER.get_or_init(|| Regex::new(r"\(\s*\d{4}\s*\)").unwrap());
    let trailing_punct = TRAILING_PUNCT.get_or_init(|| Regex::new(r"[\s\-\.,:;]+$").unwrap());

    if title.trim().is_empty() {
        return None;
    }
    let cleaned = year_marker.replace_all(title, "");
    let cleaned = trailing_punct.replace(&cleaned, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
