//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::models::MetadataRecord;
use crate::sources::{Source, SourceCapabilities, SourceError};

/// A mock source returning predefined records and counting calls.
///
/// Call counters back the early-exit assertions: a chain that completes at
/// provider N must leave every later mock at zero calls.
#[derive(Debug)]
pub struct MockSource {
    id: String,
    capabilities: SourceCapabilities,
    doi_record: Mutex<Option<MetadataRecord>>,
    title_record: Mutex<Option<MetadataRecord>>,
    fail: bool,
    doi_calls: Arc<AtomicUsize>,
    title_calls: Arc<AtomicUsize>,
}

impl MockSource {
    /// Create a mock supporting both lookup modes.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            capabilities: SourceCapabilities::DOI_LOOKUP | SourceCapabilities::TITLE_SEARCH,
            doi_record: Mutex::new(None),
            title_record: Mutex::new(None),
            fail: false,
            doi_calls: Arc::new(AtomicUsize::new(0)),
            title_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Restrict the advertised capabilities.
    pub fn with_capabilities(mut self, capabilities: SourceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Record returned by `lookup_doi`.
    pub fn with_doi_record(self, record: MetadataRecord) -> Self {
        *self.doi_record.lock().unwrap() = Some(record);
        self
    }

    /// Record returned by `search_title`.
    pub fn with_title_record(self, record: MetadataRecord) -> Self {
        *self.title_record.lock().unwrap() = Some(record);
        self
    }

    /// Make every call fail with a network error.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Handle to the `lookup_doi` call counter.
    pub fn doi_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.doi_calls)
    }

    /// Handle to the `search_title` call counter.
    pub fn title_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.title_calls)
    }

    fn respond(&self, slot: &Mutex<Option<MetadataRecord>>) -> Result<MetadataRecord, SourceError> {
        if self.fail {
            return Err(SourceError::Network("mock failure".to_string()));
        }
        slot.lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SourceError::NotFound("mock has no record".to_string()))
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    fn capabilities(&self) -> SourceCapabilities {
        self.capabilities
    }

    async fn lookup_doi(&self, _doi: &str) -> Result<MetadataRecord, SourceError> {
        self.doi_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(&self.doi_record)
    }

    async fn search_title(&self, _title: &str) -> Result<MetadataRecord, SourceError> {
        self.title_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(&self.title_record)
    }
}

/// A fully-populated record for completeness-sensitive tests.
pub fn complete_record(doi: &str) -> MetadataRecord {
    MetadataRecord {
        doi: Some(doi.to_string()),
        authors: Some("Jane Doe; John Smith".to_string()),
        title: Some("A Large-Scale Test".to_string()),
        journal: Some("Journal of Tests".to_string()),
        volume: Some("12".to_string()),
        issue: Some("3".to_string()),
        pages: Some("45-67".to_string()),
        year: Some("2020".to_string()),
        url: Some(format!("https://doi.org/{}", doi)),
    }
}
