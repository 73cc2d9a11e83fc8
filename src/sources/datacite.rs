//! DataCite metadata source implementation.
//!
//! DataCite registers DOIs for datasets, preprints, and OSF-hosted material
//! that the journal-centric indexes miss. DOI lookup only; the REST API has
//! no title search worth trusting for a single best match.

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{clean, MetadataRecord};
use crate::sources::{Source, SourceCapabilities, SourceError};
use crate::utils::doi::fallback_url;
use crate::utils::HttpClient;

const DATACITE_API_BASE: &str = "https://api.datacite.org";

/// DataCite metadata source
#[derive(Debug, Clone)]
pub struct DataCiteSource {
    client: HttpClient,
    base_url: String,
}

impl DataCiteSource {
    pub fn new() -> Self {
        Self::with_base_url(DATACITE_API_BASE)
    }

    /// Create with a custom API base URL (for tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: HttpClient::new(),
            base_url: base_url.into(),
        }
    }

    fn record_from_attributes(attrs: &Attributes, doi: &str) -> MetadataRecord {
        let authors = attrs
            .creators
            .iter()
            .filter_map(Creator::display_name)
            .collect::<Vec<_>>()
            .join("; ");

        let title = attrs.titles.first().and_then(|t| t.title.clone());

        MetadataRecord {
            doi: Some(doi.to_string()),
            authors: clean(Some(authors)),
            title: clean(title),
            // DataCite has no container title; the registering publisher is
            // the closest thing to a venue it offers
            journal: clean(attrs.publisher.clone()),
            volume: None,
            issue: None,
            pages: None,
            year: attrs.publication_year.map(|y| y.to_string()),
            url: clean(attrs.url.clone()).or_else(|| Some(fallback_url(doi))),
        }
    }
}

impl Default for DataCiteSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for DataCiteSource {
    fn id(&self) -> &str {
        "datacite"
    }

    fn name(&self) -> &str {
        "DataCite"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::DOI_LOOKUP
    }

    async fn lookup_doi(&self, doi: &str) -> Result<MetadataRecord, SourceError> {
        // DataCite stores DOIs lowercased
        let url = format!("{}/dois/{}", self.base_url, doi.to_lowercase());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("DataCite lookup failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(format!("DOI not in DataCite: {}", doi)));
        }

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "DataCite returned status: {}",
                response.status()
            )));
        }

        let body: DataCiteResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("DataCite JSON: {}", e)))?;

        Ok(Self::record_from_attributes(&body.data.attributes, doi))
    }
}

// ===== DataCite API Types =====

#[derive(Debug, Deserialize)]
struct DataCiteResponse {
    data: Data,
}

#[derive(Debug, Deserialize)]
struct Data {
    attributes: Attributes,
}

#[derive(Debug, Deserialize)]
struct Attributes {
    #[serde(default)]
    creators: Vec<Creator>,
    #[serde(default)]
    titles: Vec<Title>,
    #[serde(default)]
    publisher: Option<String>,
    #[serde(rename = "publicationYear", default)]
    publication_year: Option<i64>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Creator {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "givenName", default)]
    given_name: Option<String>,
    #[serde(rename = "familyName", default)]
    family_name: Option<String>,
}

impl Creator {
    /// Prefer the preformatted name, else "Given Family".
    fn display_name(&self) -> Option<String> {
        if let Some(name) = self.name.as_ref().filter(|n| !n.trim().is_empty()) {
            return Some(name.clone());
        }
        let combined = format!(
            "{} {}",
            self.given_name.as_deref().unwrap_or(""),
            self.family_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string();
        if combined.is_empty() {
            None
        } else {
            Some(combined)
        }
    }
}

#[derive(Debug, Deserialize)]
struct Title {
    #[serde(default)]
    title: Option<String>,
}
