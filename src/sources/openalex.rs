//! OpenAlex metadata source implementation.
//!
//! Uses the OpenAlex works API for DOI lookup and title search.
//! API documentation: <https://docs.openalex.org>

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{clean, MetadataRecord};
use crate::sources::{Source, SourceCapabilities, SourceError};
use crate::utils::doi::{fallback_url, normalize_doi};
use crate::utils::HttpClient;

const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// OpenAlex metadata source
///
/// Highest-priority provider in both chains: broad coverage and the most
/// complete biblio block (volume/issue/pages) of the open indexes.
#[derive(Debug, Clone)]
pub struct OpenAlexSource {
    client: HttpClient,
    base_url: String,
}

impl OpenAlexSource {
    pub fn new() -> Self {
        Self::with_base_url(OPENALEX_API_BASE)
    }

    /// Create with a custom API base URL (for tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: HttpClient::new(),
            base_url: base_url.into(),
        }
    }

    fn record_from_work(work: &Work, known_doi: Option<&str>) -> MetadataRecord {
        let doi = match known_doi {
            Some(d) => Some(d.to_string()),
            // Search results carry the DOI as a full resolver URL
            None => work.doi.as_deref().and_then(normalize_doi),
        };

        let authors = work
            .authorships
            .iter()
            .filter_map(|a| a.author.as_ref())
            .filter_map(|a| a.display_name.clone())
            .collect::<Vec<_>>()
            .join("; ");

        let venue = work.host_venue.clone().unwrap_or_default();
        let biblio = work.biblio.clone().unwrap_or_default();

        let url = doi
            .as_deref()
            .map(fallback_url)
            .or_else(|| venue.url.clone());

        MetadataRecord {
            doi,
            authors: clean(Some(authors)),
            title: clean(work.title.clone()),
            journal: clean(venue.display_name.clone()),
            volume: clean(biblio.volume.clone()),
            issue: clean(biblio.issue.clone()),
            pages: clean(biblio.first_page.clone()),
            year: work.publication_year.map(|y| y.to_string()),
            url: clean(url),
        }
    }
}

impl Default for OpenAlexSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for OpenAlexSource {
    fn id(&self) -> &str {
        "openalex"
    }

    fn name(&self) -> &str {
        "OpenAlex"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::DOI_LOOKUP | SourceCapabilities::TITLE_SEARCH
    }

    async fn lookup_doi(&self, doi: &str) -> Result<MetadataRecord, SourceError> {
        // OpenAlex accepts the full resolver URL as a work identifier
        let url = format!("{}/works/https://doi.org/{}", self.base_url, doi);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("OpenAlex lookup failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "OpenAlex returned status: {}",
                response.status()
            )));
        }

        let work: Work = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("OpenAlex JSON: {}", e)))?;

        let mut record = Self::record_from_work(&work, Some(doi));
        if record.url.is_none() {
            record.url = Some(fallback_url(doi));
        }
        Ok(record)
    }

    async fn search_title(&self, title: &str) -> Result<MetadataRecord, SourceError> {
        let url = format!(
            "{}/works?filter=title.search:{}",
            self.base_url,
            urlencoding::encode(title)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("OpenAlex search failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "OpenAlex returned status: {}",
                response.status()
            )));
        }

        let results: SearchResults = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("OpenAlex JSON: {}", e)))?;

        let work = results
            .results
            .first()
            .ok_or_else(|| SourceError::NotFound(format!("no OpenAlex match for '{}'", title)))?;

        Ok(Self::record_from_work(work, None))
    }
}

// ===== OpenAlex API Types =====

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    results: Vec<Work>,
}

#[derive(Debug, Deserialize)]
struct Work {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    doi: Option<String>,
    #[serde(default)]
    authorships: Vec<Authorship>,
    #[serde(default)]
    host_venue: Option<HostVenue>,
    #[serde(default)]
    biblio: Option<Biblio>,
    #[serde(default)]
    publication_year: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Authorship {
    #[serde(default)]
    author: Option<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct HostVenue {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Biblio {
    #[serde(default)]
    volume: Option<String>,
    #[serde(default)]
    issue: Option<String>,
    #[serde(default)]
    first_page: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORK_JSON: &str = r#"{
        "title": "A Large-Scale Test",
        "doi": "https://doi.org/10.1/abc",
        "authorships": [
            {"author": {"display_name": "Jane Doe"}},
            {"author": {"display_name": "John Smith"}}
        ],
        "host_venue": {"display_name": "Journal of Tests", "url": "https://example.org/jot"},
        "biblio": {"volume": "12", "issue": "3", "first_page": "45"},
        "publication_year": 2020
    }"#;

    #[test]
    fn maps_work_fields() {
        let work: Work = serde_json::from_str(WORK_JSON).unwrap();
        let record = OpenAlexSource::record_from_work(&work, None);

        assert_eq!(record.doi.as_deref(), Some("10.1/abc"));
        assert_eq!(record.authors.as_deref(), Some("Jane Doe; John Smith"));
        assert_eq!(record.title.as_deref(), Some("A Large-Scale Test"));
        assert_eq!(record.journal.as_deref(), Some("Journal of Tests"));
        assert_eq!(record.volume.as_deref(), Some("12"));
        assert_eq!(record.issue.as_deref(), Some("3"));
        assert_eq!(record.pages.as_deref(), Some("45"));
        assert_eq!(record.year.as_deref(), Some("2020"));
        // DOI present, so the resolver URL wins over the venue URL
        assert_eq!(record.url.as_deref(), Some("https://doi.org/10.1/abc"));
    }

    #[test]
    fn missing_fields_stay_unset() {
        let work: Work = serde_json::from_str(r#"{"title": "Bare"}"#).unwrap();
        let record = OpenAlexSource::record_from_work(&work, None);

        assert_eq!(record.title.as_deref(), Some("Bare"));
        assert!(record.doi.is_none());
        assert!(record.authors.is_none());
        assert!(record.journal.is_none());
        assert!(record.year.is_none());
        assert!(record.url.is_none());
    }

    #[tokio::test]
    async fn lookup_doi_hits_works_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/works/https://doi.org/10.1/abc")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(WORK_JSON)
            .create_async()
            .await;

        let source = OpenAlexSource::with_base_url(server.url());
        let record = source.lookup_doi("10.1/abc").await.unwrap();

        mock.assert_async().await;
        assert_eq!(record.journal.as_deref(), Some("Journal of Tests"));
        assert_eq!(record.year.as_deref(), Some("2020"));
    }

    #[tokio::test]
    async fn server_error_surfaces_as_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/works/https://doi.org/10.1/abc")
            .with_status(503)
            .create_async()
            .await;

        let source = OpenAlexSource::with_base_url(server.url());
        let err = source.lookup_doi("10.1/abc").await.unwrap_err();
        assert!(matches!(err, SourceError::Api(_)));
    }
}
