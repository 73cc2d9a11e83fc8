//! Semantic Scholar metadata source implementation.
//!
//! Uses the Semantic Scholar Graph API. Last in both chains: venue strings
//! are frequently abbreviated and the biblio block is thin, but it resolves
//! titles the bibliographic indexes miss.

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{clean, MetadataRecord};
use crate::sources::{Source, SourceCapabilities, SourceError};
use crate::utils::doi::{fallback_url, normalize_doi};
use crate::utils::HttpClient;

const SEMANTIC_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";

const PAPER_FIELDS: &str = "title,year,venue,url,authors";
const SEARCH_FIELDS: &str = "title,year,venue,url,authors,externalIds";

/// Semantic Scholar metadata source
#[derive(Debug, Clone)]
pub struct SemanticScholarSource {
    client: HttpClient,
    base_url: String,
}

impl SemanticScholarSource {
    pub fn new() -> Self {
        Self::with_base_url(SEMANTIC_API_BASE)
    }

    /// Create with a custom API base URL (for tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: HttpClient::new(),
            base_url: base_url.into(),
        }
    }

    async fn fetch_paper(&self, url: &str) -> Result<SsPaper, SourceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Semantic Scholar request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound("paper not in Semantic Scholar".to_string()));
        }

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "Semantic Scholar returned status: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Semantic Scholar JSON: {}", e)))
    }

    fn record_from_paper(paper: &SsPaper, known_doi: Option<&str>) -> MetadataRecord {
        let doi = match known_doi {
            Some(d) => Some(d.to_string()),
            None => paper
                .external_ids
                .as_ref()
                .and_then(|ids| ids.doi.as_deref())
                .and_then(normalize_doi),
        };

        let authors = paper
            .authors
            .iter()
            .filter_map(|a| a.name.clone())
            .collect::<Vec<_>>()
            .join("; ");

        MetadataRecord {
            url: clean(paper.url.clone()).or_else(|| doi.as_deref().map(fallback_url)),
            doi,
            authors: clean(Some(authors)),
            title: clean(paper.title.clone()),
            journal: clean(paper.venue.clone()),
            volume: None,
            issue: None,
            pages: None,
            year: paper.year.map(|y| y.to_string()),
        }
    }
}

impl Default for SemanticScholarSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for SemanticScholarSource {
    fn id(&self) -> &str {
        "semantic"
    }

    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::DOI_LOOKUP | SourceCapabilities::TITLE_SEARCH
    }

    async fn lookup_doi(&self, doi: &str) -> Result<MetadataRecord, SourceError> {
        let url = format!(
            "{}/paper/DOI:{}?fields={}",
            self.base_url, doi, PAPER_FIELDS
        );
        let paper = self.fetch_paper(&url).await?;
        Ok(Self::record_from_paper(&paper, Some(doi)))
    }

    async fn search_title(&self, title: &str) -> Result<MetadataRecord, SourceError> {
        let url = format!(
            "{}/paper/search?query={}&limit=1&fields={}",
            self.base_url,
            urlencoding::encode(title),
            SEARCH_FIELDS
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Semantic Scholar search failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "Semantic Scholar returned status: {}",
                response.status()
            )));
        }

        let results: SsSearchResults = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Semantic Scholar JSON: {}", e)))?;

        let paper = results
            .data
            .first()
            .ok_or_else(|| SourceError::NotFound(format!("no Semantic Scholar match for '{}'", title)))?;

        Ok(Self::record_from_paper(paper, None))
    }
}

// ===== Semantic Scholar API Types =====

#[derive(Debug, Deserialize)]
struct SsSearchResults {
    #[serde(default)]
    data: Vec<SsPaper>,
}

#[derive(Debug, Deserialize)]
struct SsPaper {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(default)]
    year: Option<i64>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    authors: Vec<SsAuthor>,
    #[serde(rename = "externalIds", default)]
    external_ids: Option<SsExternalIds>,
}

#[derive(Debug, Deserialize)]
struct SsAuthor {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SsExternalIds {
    #[serde(rename = "DOI", default)]
    doi: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAPER_JSON: &str = r#"{
        "title": "A Large-Scale Test",
        "venue": "J. Tests",
        "year": 2020,
        "url": "https://www.semanticscholar.org/paper/xyz",
        "authors": [{"name": "Jane Doe"}, {"name": "John Smith"}],
        "externalIds": {"DOI": "https://doi.org/10.1/abc"}
    }"#;

    #[test]
    fn maps_paper_fields() {
        let paper: SsPaper = serde_json::from_str(PAPER_JSON).unwrap();
        let record = SemanticScholarSource::record_from_paper(&paper, None);

        // DOI from externalIds arrives as a resolver URL and is normalized
        assert_eq!(record.doi.as_deref(), Some("10.1/abc"));
        assert_eq!(record.authors.as_deref(), Some("Jane Doe; John Smith"));
        assert_eq!(record.journal.as_deref(), Some("J. Tests"));
        assert_eq!(record.year.as_deref(), Some("2020"));
        assert_eq!(
            record.url.as_deref(),
            Some("https://www.semanticscholar.org/paper/xyz")
        );
        assert!(record.volume.is_none());
    }

    #[test]
    fn resolver_url_fills_in_when_paper_url_missing() {
        let paper: SsPaper = serde_json::from_str(r#"{"title": "T", "year": 2020}"#).unwrap();
        let record = SemanticScholarSource::record_from_paper(&paper, Some("10.1/abc"));
        assert_eq!(record.url.as_deref(), Some("https://doi.org/10.1/abc"));
    }

    #[tokio::test]
    async fn search_unwraps_data_array() {
        let mut server = mockito::Server::new_async().await;
        let body = format!(r#"{{"data": [{}]}}"#, PAPER_JSON);
        server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/paper/search\?query=.*".to_string()),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let source = SemanticScholarSource::with_base_url(server.url());
        let record = source.search_title("A Large-Scale Test").await.unwrap();
        assert_eq!(record.doi.as_deref(), Some("10.1/abc"));
    }
}
