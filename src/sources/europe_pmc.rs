//! Europe PMC metadata source implementation using their REST API.
//!
//! Europe PMC indexes PubMed, PMC, and preprints from bioRxiv/medRxiv, and
//! serves both DOI-keyed and free-text search through the same endpoint.

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{clean, MetadataRecord};
use crate::sources::{Source, SourceCapabilities, SourceError};
use crate::utils::doi::{fallback_url, normalize_doi};
use crate::utils::HttpClient;

const EUROPE_PMC_API_BASE: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest";

/// Europe PMC metadata source
#[derive(Debug, Clone)]
pub struct EuropePmcSource {
    client: HttpClient,
    base_url: String,
}

impl EuropePmcSource {
    pub fn new() -> Self {
        Self::with_base_url(EUROPE_PMC_API_BASE)
    }

    /// Create with a custom API base URL (for tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: HttpClient::new(),
            base_url: base_url.into(),
        }
    }

    async fn search(&self, query: &str) -> Result<SearchResult, SourceError> {
        let url = format!(
            "{}/search?query={}&format=json&pageSize=1",
            self.base_url,
            urlencoding::encode(query)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Europe PMC search failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "Europe PMC returned status: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Europe PMC JSON: {}", e)))
    }

    fn record_from_result(item: &ResultItem, known_doi: Option<&str>) -> MetadataRecord {
        let doi = match known_doi {
            Some(d) => Some(d.to_string()),
            None => item.doi.as_deref().and_then(normalize_doi),
        };

        let full_text_url = item
            .full_text_url_list
            .as_ref()
            .and_then(|l| l.full_text_url.first())
            .and_then(|u| u.url.clone());

        MetadataRecord {
            url: clean(full_text_url).or_else(|| known_doi.map(fallback_url)),
            doi,
            authors: clean(item.author_string.clone()),
            title: clean(item.title.clone()),
            journal: clean(item.journal_title.clone()),
            volume: clean(item.journal_volume.clone()),
            issue: clean(item.issue.clone()),
            pages: clean(item.page_info.clone()),
            year: clean(item.pub_year.clone()),
        }
    }

    fn first_result(result: SearchResult) -> Result<ResultItem, SourceError> {
        result
            .result_list
            .and_then(|l| l.result.into_iter().next())
            .ok_or_else(|| SourceError::NotFound("empty Europe PMC result list".to_string()))
    }
}

impl Default for EuropePmcSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for EuropePmcSource {
    fn id(&self) -> &str {
        "europe_pmc"
    }

    fn name(&self) -> &str {
        "Europe PMC"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::DOI_LOOKUP | SourceCapabilities::TITLE_SEARCH
    }

    async fn lookup_doi(&self, doi: &str) -> Result<MetadataRecord, SourceError> {
        let result = self.search(&format!("DOI:{}", doi)).await?;
        let item = Self::first_result(result)?;
        Ok(Self::record_from_result(&item, Some(doi)))
    }

    async fn search_title(&self, title: &str) -> Result<MetadataRecord, SourceError> {
        let result = self.search(title).await?;
        let item = Self::first_result(result)?;
        Ok(Self::record_from_result(&item, None))
    }
}

// ===== Europe PMC API Types =====

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(rename = "resultList", default)]
    result_list: Option<ResultList>,
}

#[derive(Debug, Default, Deserialize)]
struct ResultList {
    #[serde(default)]
    result: Vec<ResultItem>,
}

#[derive(Debug, Deserialize)]
struct ResultItem {
    #[serde(default)]
    doi: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "authorString", default)]
    author_string: Option<String>,
    #[serde(rename = "journalTitle", default)]
    journal_title: Option<String>,
    #[serde(rename = "journalVolume", default)]
    journal_volume: Option<String>,
    #[serde(default)]
    issue: Option<String>,
    #[serde(rename = "pageInfo", default)]
    page_info: Option<String>,
    #[serde(rename = "pubYear", default)]
    pub_year: Option<String>,
    #[serde(rename = "fullTextUrlList", default)]
    full_text_url_list: Option<FullTextUrlList>,
}

#[derive(Debug, Deserialize)]
struct FullTextUrlList {
    #[serde(rename = "fullTextUrl", default)]
    full_text_url: Vec<FullTextUrl>,
}

#[derive(Debug, Deserialize)]
struct FullTextUrl {
    #[serde(default)]
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULT_JSON: &str = r#"{
        "resultList": {
            "result": [{
                "doi": "10.1/abc",
                "title": "A Large-Scale Test",
                "authorString": "Doe J, Smith J.",
                "journalTitle": "Journal of Tests",
                "journalVolume": "12",
                "issue": "3",
                "pageInfo": "45-67",
                "pubYear": "2020",
                "fullTextUrlList": {
                    "fullTextUrl": [{"url": "https://europepmc.org/article/MED/123"}]
                }
            }]
        }
    }"#;

    #[test]
    fn maps_result_fields() {
        let result: SearchResult = serde_json::from_str(RESULT_JSON).unwrap();
        let item = EuropePmcSource::first_result(result).unwrap();
        let record = EuropePmcSource::record_from_result(&item, None);

        assert_eq!(record.doi.as_deref(), Some("10.1/abc"));
        assert_eq!(record.authors.as_deref(), Some("Doe J, Smith J."));
        assert_eq!(record.journal.as_deref(), Some("Journal of Tests"));
        assert_eq!(record.pages.as_deref(), Some("45-67"));
        assert_eq!(record.year.as_deref(), Some("2020"));
        assert_eq!(
            record.url.as_deref(),
            Some("https://europepmc.org/article/MED/123")
        );
    }

    #[test]
    fn doi_lookup_falls_back_to_resolver_url() {
        let result: SearchResult = serde_json::from_str(
            r#"{"resultList": {"result": [{"title": "T", "pubYear": "2020"}]}}"#,
        )
        .unwrap();
        let item = EuropePmcSource::first_result(result).unwrap();
        let record = EuropePmcSource::record_from_result(&item, Some("10.1/abc"));
        assert_eq!(record.url.as_deref(), Some("https://doi.org/10.1/abc"));
    }

    #[test]
    fn empty_result_list_is_not_found() {
        let result: SearchResult =
            serde_json::from_str(r#"{"resultList": {"result": []}}"#).unwrap();
        assert!(matches!(
            EuropePmcSource::first_result(result),
            Err(SourceError::NotFound(_))
        ));
    }
}
