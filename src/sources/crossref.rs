//! Crossref metadata source implementation.
//!
//! Uses the Crossref REST API for DOI metadata lookup and title search.

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{clean, MetadataRecord};
use crate::sources::{Source, SourceCapabilities, SourceError};
use crate::utils::doi::{fallback_url, normalize_doi};
use crate::utils::HttpClient;

const CROSSREF_API_BASE: &str = "https://api.crossref.org";

/// Crossref metadata source
#[derive(Debug, Clone)]
pub struct CrossrefSource {
    client: HttpClient,
    base_url: String,
}

impl CrossrefSource {
    pub fn new() -> Self {
        Self::with_base_url(CROSSREF_API_BASE)
    }

    /// Create with a custom API base URL (for tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: HttpClient::new(),
            base_url: base_url.into(),
        }
    }

    fn record_from_work(work: &CrWork, known_doi: Option<&str>) -> MetadataRecord {
        let doi = match known_doi {
            Some(d) => Some(d.to_string()),
            None => work.doi.as_deref().and_then(normalize_doi),
        };

        let authors = work
            .author
            .iter()
            .filter_map(CrAuthor::display_name)
            .collect::<Vec<_>>()
            .join("; ");

        // Print date wins over online date, as Crossref recommends for
        // citation purposes
        let year = work
            .published_print
            .as_ref()
            .and_then(CrDate::year)
            .or_else(|| work.published_online.as_ref().and_then(CrDate::year));

        MetadataRecord {
            url: doi.as_deref().map(fallback_url),
            doi,
            authors: clean(Some(authors)),
            title: clean(work.title.first().cloned()),
            journal: clean(work.container_title.first().cloned()),
            volume: clean(work.volume.clone()),
            issue: clean(work.issue.clone()),
            pages: clean(work.page.clone()),
            year: year.map(|y| y.to_string()),
        }
    }
}

impl Default for CrossrefSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for CrossrefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "Crossref"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::DOI_LOOKUP | SourceCapabilities::TITLE_SEARCH
    }

    async fn lookup_doi(&self, doi: &str) -> Result<MetadataRecord, SourceError> {
        let url = format!("{}/works/{}", self.base_url, urlencoding::encode(doi));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Crossref lookup failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(format!("DOI not in Crossref: {}", doi)));
        }

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "Crossref returned status: {}",
                response.status()
            )));
        }

        let body: CrWorkResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Crossref JSON: {}", e)))?;

        Ok(Self::record_from_work(&body.message, Some(doi)))
    }

    async fn search_title(&self, title: &str) -> Result<MetadataRecord, SourceError> {
        let url = format!(
            "{}/works?query.title={}&rows=1",
            self.base_url,
            urlencoding::encode(title)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Crossref search failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "Crossref returned status: {}",
                response.status()
            )));
        }

        let body: CrSearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Crossref JSON: {}", e)))?;

        let item = body
            .message
            .items
            .first()
            .ok_or_else(|| SourceError::NotFound(format!("no Crossref match for '{}'", title)))?;

        Ok(Self::record_from_work(item, None))
    }
}

// ===== Crossref API Types =====

#[derive(Debug, Deserialize)]
struct CrWorkResponse {
    message: CrWork,
}

#[derive(Debug, Deserialize)]
struct CrSearchResponse {
    message: CrItems,
}

#[derive(Debug, Deserialize)]
struct CrItems {
    #[serde(default)]
    items: Vec<CrWork>,
}

#[derive(Debug, Deserialize)]
struct CrWork {
    #[serde(rename = "DOI", default)]
    doi: Option<String>,
    #[serde(default)]
    title: Vec<String>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    #[serde(default)]
    author: Vec<CrAuthor>,
    #[serde(default)]
    volume: Option<String>,
    #[serde(default)]
    issue: Option<String>,
    #[serde(default)]
    page: Option<String>,
    #[serde(rename = "published-print", default)]
    published_print: Option<CrDate>,
    #[serde(rename = "published-online", default)]
    published_online: Option<CrDate>,
}

#[derive(Debug, Deserialize)]
struct CrAuthor {
    #[serde(default)]
    given: Option<String>,
    #[serde(default)]
    family: Option<String>,
}

impl CrAuthor {
    fn display_name(&self) -> Option<String> {
        let name = [self.given.as_deref(), self.family.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

#[derive(Debug, Deserialize)]
struct CrDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i64>>>,
}

impl CrDate {
    fn year(&self) -> Option<i64> {
        self.date_parts.first()?.first().copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORK_JSON: &str = r#"{
        "DOI": "10.1/abc",
        "title": ["A Large-Scale Test"],
        "container-title": ["Journal of Tests"],
        "author": [
            {"given": "Jane", "family": "Doe"},
            {"family": "Smith"}
        ],
        "volume": "12",
        "issue": "3",
        "page": "45-67",
        "published-print": {"date-parts": [[2020, 5]]}
    }"#;

    #[test]
    fn maps_work_fields() {
        let work: CrWork = serde_json::from_str(WORK_JSON).unwrap();
        let record = CrossrefSource::record_from_work(&work, None);

        assert_eq!(record.doi.as_deref(), Some("10.1/abc"));
        assert_eq!(record.authors.as_deref(), Some("Jane Doe; Smith"));
        assert_eq!(record.title.as_deref(), Some("A Large-Scale Test"));
        assert_eq!(record.journal.as_deref(), Some("Journal of Tests"));
        assert_eq!(record.pages.as_deref(), Some("45-67"));
        assert_eq!(record.year.as_deref(), Some("2020"));
        assert_eq!(record.url.as_deref(), Some("https://doi.org/10.1/abc"));
    }

    #[test]
    fn online_date_fills_in_for_missing_print_date() {
        let work: CrWork = serde_json::from_str(
            r#"{"title": ["T"], "published-online": {"date-parts": [[2018, 1, 15]]}}"#,
        )
        .unwrap();
        let record = CrossrefSource::record_from_work(&work, Some("10.1/x"));
        assert_eq!(record.year.as_deref(), Some("2018"));
    }

    #[test]
    fn empty_date_parts_leave_year_unset() {
        let work: CrWork =
            serde_json::from_str(r#"{"title": ["T"], "published-print": {"date-parts": [[null]]}}"#)
                .unwrap();
        let record = CrossrefSource::record_from_work(&work, Some("10.1/x"));
        assert!(record.year.is_none());
    }

    #[tokio::test]
    async fn lookup_doi_unwraps_message() {
        let mut server = mockito::Server::new_async().await;
        let body = format!(r#"{{"message": {}}}"#, WORK_JSON);
        let mock = server
            .mock("GET", "/works/10.1%2Fabc")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let source = CrossrefSource::with_base_url(server.url());
        let record = source.lookup_doi("10.1/abc").await.unwrap();

        mock.assert_async().await;
        assert_eq!(record.journal.as_deref(), Some("Journal of Tests"));
    }
}
