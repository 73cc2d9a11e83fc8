//! Unpaywall metadata source implementation.
//!
//! Uses the Unpaywall API, which also carries full journal biblio for many
//! DOIs alongside its open-access location data.
//! API documentation: <https://unpaywall.org/api/v2>

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{clean, MetadataRecord};
use crate::sources::{Source, SourceCapabilities, SourceError};
use crate::utils::doi::fallback_url;
use crate::utils::HttpClient;

const UNPAYWALL_API_BASE: &str = "https://api.unpaywall.org/v2";

/// Unpaywall metadata source
///
/// The API requires a contact email (free, no key needed).
#[derive(Debug, Clone)]
pub struct UnpaywallSource {
    client: HttpClient,
    base_url: String,
    email: String,
}

impl UnpaywallSource {
    pub fn new(email: &str) -> Self {
        Self::with_base_url(UNPAYWALL_API_BASE, email)
    }

    /// Create with a custom API base URL (for tests)
    pub fn with_base_url(base_url: impl Into<String>, email: &str) -> Self {
        Self {
            client: HttpClient::new(),
            base_url: base_url.into(),
            email: email.to_string(),
        }
    }

    fn record_from_response(body: &UnpaywallResponse, doi: &str) -> MetadataRecord {
        let authors = body
            .z_authors
            .iter()
            .filter_map(ZAuthor::display_name)
            .collect::<Vec<_>>()
            .join("; ");

        let oa_url = body
            .best_oa_location
            .as_ref()
            .and_then(|loc| loc.url.clone());

        MetadataRecord {
            doi: Some(doi.to_string()),
            authors: clean(Some(authors)),
            title: clean(body.title.clone()),
            journal: clean(body.journal_name.clone()),
            volume: clean(body.journal_volume.clone()),
            issue: clean(body.journal_issue.clone()),
            pages: clean(body.journal_pages.clone()),
            year: body.year.map(|y| y.to_string()),
            url: clean(oa_url)
                .or_else(|| clean(body.doi_url.clone()))
                .or_else(|| Some(fallback_url(doi))),
        }
    }
}

#[async_trait]
impl Source for UnpaywallSource {
    fn id(&self) -> &str {
        "unpaywall"
    }

    fn name(&self) -> &str {
        "Unpaywall"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::DOI_LOOKUP
    }

    async fn lookup_doi(&self, doi: &str) -> Result<MetadataRecord, SourceError> {
        let url = format!(
            "{}/{}?email={}",
            self.base_url,
            doi,
            urlencoding::encode(&self.email)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Unpaywall lookup failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(format!("DOI not in Unpaywall: {}", doi)));
        }

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "Unpaywall returned status: {}",
                response.status()
            )));
        }

        let body: UnpaywallResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Unpaywall JSON: {}", e)))?;

        Ok(Self::record_from_response(&body, doi))
    }
}

// ===== Unpaywall API Types =====

#[derive(Debug, Deserialize)]
struct UnpaywallResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    journal_name: Option<String>,
    #[serde(default)]
    journal_volume: Option<String>,
    #[serde(default)]
    journal_issue: Option<String>,
    #[serde(default)]
    journal_pages: Option<String>,
    #[serde(default)]
    year: Option<i64>,
    #[serde(default)]
    doi_url: Option<String>,
    #[serde(default)]
    z_authors: Vec<ZAuthor>,
    #[serde(default)]
    best_oa_location: Option<OaLocation>,
}

#[derive(Debug, Deserialize)]
struct ZAuthor {
    #[serde(default)]
    given: Option<String>,
    #[serde(default)]
    family: Option<String>,
}

impl ZAuthor {
    fn display_name(&self) -> Option<String> {
        let name = format!(
            "{} {}",
            self.given.as_deref().unwrap_or(""),
            self.family.as_deref().unwrap_or("")
        )
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
struct OaLocation {
    #[serde(default)]
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE_JSON: &str = r#"{
        "title": "A Large-Scale Test",
        "journal_name": "Journal of Tests",
        "journal_volume": "12",
        "journal_issue": "3",
        "journal_pages": "45-67",
        "year": 2020,
        "doi_url": "https://doi.org/10.1/abc",
        "z_authors": [
            {"given": "Jane", "family": "Doe"},
            {"given": "John", "family": "Smith"}
        ],
        "best_oa_location": {"url": "https://repo.example.org/paper"}
    }"#;

    #[test]
    fn maps_response_fields() {
        let body: UnpaywallResponse = serde_json::from_str(RESPONSE_JSON).unwrap();
        let record = UnpaywallSource::record_from_response(&body, "10.1/abc");

        assert_eq!(record.authors.as_deref(), Some("Jane Doe; John Smith"));
        assert_eq!(record.journal.as_deref(), Some("Journal of Tests"));
        assert_eq!(record.volume.as_deref(), Some("12"));
        assert_eq!(record.pages.as_deref(), Some("45-67"));
        assert_eq!(record.year.as_deref(), Some("2020"));
        // Open-access location wins over the resolver URL
        assert_eq!(record.url.as_deref(), Some("https://repo.example.org/paper"));
    }

    #[test]
    fn url_falls_back_through_doi_url_to_resolver() {
        let body: UnpaywallResponse =
            serde_json::from_str(r#"{"doi_url": "https://doi.org/10.1/abc"}"#).unwrap();
        let record = UnpaywallSource::record_from_response(&body, "10.1/abc");
        assert_eq!(record.url.as_deref(), Some("https://doi.org/10.1/abc"));

        let bare: UnpaywallResponse = serde_json::from_str("{}").unwrap();
        let record = UnpaywallSource::record_from_response(&bare, "10.1/abc");
        assert_eq!(record.url.as_deref(), Some("https://doi.org/10.1/abc"));
    }

    #[tokio::test]
    async fn lookup_sends_contact_email() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/10.1/abc?email=tests%40example.org")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(RESPONSE_JSON)
            .create_async()
            .await;

        let source = UnpaywallSource::with_base_url(server.url(), "tests@example.org");
        let record = source.lookup_doi("10.1/abc").await.unwrap();

        mock.assert_async().await;
        assert_eq!(record.year.as_deref(), Some("2020"));
    }
}
