//! Best-effort PDF retrieval for a DOI.
//!
//! Walks open-access locations in fallback order: OSF (for OSF-registered
//! DOIs), OpenAlex, Unpaywall, Crossref link metadata, Europe PMC full-text
//! URLs, Semantic Scholar, and finally the DOI resolver itself — accepting a
//! direct PDF response or scraping `.pdf` links off the landing page. Every
//! provider failure is absorbed; the only hard errors are local filesystem
//! ones.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use scraper::{Html, Selector};
use serde::Deserialize;

use crate::utils::http::{HttpClient, DOWNLOAD_TIMEOUT};

const OSF_API_BASE: &str = "https://api.osf.io/v2";

/// Fallback PDF downloader over the metadata provider set.
#[derive(Debug, Clone)]
pub struct PdfFetcher {
    client: HttpClient,
    email: String,
    delay: Duration,
}

impl PdfFetcher {
    pub fn new(email: &str) -> Self {
        Self {
            client: HttpClient::with_timeout(DOWNLOAD_TIMEOUT),
            email: email.to_string(),
            delay: Duration::from_millis(200),
        }
    }

    /// Override the inter-fallback delay (zero in tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Try to download a PDF for `doi` into `save_dir`.
    ///
    /// Returns the saved path, or `None` when every fallback came up empty.
    /// An already-downloaded file short-circuits the whole chain.
    pub async fn fetch_pdf(&self, doi: &str, save_dir: &Path) -> Result<Option<PathBuf>> {
        let doi = doi.trim();
        if doi.is_empty() {
            return Ok(None);
        }

        std::fs::create_dir_all(save_dir)
            .with_context(|| format!("failed to create {}", save_dir.display()))?;
        let save_path = save_dir.join(pdf_filename(doi));

        if save_path.exists() {
            tracing::info!(file = %save_path.display(), "already downloaded");
            return Ok(Some(save_path));
        }

        if is_osf_doi(doi) {
            if self.try_osf(doi, &save_path).await {
                return Ok(Some(save_path));
            }
            tokio::time::sleep(self.delay).await;
        }

        if self.try_openalex(doi, &save_path).await {
            return Ok(Some(save_path));
        }
        tokio::time::sleep(self.delay).await;

        if self.try_unpaywall(doi, &save_path).await {
            return Ok(Some(save_path));
        }
        tokio::time::sleep(self.delay).await;

        if self.try_crossref(doi, &save_path).await {
            return Ok(Some(save_path));
        }
        tokio::time::sleep(self.delay).await;

        if self.try_europe_pmc(doi, &save_path).await {
            return Ok(Some(save_path));
        }
        tokio::time::sleep(self.delay).await;

        if self.try_semantic(doi, &save_path).await {
            return Ok(Some(save_path));
        }
        tokio::time::sleep(self.delay).await;

        if self.try_doi_resolver(doi, &save_path).await {
            return Ok(Some(save_path));
        }

        tracing::info!(%doi, "no PDF found from any fallback");
        Ok(None)
    }

    /// Download `url` into `save_path` if it really serves a PDF.
    async fn try_download(&self, url: &str, save_path: &Path) -> bool {
        if url.is_empty() {
            return false;
        }
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(%url, error = %err, "download request failed");
                return false;
            }
        };
        if !response.status().is_success() || !is_pdf_response(&response) {
            return false;
        }
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(%url, error = %err, "download body failed");
                return false;
            }
        };
        match std::fs::write(save_path, &bytes) {
            Ok(()) => {
                tracing::info!(%url, file = %save_path.display(), "downloaded PDF");
                true
            }
            Err(err) => {
                tracing::warn!(file = %save_path.display(), error = %err, "failed to write PDF");
                false
            }
        }
    }

    async fn try_osf(&self, doi: &str, save_path: &Path) -> bool {
        let Some(osf_id) = osf_id_from_doi(doi) else {
            return false;
        };

        let candidates = [
            format!("https://osf.io/{}/download", osf_id),
            format!("https://osf.io/{}/?action=download", osf_id),
            format!("https://osf.io/{}/", osf_id),
        ];
        for url in &candidates {
            if self.try_download(url, save_path).await {
                return true;
            }
        }

        // Fall back to listing the node's attached files
        let url = format!("{}/nodes/{}/files/", OSF_API_BASE, osf_id);
        let Ok(files) = self.get_json::<OsfFiles>(&url).await else {
            return false;
        };
        for entry in files.data {
            let Some(download) = entry.links.and_then(|l| l.download) else {
                continue;
            };
            if download.to_lowercase().ends_with(".pdf")
                && self.try_download(&download, save_path).await
            {
                return true;
            }
        }
        false
    }

    async fn try_openalex(&self, doi: &str, save_path: &Path) -> bool {
        let url = format!("https://api.openalex.org/works/https://doi.org/{}", doi);
        let Ok(work) = self.get_json::<OaWork>(&url).await else {
            return false;
        };
        let Some(location) = work.best_oa_location else {
            return false;
        };
        let pdf_url = location.url_for_pdf.or(location.url).unwrap_or_default();
        self.try_download(&pdf_url, save_path).await
    }

    async fn try_unpaywall(&self, doi: &str, save_path: &Path) -> bool {
        let url = format!(
            "https://api.unpaywall.org/v2/{}?email={}",
            doi,
            urlencoding::encode(&self.email)
        );
        let Ok(body) = self.get_json::<OaWork>(&url).await else {
            return false;
        };
        let Some(location) = body.best_oa_location else {
            return false;
        };
        let pdf_url = location.url_for_pdf.or(location.url).unwrap_or_default();
        self.try_download(&pdf_url, save_path).await
    }

    async fn try_crossref(&self, doi: &str, save_path: &Path) -> bool {
        let url = format!("https://api.crossref.org/works/{}", urlencoding::encode(doi));
        let Ok(body) = self.get_json::<CrResponse>(&url).await else {
            return false;
        };

        // Direct PDF links in the work metadata, then the landing page
        for link in &body.message.link {
            if link.content_type.as_deref() == Some("application/pdf") {
                if let Some(href) = &link.url {
                    if self.try_download(href, save_path).await {
                        return true;
                    }
                }
            }
        }
        match &body.message.url {
            Some(landing) => self.try_download(landing, save_path).await,
            None => false,
        }
    }

    async fn try_europe_pmc(&self, doi: &str, save_path: &Path) -> bool {
        let url = format!(
            "https://www.ebi.ac.uk/europepmc/webservices/rest/search?query=DOI:{}&format=json",
            urlencoding::encode(doi)
        );
        let Ok(body) = self.get_json::<EpmcResponse>(&url).await else {
            return false;
        };
        let urls = body
            .result_list
            .and_then(|l| l.result.into_iter().next())
            .and_then(|r| r.full_text_url_list)
            .map(|l| l.full_text_url)
            .unwrap_or_default();
        for entry in urls {
            let Some(url) = entry.url else { continue };
            if url.to_lowercase().contains("pdf") && self.try_download(&url, save_path).await {
                return true;
            }
        }
        false
    }

    async fn try_semantic(&self, doi: &str, save_path: &Path) -> bool {
        let url = format!(
            "https://api.semanticscholar.org/graph/v1/paper/DOI:{}?fields=openAccessPdf",
            doi
        );
        let Ok(body) = self.get_json::<SsResponse>(&url).await else {
            return false;
        };
        let pdf_url = body
            .open_access_pdf
            .and_then(|p| p.url)
            .unwrap_or_default();
        self.try_download(&pdf_url, save_path).await
    }

    async fn try_doi_resolver(&self, doi: &str, save_path: &Path) -> bool {
        let url = format!("https://doi.org/{}", doi);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(%doi, error = %err, "DOI resolver request failed");
                return false;
            }
        };
        if !response.status().is_success() {
            return false;
        }

        // Some DOIs resolve straight to the PDF
        if is_pdf_response(&response) {
            let Ok(bytes) = response.bytes().await else {
                return false;
            };
            if std::fs::write(save_path, &bytes).is_ok() {
                tracing::info!(%doi, "DOI resolved directly to a PDF");
                return true;
            }
            return false;
        }

        let final_url = response.url().clone();
        let Ok(html) = response.text().await else {
            return false;
        };
        for link in extract_pdf_links(&html, &final_url) {
            if self.try_download(&link, save_path).await {
                return true;
            }
        }
        false
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("status {}", response.status());
        }
        Ok(response.json().await?)
    }
}

/// File name a DOI's PDF is stored under: slashes become "--".
pub fn pdf_filename(doi: &str) -> String {
    format!("{}.pdf", doi.replace('/', "--"))
}

fn is_pdf_response(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_lowercase().contains("application/pdf"))
        .unwrap_or(false)
}

fn is_osf_doi(doi: &str) -> bool {
    let lower = doi.to_lowercase();
    lower.starts_with("10.17605/osf.io") || lower.contains("osf")
}

/// Pull the OSF node identifier out of an OSF DOI like `10.17605/OSF.IO/AB12C`.
fn osf_id_from_doi(doi: &str) -> Option<String> {
    let id = doi
        .split('/')
        .next_back()
        .unwrap_or("")
        .replace("%2F", "")
        .replace("OSF.IO", "")
        .trim()
        .to_lowercase();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Collect absolute `.pdf` hrefs from a landing page.
fn extract_pdf_links(html: &str, base: &reqwest::Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").unwrap();

    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.to_lowercase().ends_with(".pdf"))
        .filter_map(|href| base.join(href).ok())
        .map(|url| url.to_string())
        .collect()
}

// ===== Provider response fragments =====

#[derive(Debug, Deserialize)]
struct OaWork {
    #[serde(default)]
    best_oa_location: Option<OaLocation>,
}

#[derive(Debug, Deserialize)]
struct OaLocation {
    #[serde(default)]
    url_for_pdf: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrResponse {
    message: CrMessage,
}

#[derive(Debug, Deserialize)]
struct CrMessage {
    #[serde(default)]
    link: Vec<CrLink>,
    #[serde(rename = "URL", default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrLink {
    #[serde(rename = "content-type", default)]
    content_type: Option<String>,
    #[serde(rename = "URL", default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EpmcResponse {
    #[serde(rename = "resultList", default)]
    result_list: Option<EpmcResultList>,
}

#[derive(Debug, Deserialize)]
struct EpmcResultList {
    #[serde(default)]
    result: Vec<EpmcResult>,
}

#[derive(Debug, Deserialize)]
struct EpmcResult {
    #[serde(rename = "fullTextUrlList", default)]
    full_text_url_list: Option<EpmcUrlList>,
}

#[derive(Debug, Deserialize)]
struct EpmcUrlList {
    #[serde(rename = "fullTextUrl", default)]
    full_text_url: Vec<EpmcUrl>,
}

#[derive(Debug, Deserialize)]
struct EpmcUrl {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SsResponse {
    #[serde(rename = "openAccessPdf", default)]
    open_access_pdf: Option<SsPdf>,
}

#[derive(Debug, Deserialize)]
struct SsPdf {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OsfFiles {
    #[serde(default)]
    data: Vec<OsfEntry>,
}

#[derive(Debug, Deserialize)]
struct OsfEntry {
    #[serde(default)]
    links: Option<OsfLinks>,
}

#[derive(Debug, Deserialize)]
struct OsfLinks {
    #[serde(default)]
    download: Option<String>,
}
