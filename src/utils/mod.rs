//! Utility modules supporting the ingestion engine:
//!
//! - [`doi`]: DOI normalization and resolver URL templates
//! - [`cite`]: citation HTML generation for the website
//! - [`pdf`]: best-effort PDF retrieval over the provider set
//! - [`HttpClient`]: shared reqwest wrapper with bounded timeouts

pub mod cite;
pub mod doi;
mod http;
pub mod pdf;

pub use http::{HttpClient, DOWNLOAD_TIMEOUT, METADATA_TIMEOUT};
pub use pdf::PdfFetcher;
