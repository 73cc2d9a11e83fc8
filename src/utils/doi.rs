//! DOI normalization and resolver URL handling.

/// Resolver prefixes stripped by [`normalize_doi`], longest first so the
/// dx.doi.org variants win over the plain ones.
const RESOLVER_PREFIXES: [&str; 4] = [
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "https://doi.org/",
    "http://doi.org/",
];

/// URL scheme used for `original_url` / `replication_url` columns in the
/// master database. Kept on plain http to match the historical column
/// migration that introduced these URLs.
const ROW_URL_PREFIX: &str = "http://doi.org/";

/// Strip any known resolver URL prefix from a DOI and trim whitespace.
///
/// Returns `None` for empty or blank input. Idempotent: a bare DOI passes
/// through unchanged, internal structure (slashes, case) is never altered.
pub fn normalize_doi(doi: &str) -> Option<String> {
    let doi = doi.trim();
    if doi.is_empty() {
        return None;
    }
    let bare = RESOLVER_PREFIXES
        .iter()
        .find_map(|prefix| doi.strip_prefix(prefix))
        .unwrap_or(doi);
    if bare.is_empty() {
        None
    } else {
        Some(bare.to_string())
    }
}

/// Extract a DOI from a row URL like `http://doi.org/10.1234/xyz`.
///
/// Unlike [`normalize_doi`] this is strict: anything that does not start
/// with the doi.org resolver prefix yields `None` rather than passing
/// through, so arbitrary publisher URLs are never mistaken for DOIs.
pub fn doi_from_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    for prefix in ["http://doi.org/", "https://doi.org/"] {
        if let Some(bare) = url.strip_prefix(prefix) {
            if bare.is_empty() {
                return None;
            }
            return Some(bare.to_string());
        }
    }
    None
}

/// Build the row-level URL for a bare DOI.
pub fn url_for_doi(doi: &str) -> String {
    format!("{}{}", ROW_URL_PREFIX, doi)
}

/// Build the metadata-level fallback URL for a bare DOI.
///
/// Provider adapters use this when a source yields a DOI but no usable URL;
/// note the https scheme, distinct from [`url_for_doi`]'s row scheme.
pub fn fallback_url(doi: &str) -> String {
    format!("https://doi.org/{}", doi)
}
