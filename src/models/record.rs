//! Metadata record populated by provider lookups.

use serde::{Deserialize, Serialize};

/// Values the upstream spreadsheets treat as "nothing here": empty cells,
/// whitespace, and the literal "NaN" that float-typed columns leak.
pub fn is_blank(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == "NaN"
}

/// Normalize an optional value so a field is either unset or non-blank.
pub fn clean(value: Option<String>) -> Option<String> {
    value.filter(|v| !is_blank(v))
}

/// Bibliographic metadata for one work, accumulated across providers.
///
/// Every field is optional; a set field always holds a non-blank value.
/// `year` is kept in serialized form ("2020") so that provider integers and
/// spreadsheet float artifacts ("2020.0") flow through comparison unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub doi: Option<String>,
    pub authors: Option<String>,
    pub title: Option<String>,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub year: Option<String>,
    pub url: Option<String>,
}

/// The seven bibliographic fields folded into dataset rows (the `url` column
/// is synthesized from the DOI instead, and `doi` itself is not a column).
pub const ROW_FIELDS: [&str; 7] = [
    "authors", "title", "journal", "volume", "issue", "pages", "year",
];

impl MetadataRecord {
    /// Fill-only-if-empty merge, returning a new record: a field already set
    /// on `self` is never replaced by `other`, regardless of `other`'s value.
    pub fn merged(&self, other: &MetadataRecord) -> MetadataRecord {
        fn fill(ours: &Option<String>, theirs: &Option<String>) -> Option<String> {
            clean(ours.clone()).or_else(|| clean(theirs.clone()))
        }
        MetadataRecord {
            doi: fill(&self.doi, &other.doi),
            authors: fill(&self.authors, &other.authors),
            title: fill(&self.title, &other.title),
            journal: fill(&self.journal, &other.journal),
            volume: fill(&self.volume, &other.volume),
            issue: fill(&self.issue, &other.issue),
            pages: fill(&self.pages, &other.pages),
            year: fill(&self.year, &other.year),
            url: fill(&self.url, &other.url),
        }
    }

    /// Whether every bibliographic field is set.
    ///
    /// `doi` is deliberately excluded: DOI-driven enrichment starts with one,
    /// and title-driven enrichment checks it separately.
    pub fn is_complete(&self) -> bool {
        self.authors.is_some()
            && self.title.is_some()
            && self.journal.is_some()
            && self.volume.is_some()
            && self.issue.is_some()
            && self.pages.is_some()
            && self.year.is_some()
            && self.url.is_some()
    }

    /// Whether no field at all is set.
    pub fn is_empty(&self) -> bool {
        *self == MetadataRecord::default()
    }

    /// Value of one of the [`ROW_FIELDS`] by name.
    pub fn row_field(&self, field: &str) -> Option<&str> {
        let value = match field {
            "authors" => &self.authors,
            "title" => &self.title,
            "journal" => &self.journal,
            "volume" => &self.volume,
            "issue" => &self.issue,
            "pages" => &self.pages,
            "year" => &self.year,
            _ => &None,
        };
        value.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: Option<&str>, journal: Option<&str>) -> MetadataRecord {
        MetadataRecord {
            title: title.map(String::from),
            journal: journal.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn merge_fills_only_empty_fields() {
        let higher = record(Some("A Title"), None);
        let lower = record(Some("Another Title"), Some("Some Journal"));

        let merged = higher.merged(&lower);
        assert_eq!(merged.title.as_deref(), Some("A Title"));
        assert_eq!(merged.journal.as_deref(), Some("Some Journal"));
    }

    #[test]
    fn merge_is_idempotent() {
        let base = record(Some("A Title"), None);
        let partial = record(None, Some("Some Journal"));

        let once = base.merged(&partial);
        let twice = once.merged(&partial);
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_treats_blank_as_unset() {
        let base = record(Some("  "), Some("NaN"));
        let partial = record(Some("A Title"), Some("Some Journal"));

        let merged = base.merged(&partial);
        assert_eq!(merged.title.as_deref(), Some("A Title"));
        assert_eq!(merged.journal.as_deref(), Some("Some Journal"));
    }

    #[test]
    fn completeness_requires_all_fields() {
        let mut rec = MetadataRecord {
            authors: Some("Jane Doe; John Smith".into()),
            title: Some("A Title".into()),
            journal: Some("Journal of Tests".into()),
            volume: Some("12".into()),
            issue: Some("3".into()),
            pages: Some("45-67".into()),
            year: Some("2020".into()),
            url: Some("https://doi.org/10.1/x".into()),
            doi: None,
        };
        assert!(rec.is_complete());

        rec.pages = None;
        assert!(!rec.is_complete());
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(""));
        assert!(is_blank("   "));
        assert!(is_blank("NaN"));
        assert!(!is_blank("2020"));
        assert!(!is_blank("nan study"));
    }
}
