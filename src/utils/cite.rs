//! Citation display text for the public website.

/// Minimal HTML escaping for text interpolated into citation markup.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Return "Last F. <i>et al.</i>" style from a semicolon-separated author
/// list, using only the first author.
fn format_first_author(authors: &str) -> String {
    let first_author = authors.split(';').next().unwrap_or("").trim();
    if first_author.is_empty() {
        return String::new();
    }
    let parts: Vec<&str> = first_author.split_whitespace().collect();
    if parts.len() >= 2 {
        let last = parts[parts.len() - 1];
        let initial = parts[0].chars().next().map(|c| format!("{}.", c)).unwrap_or_default();
        format!("{} {} <i>et al.</i>", last, initial)
    } else {
        parts[0].to_string()
    }
}

/// Render a year cell, shedding the ".0" float artifact spreadsheets leave
/// on integer years.
fn format_year(year: &str) -> String {
    let year = year.trim();
    year.strip_suffix(".0").unwrap_or(year).to_string()
}

/// Build the clickable HTML citation shown on the website: author part,
/// italicized journal, year, with the whole citation wrapped in a DOI link
/// when one exists (link target hidden, styling inherited).
pub fn format_citation_html(
    authors: Option<&str>,
    journal: Option<&str>,
    year: Option<&str>,
    doi: Option<&str>,
) -> String {
    let authors_part = authors.map(format_first_author).unwrap_or_default();
    let journal_part = journal
        .map(|j| format!("<i>{}</i>", escape_html(j)))
        .unwrap_or_else(|| "<i></i>".to_string());
    let year_part = year.map(format_year).unwrap_or_default();

    let citation_text = [authors_part.as_str(), journal_part.as_str(), year_part.as_str()]
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    match doi.map(str::trim).filter(|d| !d.is_empty()) {
        Some(doi) => {
            let url = format!("https://doi.org/{}", doi);
            format!(
                "<a href=\"{}\" target=\"_blank\" style=\"text-decoration:none; color:inherit;\">{}</a>",
                escape_html(&url),
                citation_text
            )
        }
        None => citation_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_author_abbreviated_with_et_al() {
        assert_eq!(
            format_first_author("Jane Doe; John Smith"),
            "Doe J. <i>et al.</i>"
        );
        assert_eq!(format_first_author("Prince"), "Prince");
        assert_eq!(format_first_author(""), "");
    }

    #[test]
    fn citation_wraps_in_doi_link() {
        let html = format_citation_html(
            Some("Jane Doe; John Smith"),
            Some("Journal of Tests"),
            Some("2020"),
            Some("10.1/abc"),
        );
        assert!(html.starts_with("<a href=\"https://doi.org/10.1/abc\""));
        assert!(html.contains("Doe J. <i>et al.</i>"));
        assert!(html.contains("<i>Journal of Tests</i>"));
        assert!(html.contains("2020"));
    }

    #[test]
    fn citation_without_doi_is_plain() {
        let html = format_citation_html(Some("Jane Doe"), Some("J. Tests"), Some("2020"), None);
        assert!(!html.contains("<a href"));
    }

    #[test]
    fn year_float_artifact_is_shed() {
        let html = format_citation_html(None, None, Some("2020.0"), None);
        assert!(html.contains("2020"));
        assert!(!html.contains("2020.0"));
    }

    #[test]
    fn journal_is_escaped() {
        let html = format_citation_html(None, Some("Q&A <Journal>"), None, None);
        assert!(html.contains("<i>Q&amp;A &lt;Journal&gt;</i>"));
    }
}
