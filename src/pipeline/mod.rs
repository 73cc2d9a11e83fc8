//! Record reconciliation: per-row enrichment decisions, identifier trust
//! checks, and deduplicated appends to the master database.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use regex::Regex;

use crate::dataset::{
    append_version_history, load_data_dictionary, timestamped_output_name, Dataset,
};
use crate::enrich::MergeEngine;
use crate::models::{Entity, MetadataRecord, Row, ROW_FIELDS};
use crate::utils::cite::format_citation_html;
use crate::utils::doi::{doi_from_url, normalize_doi, url_for_doi};

/// Default pause after each enrichment pass over one entity.
pub const DEFAULT_ENTITY_DELAY: Duration = Duration::from_millis(300);

/// Ingestion run settings.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Skip all provider calls; only the reconciliation stages run.
    pub skip_api_calls: bool,
    /// Path to the data dictionary driving column projection and order.
    pub data_dictionary: PathBuf,
    /// Path to the append-only lineage log.
    pub version_history: PathBuf,
    /// Directory the timestamped output database is written into.
    pub output_dir: PathBuf,
    /// Pause after each enriched entity.
    pub entity_delay: Duration,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            skip_api_calls: false,
            data_dictionary: PathBuf::from("data_dictionary.csv"),
            version_history: PathBuf::from("version_history.txt"),
            output_dir: PathBuf::from("."),
            entity_delay: DEFAULT_ENTITY_DELAY,
        }
    }
}

/// Summary of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub input_rows: usize,
    pub duplicates_skipped: usize,
    pub rows_appended: usize,
    pub total_rows: usize,
    pub output_path: PathBuf,
}

/// Whether any tracked bibliographic column of this entity is blank.
///
/// Only columns the input actually carries count: a file without, say,
/// `original_issue` is not treated as perpetually incomplete.
pub fn has_missing_fields(row: &Row, entity: Entity) -> bool {
    ROW_FIELDS.iter().any(|field| {
        let column = entity.column(field);
        row.has_column(&column) && row.is_blank(&column)
    })
}

/// Whether the authors cell shows single-letter-initial abbreviations like
/// "J. Doe" — a sign the existing metadata came from an abbreviated citation
/// and is worth upgrading.
pub fn has_abbreviated_authors(row: &Row, entity: Entity) -> bool {
    static INITIAL: OnceLock<Regex> = OnceLock::new();
    let initial = INITIAL.get_or_init(|| Regex::new(r"(^| )[A-Z]\. ").unwrap());

    row.value(&entity.column("authors"))
        .is_some_and(|authors| initial.is_match(authors))
}

/// Whether the journal cell looks like an abbreviation: short and dotted
/// ("J. Pers."). A fuzzy signal — legitimately short dotted names trip it,
/// which only costs a redundant lookup.
pub fn has_abbreviated_journal(row: &Row, entity: Entity) -> bool {
    row.value(&entity.column("journal"))
        .is_some_and(|journal| journal.trim().len() < 10 && journal.contains('.'))
}

/// Whether this entity's metadata should be (re-)fetched.
pub fn needs_enrichment(row: &Row, entity: Entity) -> bool {
    has_missing_fields(row, entity)
        || has_abbreviated_authors(row, entity)
        || has_abbreviated_journal(row, entity)
}

/// Trust check for a title-discovered identifier, comparing only the year.
///
/// A title search can attach an unrelated paper's DOI to the row; a year
/// mismatch is the one cheap signal that makes that obvious. With no year on
/// either side there is nothing to falsify, so the candidate is accepted.
/// Trailing ".0" float artifacts are shed from both sides before comparing.
pub fn year_matches(row: &Row, entity: Entity, candidate: &MetadataRecord) -> bool {
    let column = entity.column("year");
    let Some(existing) = row.value(&column) else {
        return true;
    };
    let Some(fetched) = candidate.year.as_deref().map(str::trim).filter(|y| !y.is_empty()) else {
        return true;
    };

    let strip = |y: &str| y.trim().strip_suffix(".0").unwrap_or(y.trim()).to_string();
    strip(existing) == strip(fetched)
}

/// Fold fetched metadata into the row, filling only blank cells of columns
/// the row actually has.
pub fn fold_metadata(row: &mut Row, entity: Entity, record: &MetadataRecord) {
    for field in ROW_FIELDS {
        let column = entity.column(field);
        if !row.has_column(&column) || !row.is_blank(&column) {
            continue;
        }
        if let Some(value) = record.row_field(field) {
            row.set(&column, value);
        }
    }
}

/// Enrich one entity of one row, if its state calls for it.
async fn enrich_entity(row: &mut Row, entity: Entity, engine: &MergeEngine, delay: Duration) {
    let url_column = entity.column("url");
    let title_column = entity.column("title");

    let doi = row.value(&url_column).and_then(doi_from_url);

    if let Some(doi) = doi {
        if !needs_enrichment(row, entity) {
            return;
        }
        tracing::info!(%entity, %doi, "fetching metadata by DOI");
        if let Some(record) = engine.enrich_doi(&doi).await {
            fold_metadata(row, entity, &record);
        }
        tokio::time::sleep(delay).await;
    } else if row.is_blank(&url_column) {
        let Some(title) = row.value(&title_column).map(str::to_string) else {
            return;
        };
        tracing::info!(%entity, title = %title, "no URL, searching by title");

        let Some(record) = engine.enrich_title(&title).await else {
            return;
        };
        match record.doi.as_deref().and_then(normalize_doi) {
            Some(doi) if year_matches(row, entity, &record) => {
                tracing::info!(%entity, %doi, "found and verified DOI");
                row.set(&url_column, url_for_doi(&doi));
                fold_metadata(row, entity, &record);
            }
            Some(doi) => {
                tracing::warn!(%entity, %doi, "discovered DOI failed year check, discarding");
            }
            None => {
                tracing::info!(%entity, "no DOI found from title");
            }
        }
        tokio::time::sleep(delay).await;
    }
}

/// Enrich both entities of one row.
pub async fn enrich_row(row: &mut Row, engine: &MergeEngine, entity_delay: Duration) {
    for entity in Entity::ALL {
        enrich_entity(row, entity, engine, entity_delay).await;
    }
}

/// Attach the per-entity citation HTML columns.
fn generate_citations(dataset: &mut Dataset) {
    for entity in Entity::ALL {
        dataset.ensure_column(&entity.column("citation_html"));
    }
    for row in dataset.rows_mut() {
        for entity in Entity::ALL {
            let doi = row
                .value(&entity.column("url"))
                .and_then(|u| doi_from_url(u));
            let html = format_citation_html(
                row.value(&entity.column("authors")),
                row.value(&entity.column("journal")),
                row.value(&entity.column("year")),
                doi.as_deref(),
            );
            row.set(&entity.column("citation_html"), html);
        }
    }
}

/// Lowercase the discipline column so the website's facet filter has one
/// spelling per field.
fn normalize_discipline(dataset: &mut Dataset) {
    if !dataset.headers().iter().any(|h| h == "discipline") {
        return;
    }
    for row in dataset.rows_mut() {
        if let Some(value) = row.value("discipline").map(str::to_lowercase) {
            row.set("discipline", value);
        }
    }
}

/// Whether the master already holds this row, matched exactly on the
/// (original URL, replication URL, description) triple.
pub fn is_duplicate(row: &Row, master: &Dataset) -> bool {
    if master.is_empty() {
        return false;
    }
    let key = row.dedup_key();
    master.rows().iter().any(|existing| existing.dedup_key() == key)
}

/// Run a full ingestion: enrich, reconcile, deduplicate, append, write.
///
/// Duplicates are counted and dropped, never merged into existing rows; the
/// master only ever grows.
pub async fn ingest(
    input_path: &Path,
    master_path: &Path,
    engine: &MergeEngine,
    options: &IngestOptions,
) -> Result<IngestReport> {
    let mut input = Dataset::from_csv_path(input_path)?;
    let mut master = Dataset::read_master(master_path)?;
    let input_rows = input.len();
    tracing::info!(rows = input_rows, file = %input_path.display(), "loaded input");
    tracing::info!(rows = master.len(), file = %master_path.display(), "loaded master database");

    if options.skip_api_calls {
        tracing::info!("skipping metadata enrichment (--skip-api-calls)");
    } else {
        let total = input.len();
        for (index, row) in input.rows_mut().iter_mut().enumerate() {
            tracing::info!(row = index + 1, total, "processing row");
            enrich_row(row, engine, options.entity_delay).await;
        }
    }

    generate_citations(&mut input);

    let dictionary = load_data_dictionary(&options.data_dictionary)?;
    input.project(&dictionary);
    normalize_discipline(&mut input);

    let mut duplicates_skipped = 0;
    let mut rows_appended = 0;
    if master.headers().is_empty() {
        master = Dataset::new(input.headers().to_vec());
    }
    for row in input.rows().iter().cloned() {
        if is_duplicate(&row, &master) {
            tracing::warn!(
                original = row.get("original_url").unwrap_or_default(),
                replication = row.get("replication_url").unwrap_or_default(),
                "duplicate row skipped"
            );
            duplicates_skipped += 1;
        } else {
            master.push_row(row);
            rows_appended += 1;
        }
    }
    // Columns the old master predates (e.g. citation HTML) join at the end,
    // then the dictionary imposes its order
    for header in input.headers().to_vec() {
        master.ensure_column(&header);
    }
    master.reorder(&dictionary);

    let output_name = timestamped_output_name(Local::now());
    let output_path = options.output_dir.join(&output_name);
    master.write_csv(&output_path)?;
    append_version_history(&options.version_history, &output_name)?;

    let report = IngestReport {
        input_rows,
        duplicates_skipped,
        rows_appended,
        total_rows: master.len(),
        output_path,
    };
    tracing::info!(
        input = report.input_rows,
        duplicates = report.duplicates_skipped,
        appended = report.rows_appended,
        total = report.total_rows,
        output = %report.output_path.display(),
        "ingestion complete"
    );
    Ok(report)
}
