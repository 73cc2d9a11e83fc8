//! CSV-backed dataset handling: input files, the master database, the data
//! dictionary, and the version-history lineage log.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::models::Row;

/// An ordered, header-keyed table of rows.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Read a CSV file.
    ///
    /// A row that fails to parse is logged and skipped; it never aborts the
    /// batch. Short rows are padded with empty cells so every row exposes
    /// every header column.
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        let headers: Vec<String> = reader
            .headers()
            .with_context(|| format!("failed to read headers from {}", path.display()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut dataset = Self::new(headers);
        for (index, result) in reader.records().enumerate() {
            match result {
                Ok(record) => {
                    let row = Row::from_pairs(dataset.headers.iter().enumerate().map(
                        |(i, header)| (header.clone(), record.get(i).unwrap_or("").to_string()),
                    ));
                    dataset.rows.push(row);
                }
                Err(err) => {
                    tracing::warn!(row = index + 2, error = %err, file = %path.display(), "skipping malformed row");
                }
            }
        }
        Ok(dataset)
    }

    /// Read the master database; a missing file means "start from empty".
    pub fn read_master(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(file = %path.display(), "master database not found, starting from empty");
            return Ok(Self::default());
        }
        Self::from_csv_path(path)
    }

    /// Write the dataset, cells ordered by the current headers.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create {}", path.display()))?;

        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(
                self.headers
                    .iter()
                    .map(|h| row.get(h).unwrap_or_default()),
            )?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Add a column (as the last header) if it is not already present.
    pub fn ensure_column(&mut self, name: &str) {
        if !self.headers.iter().any(|h| h == name) {
            self.headers.push(name.to_string());
        }
    }

    /// Keep only the dictionary's columns, in dictionary order.
    pub fn project(&mut self, columns: &[String]) {
        let existing: HashSet<&str> = self.headers.iter().map(String::as_str).collect();
        self.headers = columns
            .iter()
            .filter(|c| existing.contains(c.as_str()))
            .cloned()
            .collect();
    }

    /// Reorder to dictionary order, keeping any column the dictionary does
    /// not know about at the end rather than dropping it.
    pub fn reorder(&mut self, columns: &[String]) {
        let wanted: Vec<String> = {
            let existing: HashSet<&str> = self.headers.iter().map(String::as_str).collect();
            columns
                .iter()
                .filter(|c| existing.contains(c.as_str()))
                .cloned()
                .collect()
        };
        let ordered: HashSet<&str> = wanted.iter().map(String::as_str).collect();
        let stragglers: Vec<String> = self
            .headers
            .iter()
            .filter(|h| !ordered.contains(h.as_str()))
            .cloned()
            .collect();

        self.headers = wanted;
        self.headers.extend(stragglers);
    }
}

/// Load the ordered `column_name` list from a data dictionary CSV.
pub fn load_data_dictionary(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open data dictionary {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let column_index = headers
        .iter()
        .position(|h| h == "column_name")
        .context("data dictionary has no 'column_name' column")?;

    let mut columns = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(name) = record.get(column_index) {
            if !name.trim().is_empty() {
                columns.push(name.trim().to_string());
            }
        }
    }
    Ok(columns)
}

/// Output file name for an updated master database.
pub fn timestamped_output_name(now: DateTime<Local>) -> String {
    format!(
        "replications_database_{}.csv",
        now.format("%Y_%m_%d_%H%M%S")
    )
}

/// Append one output file name to the version-history log.
///
/// The log is strictly append-only; it records every database revision ever
/// written, so it must never be truncated or rewritten.
pub fn append_version_history(path: &Path, output_name: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    writeln!(file, "{}", output_name)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), content).unwrap();
        file
    }

    #[test]
    fn reads_headers_and_rows() {
        let file = write_temp("a,b,c\n1,2,3\n4,5,6\n");
        let dataset = Dataset::from_csv_path(file.path()).unwrap();

        assert_eq!(dataset.headers(), ["a", "b", "c"]);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows()[0].get("b"), Some("2"));
        assert_eq!(dataset.rows()[1].get("c"), Some("6"));
    }

    #[test]
    fn short_rows_are_padded() {
        let file = write_temp("a,b,c\n1,2\n");
        let dataset = Dataset::from_csv_path(file.path()).unwrap();
        assert_eq!(dataset.rows()[0].get("c"), Some(""));
    }

    #[test]
    fn missing_master_starts_empty() {
        let dataset = Dataset::read_master(Path::new("/nonexistent/master.csv")).unwrap();
        assert!(dataset.is_empty());
        assert!(dataset.headers().is_empty());
    }

    #[test]
    fn projection_keeps_dictionary_order() {
        let file = write_temp("c,a,b,x\n3,1,2,9\n");
        let mut dataset = Dataset::from_csv_path(file.path()).unwrap();

        dataset.project(&["a".into(), "b".into(), "c".into(), "missing".into()]);
        assert_eq!(dataset.headers(), ["a", "b", "c"]);
    }

    #[test]
    fn reorder_keeps_stragglers_at_end() {
        let file = write_temp("c,a,extra\n3,1,9\n");
        let mut dataset = Dataset::from_csv_path(file.path()).unwrap();

        dataset.reorder(&["a".into(), "b".into(), "c".into()]);
        assert_eq!(dataset.headers(), ["a", "c", "extra"]);
    }

    #[test]
    fn round_trips_through_write() {
        let file = write_temp("a,b\n1,2\n");
        let dataset = Dataset::from_csv_path(file.path()).unwrap();

        let out = tempfile::NamedTempFile::new().unwrap();
        dataset.write_csv(out.path()).unwrap();
        let back = Dataset::from_csv_path(out.path()).unwrap();

        assert_eq!(back.headers(), dataset.headers());
        assert_eq!(back.rows(), dataset.rows());
    }

    #[test]
    fn data_dictionary_column_order() {
        let file = write_temp("column_name,description\ndescription,text\noriginal_url,link\n");
        let columns = load_data_dictionary(file.path()).unwrap();
        assert_eq!(columns, ["description", "original_url"]);
    }

    #[test]
    fn version_history_appends() {
        let file = tempfile::NamedTempFile::new().unwrap();
        append_version_history(file.path(), "replications_database_a.csv").unwrap();
        append_version_history(file.path(), "replications_database_b.csv").unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        assert_eq!(
            content,
            "replications_database_a.csv\nreplications_database_b.csv\n"
        );
    }

    #[test]
    fn output_name_format() {
        let now = chrono::Local
            .with_ymd_and_hms(2025, 11, 1, 14, 30, 5)
            .unwrap();
        assert_eq!(
            timestamped_output_name(now),
            "replications_database_2025_11_01_143005.csv"
        );
    }
}
