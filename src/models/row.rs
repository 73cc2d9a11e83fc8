//! Dataset rows and the original/replication entity split.

use std::collections::HashMap;

use crate::models::record::is_blank;

/// One of the two citation halves tracked per dataset row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Original,
    Replication,
}

impl Entity {
    pub const ALL: [Entity; 2] = [Entity::Original, Entity::Replication];

    /// Column-name prefix for this entity.
    pub fn prefix(&self) -> &'static str {
        match self {
            Entity::Original => "original",
            Entity::Replication => "replication",
        }
    }

    /// Full column name for a field of this entity, e.g. `original_year`.
    pub fn column(&self, field: &str) -> String {
        format!("{}_{}", self.prefix(), field)
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// One input or master record: a header-keyed cell map.
///
/// Rows read from CSV carry a cell for every header column (possibly empty),
/// matching how a dataframe row exposes every column of its frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: HashMap<String, String>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from (column, value) pairs; handy in tests.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        self.cells.insert(column.to_string(), value.into());
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    /// Whether a cell is missing, empty, whitespace, or a "NaN" artifact.
    pub fn is_blank(&self, column: &str) -> bool {
        self.get(column).map_or(true, is_blank)
    }

    /// Cell value, with blank artifacts collapsed to `None`.
    pub fn value(&self, column: &str) -> Option<&str> {
        self.get(column).filter(|v| !is_blank(v))
    }

    /// Uniqueness key against the master dataset: exact triple of
    /// original URL, replication URL, and description.
    pub fn dedup_key(&self) -> (String, String, String) {
        let cell = |c: &str| self.get(c).unwrap_or_default().to_string();
        (
            cell("original_url"),
            cell("replication_url"),
            cell("description"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_columns() {
        assert_eq!(Entity::Original.column("year"), "original_year");
        assert_eq!(Entity::Replication.column("url"), "replication_url");
    }

    #[test]
    fn blank_cells() {
        let row = Row::from_pairs([("a", "x"), ("b", ""), ("c", "NaN"), ("d", "  ")]);
        assert!(!row.is_blank("a"));
        assert!(row.is_blank("b"));
        assert!(row.is_blank("c"));
        assert!(row.is_blank("d"));
        assert!(row.is_blank("missing"));
        assert_eq!(row.value("c"), None);
    }

    #[test]
    fn dedup_key_uses_triple() {
        let row = Row::from_pairs([
            ("original_url", "http://doi.org/10.1/a"),
            ("replication_url", "http://doi.org/10.1/b"),
            ("description", "effect replicates"),
            ("discipline", "psychology"),
        ]);
        assert_eq!(
            row.dedup_key(),
            (
                "http://doi.org/10.1/a".to_string(),
                "http://doi.org/10.1/b".to_string(),
                "effect replicates".to_string()
            )
        );
    }
}
