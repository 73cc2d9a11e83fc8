//! # Replication Ingest
//!
//! Ingestion engine for the replications database: enriches citation pairs
//! (original study, replication study) with bibliographic metadata from
//! multiple external providers, then appends deduplicated rows to the
//! master database CSV.
//!
//! ## Architecture
//!
//! - [`models`]: core data structures (MetadataRecord, Row, Entity)
//! - [`sources`]: metadata provider plugins with a trait-based architecture
//! - [`enrich`]: the waterfall merge engine driving providers in priority order
//! - [`pipeline`]: per-row reconciliation, sanity checks, dedup, and append
//! - [`dataset`]: CSV I/O, data dictionary projection, version history
//! - [`utils`]: DOI normalization, HTTP client, citation HTML, PDF retrieval
//! - [`config`]: configuration management

pub mod config;
pub mod dataset;
pub mod enrich;
pub mod models;
pub mod pipeline;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use enrich::MergeEngine;
pub use models::{Entity, MetadataRecord, Row};
pub use sources::{Source, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
