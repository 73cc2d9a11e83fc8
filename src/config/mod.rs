//! Configuration management.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Contact email sent to providers that ask for one (Unpaywall)
    #[serde(default = "default_email")]
    pub email: String,

    /// Pause between consecutive provider calls, in milliseconds
    #[serde(default = "default_call_delay_ms")]
    pub call_delay_ms: u64,

    /// Pause after each enriched entity, in milliseconds
    #[serde(default = "default_entity_delay_ms")]
    pub entity_delay_ms: u64,

    /// Path to the data dictionary driving column projection
    #[serde(default = "default_data_dictionary")]
    pub data_dictionary: PathBuf,

    /// Path to the append-only version history log
    #[serde(default = "default_version_history")]
    pub version_history: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            email: default_email(),
            call_delay_ms: default_call_delay_ms(),
            entity_delay_ms: default_entity_delay_ms(),
            data_dictionary: default_data_dictionary(),
            version_history: default_version_history(),
        }
    }
}

impl Config {
    pub fn call_delay(&self) -> Duration {
        Duration::from_millis(self.call_delay_ms)
    }

    pub fn entity_delay(&self) -> Duration {
        Duration::from_millis(self.entity_delay_ms)
    }
}

fn default_email() -> String {
    std::env::var("UNPAYWALL_EMAIL")
        .unwrap_or_else(|_| "contact@metascienceobservatory.org".to_string())
}

fn default_call_delay_ms() -> u64 {
    200
}

fn default_entity_delay_ms() -> u64 {
    300
}

fn default_data_dictionary() -> PathBuf {
    PathBuf::from("data_dictionary.csv")
}

fn default_version_history() -> PathBuf {
    PathBuf::from("version_history.txt")
}

/// Load configuration from a file, with `REPLICATION_INGEST_*` environment
/// variables layered on top
pub fn load_config(path: &PathBuf) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path.as_path()))
        .add_source(config::Environment::with_prefix("REPLICATION_INGEST"))
        .build()?;

    settings.try_deserialize()
}

/// Get the default configuration (from env vars or defaults)
pub fn get_config() -> Config {
    Config::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.call_delay(), Duration::from_millis(200));
        assert_eq!(config.entity_delay(), Duration::from_millis(300));
        assert_eq!(config.data_dictionary, PathBuf::from("data_dictionary.csv"));
    }
}
