//! Configuration schema (lineafold.toml)

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::model::keys;

/// Property keys that may appear in lineage responses
///
/// Any stored property not listed here is dropped when a vertex is turned into a
/// response vertex. Storage is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeWhitelist {
    /// Allowed property keys
    pub attributes: BTreeSet<String>,
}

impl Default for AttributeWhitelist {
    fn default() -> Self {
        Self::from_keys([
            keys::TABLE_DISPLAY_NAME.to_string(),
            keys::SCHEMA_DISPLAY_NAME.to_string(),
            keys::entity_property("qualifiedName"),
            keys::entity_property("description"),
            keys::entity_property("dataType"),
        ])
    }
}

impl AttributeWhitelist {
    /// Create a whitelist from a list of keys
    pub fn from_keys(keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            attributes: keys.into_iter().collect(),
        }
    }

    /// Whitelist that lets nothing through
    pub fn empty() -> Self {
        Self {
            attributes: BTreeSet::new(),
        }
    }

    /// Check if a property key may be returned to callers
    pub fn allows(&self, key: &str) -> bool {
        self.attributes.contains(key)
    }
}

/// Bounds for the buffer-graph searches done while consolidating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    /// Max hops from a column to its enclosing table or data file
    #[serde(default = "default_table_search_depth")]
    pub table_search_depth: usize,

    /// Max hops from a column to its enclosing schema or folder
    #[serde(default = "default_schema_search_depth")]
    pub schema_search_depth: usize,
}

fn default_table_search_depth() -> usize {
    2
}

fn default_schema_search_depth() -> usize {
    3
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            table_search_depth: default_table_search_depth(),
            schema_search_depth: default_schema_search_depth(),
        }
    }
}

/// Where the CLI keeps graph documents between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one `<graph>.json` document per named graph
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".lineafold")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Response attribute whitelist
    #[serde(default)]
    pub whitelist: AttributeWhitelist,

    /// Consolidation search bounds
    #[serde(default)]
    pub consolidation: ConsolidationConfig,

    /// Persistence settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            whitelist: AttributeWhitelist::default(),
            consolidation: ConsolidationConfig::default(),
            storage: StorageConfig::default(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// State directory resolved against the project root
    pub fn state_dir(&self) -> PathBuf {
        if self.storage.state_dir.is_absolute() {
            self.storage.state_dir.clone()
        } else {
            self.project_root.join(&self.storage.state_dir)
        }
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.consolidation.table_search_depth, 2);
        assert_eq!(config.consolidation.schema_search_depth, 3);
        assert!(config.whitelist.allows("tableDisplayName"));
        assert!(!config.whitelist.allows("nodeId"));
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [whitelist]
            attributes = ["vepropowner"]

            [consolidation]
            table_search_depth = 4
            "#,
        )
        .unwrap();

        assert!(config.whitelist.allows("vepropowner"));
        assert!(!config.whitelist.allows("tableDisplayName"));
        assert_eq!(config.consolidation.table_search_depth, 4);
        assert_eq!(config.consolidation.schema_search_depth, 3);
        assert_eq!(config.storage.state_dir, PathBuf::from(".lineafold"));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let err = Config::from_toml("[consolidation]\ntable_search_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn config_toml_roundtrip() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.whitelist, parsed.whitelist);
        assert_eq!(config.consolidation, parsed.consolidation);
    }

    #[test]
    fn relative_state_dir_resolves_against_project_root() {
        let mut config = Config::default();
        config.project_root = PathBuf::from("/srv/lineage");
        assert_eq!(config.state_dir(), PathBuf::from("/srv/lineage/.lineafold"));
    }
}
