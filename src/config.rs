//! Provenance graph configuration, persisted as TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult, GraphError};
use crate::graph::GraphFormat;
use crate::provenance::GraphResult;
use crate::vocab::{PROVIO_NS, PROVIO_PREFIX};

/// Periodic flush-and-reload settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Number of statement writes between checkpoint cycles.
    pub period: u64,
    /// File the graph is serialized to and re-parsed from.
    pub path: PathBuf,
}

/// Configuration for a [`ProvenanceGraph`](crate::provenance::ProvenanceGraph).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceConfig {
    /// Version label; stored as `v<label>`.
    #[serde(default = "default_version")]
    pub version: String,
    /// Write the version marker and belongs-to-version statements.
    #[serde(default = "default_true")]
    pub versioning: bool,
    /// Suffix record and metric names with a per-instance identifier.
    #[serde(default = "default_true")]
    pub enable_id: bool,
    /// Fixed identifier; a random token is generated when unset.
    #[serde(default)]
    pub identifier: Option<String>,
    /// Serialization format name.
    #[serde(default = "default_format")]
    pub format: String,
    /// Namespace for minted IRIs.
    #[serde(default = "default_base_uri")]
    pub base_uri: String,
    /// Prefix bound to `base_uri` when serializing.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Existing graph merged into the store at construction.
    #[serde(default)]
    pub load_from: Option<PathBuf>,
    /// Directory of category files for the type registry.
    #[serde(default)]
    pub registry_dir: Option<PathBuf>,
    /// Periodic checkpointing; mutually exclusive with `enable_id`.
    #[serde(default)]
    pub checkpoint: Option<CheckpointConfig>,
}

fn default_version() -> String {
    "1.0".into()
}
fn default_true() -> bool {
    true
}
fn default_format() -> String {
    GraphFormat::Turtle.name().into()
}
fn default_base_uri() -> String {
    PROVIO_NS.into()
}
fn default_prefix() -> String {
    PROVIO_PREFIX.into()
}

impl Default for ProvenanceConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            versioning: true,
            enable_id: true,
            identifier: None,
            format: default_format(),
            base_uri: default_base_uri(),
            prefix: default_prefix(),
            load_from: None,
            registry_dir: None,
            checkpoint: None,
        }
    }
}

impl ProvenanceConfig {
    /// Checkpoint every `period` writes to `path`, with identifier scoping off.
    pub fn checkpointed(period: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            enable_id: false,
            checkpoint: Some(CheckpointConfig {
                period,
                path: path.into(),
            }),
            ..Default::default()
        }
    }

    /// Check the configuration and resolve the serialization format.
    pub fn validate(&self) -> GraphResult<GraphFormat> {
        let format: GraphFormat = self.format.parse()?;

        if let Some(checkpoint) = &self.checkpoint {
            if self.enable_id {
                return Err(GraphError::ConfigConflict);
            }
            if checkpoint.period == 0 {
                return Err(GraphError::InvalidConfig {
                    message: "checkpoint period must be at least 1".into(),
                });
            }
        }

        if self.base_uri.is_empty() {
            return Err(GraphError::InvalidConfig {
                message: "base_uri must not be empty".into(),
            });
        }
        if self.version.trim().is_empty() {
            return Err(GraphError::InvalidConfig {
                message: "version label must not be empty".into(),
            });
        }

        Ok(format)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn defaults_validate() {
        let config = ProvenanceConfig::default();
        assert_eq!(config.validate().unwrap(), GraphFormat::Turtle);
        assert!(config.enable_id);
        assert_eq!(config.version, "1.0");
    }

    #[test]
    fn id_and_checkpoint_conflict() {
        let config = ProvenanceConfig {
            enable_id: true,
            ..ProvenanceConfig::checkpointed(10, "prov.ttl")
        };
        assert!(matches!(config.validate(), Err(GraphError::ConfigConflict)));
    }

    #[test]
    fn zero_period_rejected() {
        let config = ProvenanceConfig::checkpointed(0, "prov.ttl");
        assert!(matches!(
            config.validate(),
            Err(GraphError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn unknown_format_rejected() {
        let config = ProvenanceConfig {
            format: "json-ld".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GraphError::Store(StoreError::UnsupportedFormat { .. }))
        ));
    }

    #[test]
    fn toml_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("conf/provio.toml");
        let config = ProvenanceConfig {
            version: "3.0".into(),
            format: "ntriples".into(),
            ..ProvenanceConfig::checkpointed(25, "/tmp/periodic.nt")
        };
        config.save(&path).unwrap();

        let loaded = ProvenanceConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: ProvenanceConfig = toml::from_str("version = \"2.0\"\nenable_id = false\n").unwrap();
        assert_eq!(config.version, "2.0");
        assert!(!config.enable_id);
        assert!(config.versioning);
        assert_eq!(config.format, "turtle");
        assert!(config.checkpoint.is_none());
    }
}
