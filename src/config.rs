//! Engine configuration
//!
//! Configuration is read once when the engine is built and never changes
//! afterwards. Every field has a default, so an empty JSON object is a
//! valid configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration is not valid JSON for this schema
    #[error("Invalid config format: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configuration parsed but holds an unusable value
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// How the inheritance join treats inheritor rows missing from the root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Skip the row and log it at debug level
    #[default]
    Drop,
    /// Abort the enumeration
    Error,
}

/// Union merge settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Source count from which the merge switches from a linear scan to a
    /// binary heap (default: 8)
    #[serde(default = "default_heap_threshold")]
    pub heap_threshold: usize,
}

/// Inheritance join settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JoinConfig {
    /// Orphan inheritor row handling (default: drop)
    #[serde(default)]
    pub orphan_policy: OrphanPolicy,
}

/// Compiler settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationConfig {
    /// Reuse compiled plans across enumerations of the same plan
    /// (default: true)
    #[serde(default = "default_cache_plans")]
    pub cache_plans: bool,

    /// Maximum number of cached plans (default: 256)
    #[serde(default = "default_max_cached_plans")]
    pub max_cached_plans: usize,
}

/// Execution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Maximum nesting of correlated evaluation scopes (default: 32)
    #[serde(default = "default_max_apply_depth")]
    pub max_apply_depth: usize,
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub merge: MergeConfig,

    #[serde(default)]
    pub join: JoinConfig,

    #[serde(default)]
    pub compilation: CompilationConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,
}

fn default_heap_threshold() -> usize {
    8
}

fn default_cache_plans() -> bool {
    true
}

fn default_max_cached_plans() -> usize {
    256
}

fn default_max_apply_depth() -> usize {
    32
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            heap_threshold: default_heap_threshold(),
        }
    }
}

impl Default for CompilationConfig {
    fn default() -> Self {
        Self {
            cache_plans: default_cache_plans(),
            max_cached_plans: default_max_cached_plans(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_apply_depth: default_max_apply_depth(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Rejects values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.merge.heap_threshold == 0 {
            return Err(ConfigError::Invalid(
                "merge.heap_threshold must be positive".into(),
            ));
        }
        if self.execution.max_apply_depth == 0 {
            return Err(ConfigError::Invalid(
                "execution.max_apply_depth must be positive".into(),
            ));
        }
        if self.compilation.cache_plans && self.compilation.max_cached_plans == 0 {
            return Err(ConfigError::Invalid(
                "compilation.max_cached_plans must be positive when caching".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.merge.heap_threshold, 8);
        assert_eq!(config.join.orphan_policy, OrphanPolicy::Drop);
        assert!(config.compilation.cache_plans);
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_json_str(
            r#"{ "join": { "orphan_policy": "error" }, "execution": { "max_apply_depth": 4 } }"#,
        )
        .unwrap();
        assert_eq!(config.join.orphan_policy, OrphanPolicy::Error);
        assert_eq!(config.execution.max_apply_depth, 4);
        assert_eq!(config.merge.heap_threshold, 8);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_json_str(r#"{ "merge": { "heap_threshold": 0 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_json_str("not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "compilation": {{ "cache_plans": false }} }}"#).unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert!(!config.compilation.cache_plans);
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_file("/nonexistent/relcore.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_round_trip_serialization() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
    }
}
