//! Engine configuration.
//!
//! Defaults reproduce the historical behaviour: a substitution variable
//! reassigned with another type keeps the newest type. Files are YAML unless
//! the extension is `.json`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::diagnostics::SnippetError;

/// Limit on parse-tree levels, not on parentheses. One level of
/// parentheses in an expression costs about 13 tree levels, so the default
/// admits roughly 150 nested parentheses.
pub const DEFAULT_MAX_NESTING: usize = 2048;

/// What happens when one substitution variable is given two types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Store the newest type and warn.
    #[default]
    KeepLast,
    /// Keep the first type and warn.
    KeepFirst,
    /// Fail the statement.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub conflict_policy: ConflictPolicy,
    /// Deepest parse tree the walker accepts, counted in tree levels.
    pub max_nesting: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::default(),
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

impl EngineConfig {
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, SnippetError> {
        let config: Self = serde_yaml::from_str(text).map_err(|e| SnippetError::Config {
            message: e.to_string(),
        })?;
        config.validate()
    }

    pub fn from_json_str(text: &str) -> Result<Self, SnippetError> {
        let config: Self = serde_json::from_str(text).map_err(|e| SnippetError::Config {
            message: e.to_string(),
        })?;
        config.validate()
    }

    pub fn from_path(path: &Path) -> Result<Self, SnippetError> {
        let text = fs::read_to_string(path).map_err(|source| SnippetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    /// Rejects settings the engine cannot run with.
    pub fn validate(self) -> Result<Self, SnippetError> {
        if self.max_nesting == 0 {
            return Err(SnippetError::Config {
                message: "max_nesting must be at least 1".to_string(),
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = EngineConfig::from_yaml_str("conflict_policy: keep_first\n").unwrap();
        assert_eq!(config.conflict_policy, ConflictPolicy::KeepFirst);
        assert_eq!(config.max_nesting, DEFAULT_MAX_NESTING);
    }

    #[test]
    fn test_json_config() {
        let config =
            EngineConfig::from_json_str(r#"{"conflict_policy":"reject","max_nesting":64}"#).unwrap();
        assert_eq!(config.conflict_policy, ConflictPolicy::Reject);
        assert_eq!(config.max_nesting, 64);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = EngineConfig::from_yaml_str("policy: keep_first\n").unwrap_err();
        assert!(matches!(err, SnippetError::Config { .. }));
    }

    #[test]
    fn test_zero_nesting_is_rejected() {
        let err = EngineConfig::from_yaml_str("max_nesting: 0\n").unwrap_err();
        assert!(matches!(err, SnippetError::Config { .. }));
    }
}
