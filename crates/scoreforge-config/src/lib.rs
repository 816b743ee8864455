//! Configuration for ScoreForge sessions.
//!
//! Load engine configuration from TOML or YAML to switch assertion modes,
//! enable constraint match tracking and override constraint weights without
//! code changes.
//!
//! # Examples
//!
//! ```
//! use scoreforge_config::{EngineConfig, EnvironmentMode};
//!
//! let config = EngineConfig::from_toml_str(r#"
//!     environment_mode = "full_assert"
//!     constraint_match_enabled = true
//!
//!     [constraint_weights]
//!     "Required skill" = "1hard/0soft"
//!     "Undesired day" = "0hard/5soft"
//! "#).unwrap();
//!
//! assert_eq!(config.environment_mode, EnvironmentMode::FullAssert);
//! assert_eq!(config.constraint_weights.len(), 2);
//! ```
//!
//! Fall back to defaults when the file is missing:
//!
//! ```
//! use scoreforge_config::EngineConfig;
//!
//! let config = EngineConfig::load("engine.toml").unwrap_or_default();
//! assert!(!config.constraint_match_enabled);
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
mod tests;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine configuration for one or more sessions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct EngineConfig {
    /// Assertions performed after every flush.
    pub environment_mode: EnvironmentMode,

    /// Record individual constraint matches so sessions can explain scores.
    pub constraint_match_enabled: bool,

    /// Weight overrides by constraint name, in the score's textual form
    /// (e.g. `"0hard/-3soft"`).
    pub constraint_weights: BTreeMap<String, String>,

    /// Initial capacity of the fact change queue.
    pub event_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            environment_mode: EnvironmentMode::default(),
            constraint_match_enabled: false,
            constraint_weights: BTreeMap::new(),
            event_queue_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses and validates configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_environment_mode(mut self, mode: EnvironmentMode) -> Self {
        self.environment_mode = mode;
        self
    }

    pub fn with_constraint_match_enabled(mut self, enabled: bool) -> Self {
        self.constraint_match_enabled = enabled;
        self
    }

    /// Adds a weight override in textual score form.
    pub fn with_constraint_weight(
        mut self,
        constraint: impl Into<String>,
        weight: impl Into<String>,
    ) -> Self {
        self.constraint_weights
            .insert(constraint.into(), weight.into());
        self
    }

    pub fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity;
        self
    }

    /// Checks invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = self
            .constraint_weights
            .keys()
            .find(|name| name.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "constraint weight override has a blank constraint name: {:?}",
                name
            )));
        }
        if let Some((name, _)) = self
            .constraint_weights
            .iter()
            .find(|(_, weight)| weight.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "constraint weight override for {} is empty",
                name
            )));
        }
        Ok(())
    }
}

/// How much self-checking a session performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentMode {
    /// No checks beyond what propagation needs.
    #[default]
    Production,

    /// After every flush, verify that every node queue drained.
    FastAssert,

    /// After every flush, also rebuild the score from scratch on a clone of
    /// the working solution and fail on any difference.
    FullAssert,
}

impl EnvironmentMode {
    pub fn is_asserted(self) -> bool {
        !matches!(self, EnvironmentMode::Production)
    }

    pub fn is_fully_asserted(self) -> bool {
        matches!(self, EnvironmentMode::FullAssert)
    }
}
