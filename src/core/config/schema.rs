//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Validation
//!
//! Config values are validated after parsing (the default branch must be a
//! valid branch name, paths must not be empty).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// User configuration.
///
/// # Example
///
/// ```toml
/// default_branch = "main"
/// scenarios = "/home/me/.gitcoach/my-scenarios.toml"
///
/// [display]
/// graph = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Branch created by `git init` (default: "main")
    pub default_branch: Option<String>,

    /// Extra scenario file loaded next to the built-in catalog
    pub scenarios: Option<PathBuf>,

    /// Terminal display settings
    pub display: Option<DisplayConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(branch) = &self.default_branch {
            BranchName::new(branch.as_str())
                .map_err(|e| ConfigError::InvalidValue(format!("default_branch: {e}")))?;
        }

        if let Some(path) = &self.scenarios {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "scenarios path cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Display settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    /// Draw the commit graph after every mutating command
    pub graph: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GlobalConfig::default();
        assert!(config.default_branch.is_none());
        assert!(config.scenarios.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn valid_branch() {
        let config = GlobalConfig {
            default_branch: Some("trunk".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_branch() {
        let config = GlobalConfig {
            default_branch: Some("invalid..name".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_scenarios_path_rejected() {
        let config = GlobalConfig {
            scenarios: Some(PathBuf::new()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn roundtrip() {
        let config = GlobalConfig {
            default_branch: Some("main".to_string()),
            scenarios: Some(PathBuf::from("/tmp/extra.toml")),
            display: Some(DisplayConfig { graph: Some(false) }),
        };

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: GlobalConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn reject_unknown_fields() {
        let toml = r#"
            default_branch = "main"
            unknown_field = true
        "#;

        let result: Result<GlobalConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}
