//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. CLI flags (not handled here)
//!
//! # Locations
//!
//! Searched in order:
//! 1. `$GITCOACH_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/gitcoach/config.toml`
//! 3. `~/.gitcoach/config.toml`
//!
//! A missing file is not an error; defaults are used.
//!
//! # Example
//!
//! ```no_run
//! use gitcoach::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! println!("Default branch: {}", config.default_branch());
//! println!("Show graph: {}", config.show_graph());
//! ```

pub mod schema;

pub use schema::{DisplayConfig, GlobalConfig};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::BranchName;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Values read from the config file
    pub global: GlobalConfig,
    /// Path to the config file (if loaded)
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed or
    /// holds invalid values.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::locate() {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let global: GlobalConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        global.validate()?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(Self {
            global,
            path: Some(path.to_path_buf()),
        })
    }

    /// First existing config file in search order.
    fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("GITCOACH_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("gitcoach/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".gitcoach/config.toml"))
            .filter(|path| path.exists())
    }

    // =========================================================================
    // Accessor methods
    // =========================================================================

    /// Branch created by `git init`.
    ///
    /// Defaults to "main". The value was validated on load.
    pub fn default_branch(&self) -> BranchName {
        self.global
            .default_branch
            .as_deref()
            .and_then(|name| BranchName::new(name).ok())
            .unwrap_or_else(BranchName::main)
    }

    /// Extra scenario file, if configured.
    pub fn scenarios_path(&self) -> Option<&Path> {
        self.global.scenarios.as_deref()
    }

    /// Whether to draw the commit graph after mutating commands.
    ///
    /// Defaults to `false` if not configured.
    pub fn show_graph(&self) -> bool {
        self.global
            .display
            .as_ref()
            .and_then(|d| d.graph)
            .unwrap_or(false)
    }

    /// Get the path to the loaded config file.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_file() {
        let config = Config::default();
        assert_eq!(config.default_branch().as_str(), "main");
        assert!(config.scenarios_path().is_none());
        assert!(!config.show_graph());
        assert!(config.loaded_from().is_none());
    }

    #[test]
    fn load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
            default_branch = "trunk"
            scenarios = "extra.toml"

            [display]
            graph = true
            "#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.default_branch().as_str(), "trunk");
        assert_eq!(config.scenarios_path(), Some(Path::new("extra.toml")));
        assert!(config.show_graph());
        assert_eq!(config.loaded_from(), Some(path.as_path()));
    }

    #[test]
    fn load_from_env() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "default_branch = \"develop\"").unwrap();

        std::env::set_var("GITCOACH_CONFIG", path.to_str().unwrap());
        let config = Config::load().unwrap();
        std::env::remove_var("GITCOACH_CONFIG");

        assert_eq!(config.default_branch().as_str(), "develop");
    }

    #[test]
    fn invalid_branch_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "default_branch = \"invalid..name\"").unwrap();

        let result = Config::from_file(&path);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
            default_branch = "main"
            unknown_field = true
            "#,
        )
        .unwrap();

        let result = Config::from_file(&path);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn missing_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let result = Config::from_file(&temp.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}
