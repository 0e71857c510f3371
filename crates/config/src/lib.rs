#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for cmeval
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/cmeval/config.toml)
//! - CLI flags (applied by the caller on top of the loaded config)

pub mod core;

pub use self::core::{EvalConfig, LimitsConfig, SecurityConfig};

use cmeval_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub eval: EvalConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let home_dir = dirs::home_dir().ok_or_else(|| ConfigError::NotFound {
            path: "home directory".to_string(),
        })?;
        Ok(home_dir.join(".config").join("cmeval").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|_| ConfigError::NotFound {
            path: path.display().to_string(),
        })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load the default config file if it exists, otherwise defaults.
    ///
    /// # Errors
    ///
    /// Returns an error only when the file exists but cannot be parsed.
    pub fn load_or_default() -> Result<Self, Error> {
        match Self::default_path() {
            Ok(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), Error> {
        if self.limits.max_genex_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.max_genex_depth".to_string(),
                message: "must be at least 1".to_string(),
            }
            .into());
        }
        if self.limits.max_include_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.max_include_depth".to_string(),
                message: "must be at least 1".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
