//! core::config::schema
//!
//! Module configuration file schema (`buf.yaml`).
//!
//! Only the fields this action needs are typed. Lint, breaking and build
//! sections are accepted and ignored.
//!
//! # Validation
//!
//! The `version` key, when present, must be a configuration version the
//! registry understands. The `name` key must be a full module identity.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ConfigError;
use crate::core::types::ModuleIdentity;

/// File names searched for in the input directory, in order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["buf.yaml", "buf.yml"];

/// Configuration versions accepted in `buf.yaml`.
const SUPPORTED_VERSIONS: [&str; 2] = ["v1", "v1beta1"];

/// Parsed `buf.yaml`.
///
/// # Example
///
/// ```yaml
/// version: v1
/// name: buf.build/acme/weather
/// deps:
///   - buf.build/googleapis/googleapis
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct BufYaml {
    /// Configuration version (`v1`, `v1beta1`).
    pub version: Option<String>,

    /// Module identity, `remote/owner/repository`.
    pub name: Option<String>,

    /// Module dependencies.
    pub deps: Vec<String>,
}

impl BufYaml {
    /// Locate `buf.yaml` in `dir`.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Load and validate the config file in `dir`.
    ///
    /// # Errors
    ///
    /// - `ModuleConfigNotFound` if `dir` has no config file
    /// - `ParseError` if the file is not valid YAML for this schema
    /// - `InvalidValue` for an unsupported `version`
    pub fn load(dir: &Path) -> Result<(Self, PathBuf), ConfigError> {
        let path =
            Self::find(dir).ok_or_else(|| ConfigError::ModuleConfigNotFound(dir.to_path_buf()))?;
        let contents = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
            path: path.clone(),
            source: e,
        })?;
        let config = Self::parse(&contents).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError {
                path: path.clone(),
                message,
            },
            other => other,
        })?;
        Ok((config, path))
    }

    /// Parse and validate config file contents.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: BufYaml =
            serde_yaml::from_str(contents).map_err(|e| ConfigError::ParseError {
                path: PathBuf::new(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(version) = &self.version {
            if !SUPPORTED_VERSIONS.contains(&version.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "unsupported config version '{}', must be one of: {}",
                    version,
                    SUPPORTED_VERSIONS.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// The module identity named by this config.
    ///
    /// # Errors
    ///
    /// - `MissingModuleName` if `name` is absent
    /// - `InvalidModuleName` if it is not `remote/owner/repository`
    pub fn module_identity(&self) -> Result<ModuleIdentity, ConfigError> {
        let name = self
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .ok_or(ConfigError::MissingModuleName)?;
        Ok(ModuleIdentity::parse(name)?)
    }
}
