//! core::config::lock
//!
//! Dependency lock file schema (`buf.lock`).
//!
//! The lock file pins every dependency named in `buf.yaml` to a registry
//! commit. Those pins are pushed with the module so the registry resolves
//! the same dependency versions the module was built against.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::ConfigError;

/// File name of the lock file in the module directory.
pub const LOCK_FILE_NAME: &str = "buf.lock";

/// Parsed `buf.lock`.
///
/// # Example
///
/// ```yaml
/// version: v1
/// deps:
///   - remote: buf.build
///     owner: googleapis
///     repository: googleapis
///     commit: 62f35d8aed1149c291d606d958a7ce32
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct BufLock {
    pub version: Option<String>,
    pub deps: Vec<ModulePin>,
}

/// A dependency pinned to a registry commit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModulePin {
    pub remote: String,
    pub owner: String,
    pub repository: String,
    pub commit: String,
    /// Content digest recorded by newer lock files.
    #[serde(default)]
    pub digest: Option<String>,
}

impl ModulePin {
    /// `remote/owner/repository`, without the commit.
    pub fn module_name(&self) -> String {
        format!("{}/{}/{}", self.remote, self.owner, self.repository)
    }
}

impl BufLock {
    /// Load `buf.lock` from `dir`. A missing lock file means no dependencies.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(LOCK_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
            path: path.clone(),
            source: e,
        })?;
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// The pin for `module_name` (`remote/owner/repository`), if locked.
    pub fn pin_for(&self, module_name: &str) -> Option<&ModulePin> {
        self.deps.iter().find(|pin| pin.module_name() == module_name)
    }
}
