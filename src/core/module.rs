//! core::module
//!
//! Reading a module from a local directory.
//!
//! A module is the unit that gets pushed: its identity (from `buf.yaml`)
//! plus a bundle of schema files. The registry content-addresses what it
//! receives, so the bundle is built deterministically: files are sorted
//! by their slash-separated relative path.
//!
//! # Example
//!
//! ```no_run
//! use bufpush::core::module::Module;
//! use std::path::Path;
//!
//! let module = Module::read(Path::new("proto")).unwrap();
//! println!("{} ({} files, {})", module.identity, module.bundle.len(), module.bundle.digest());
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use walkdir::WalkDir;

use super::config::{BufLock, BufYaml, ConfigError, ModulePin};
use super::types::ModuleIdentity;

/// Documentation files, in order of preference.
const DOCUMENTATION_FILES: [&str; 2] = ["buf.md", "README.md"];

const LICENSE_FILE: &str = "LICENSE";

/// Errors from reading a module.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("module has no files")]
    NoFiles,

    #[error("dependency {0} is not pinned in buf.lock")]
    UnlockedDependency(String),

    #[error("'{0}' is not valid UTF-8")]
    NotUtf8(PathBuf),

    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to walk '{path}': {message}")]
    Walk { path: PathBuf, message: String },
}

/// One `.proto` file of a module bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFile {
    /// Path relative to the module root, `/`-separated.
    pub path: String,
    pub content: Vec<u8>,
}

/// Module documentation and the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Documentation {
    pub path: String,
    pub content: String,
}

/// What gets pushed: the schema files, sorted by path, plus the
/// dependency pins, documentation and license that travel with them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleBundle {
    files: Vec<ModuleFile>,
    dependencies: Vec<ModulePin>,
    documentation: Option<Documentation>,
    license: Option<String>,
}

impl ModuleBundle {
    /// Build a bundle from files in any order.
    pub fn new(mut files: Vec<ModuleFile>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files.dedup_by(|a, b| a.path == b.path);
        Self {
            files,
            ..Self::default()
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<ModulePin>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_documentation(
        mut self,
        path: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        self.documentation = Some(Documentation {
            path: path.into(),
            content: content.into(),
        });
        self
    }

    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.license = Some(license.into());
        self
    }

    /// The files in path order.
    pub fn files(&self) -> &[ModuleFile] {
        &self.files
    }

    /// Dependency pins, in `buf.lock` order.
    pub fn dependencies(&self) -> &[ModulePin] {
        &self.dependencies
    }

    pub fn documentation(&self) -> Option<&Documentation> {
        self.documentation.as_ref()
    }

    pub fn license(&self) -> Option<&str> {
        self.license.as_deref()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of `.proto` files.
    pub fn proto_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.path.ends_with(".proto"))
            .count()
    }

    /// Manifest digest: sha256 over `<file sha256 hex>  <path>\n` lines,
    /// followed by one line per dependency pin, documentation and license.
    ///
    /// Two bundles with identical contents always share a digest,
    /// independent of the order files were read in.
    pub fn digest(&self) -> String {
        let mut manifest = Sha256::new();
        for file in &self.files {
            let file_digest = hex::encode(Sha256::digest(&file.content));
            manifest.update(format!("{}  {}\n", file_digest, file.path).as_bytes());
        }
        for pin in &self.dependencies {
            manifest.update(format!("dep {}:{}\n", pin.module_name(), pin.commit).as_bytes());
        }
        if let Some(doc) = &self.documentation {
            let doc_digest = hex::encode(Sha256::digest(doc.content.as_bytes()));
            manifest.update(format!("doc {}  {}\n", doc_digest, doc.path).as_bytes());
        }
        if let Some(license) = &self.license {
            let license_digest = hex::encode(Sha256::digest(license.as_bytes()));
            manifest.update(format!("license {}\n", license_digest).as_bytes());
        }
        format!("sha256:{}", hex::encode(manifest.finalize()))
    }
}

/// A module read from disk.
#[derive(Debug, Clone)]
pub struct Module {
    pub identity: ModuleIdentity,
    pub bundle: ModuleBundle,
    /// Directory the module was read from.
    pub root: PathBuf,
}

impl Module {
    /// Read the module rooted at `dir`.
    ///
    /// # Errors
    ///
    /// - `Config` if `buf.yaml` is missing, unparseable, or lacks a name,
    ///   or `buf.lock` is unparseable
    /// - `UnlockedDependency` if a `buf.yaml` dependency has no pin
    /// - `NoFiles` if the directory holds no `.proto` files
    /// - `Read` / `Walk` / `NotUtf8` on I/O failure
    pub fn read(dir: &Path) -> Result<Self, ModuleError> {
        if !dir.is_dir() {
            return Err(ConfigError::ModuleConfigNotFound(dir.to_path_buf()).into());
        }
        let (config, _) = BufYaml::load(dir)?;
        let identity = config.module_identity()?;
        let lock = BufLock::load(dir)?;
        check_pinned(&config, &lock)?;

        let bundle = read_bundle(dir)?.with_dependencies(lock.deps);
        if bundle.proto_count() == 0 {
            return Err(ModuleError::NoFiles);
        }
        Ok(Self {
            identity,
            bundle,
            root: dir.to_path_buf(),
        })
    }
}

/// Every dependency named in `buf.yaml` must be pinned by `buf.lock`.
fn check_pinned(config: &BufYaml, lock: &BufLock) -> Result<(), ModuleError> {
    for dep in &config.deps {
        // `remote/owner/repository[:reference]`
        let name = dep.split(':').next().unwrap_or_default().trim();
        if lock.pin_for(name).is_none() {
            return Err(ModuleError::UnlockedDependency(dep.clone()));
        }
    }
    Ok(())
}

/// Collect `.proto` files (recursively), the documentation and the license.
pub fn read_bundle(dir: &Path) -> Result<ModuleBundle, ModuleError> {
    let mut files = Vec::new();

    let walker = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
    for entry in walker {
        let entry = entry.map_err(|e| ModuleError::Walk {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("proto") {
            continue;
        }
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        files.push(ModuleFile {
            path: to_slash_path(relative),
            content: read_file(path)?,
        });
    }

    let mut bundle = ModuleBundle::new(files);
    if let Some(name) = DOCUMENTATION_FILES.iter().find(|n| dir.join(n).is_file()) {
        bundle = bundle.with_documentation(*name, read_text(&dir.join(name))?);
    }
    let license = dir.join(LICENSE_FILE);
    if license.is_file() {
        bundle = bundle.with_license(read_text(&license)?);
    }
    Ok(bundle)
}

fn read_text(path: &Path) -> Result<String, ModuleError> {
    String::from_utf8(read_file(path)?).map_err(|_| ModuleError::NotUtf8(path.to_path_buf()))
}

fn read_file(path: &Path) -> Result<Vec<u8>, ModuleError> {
    fs::read(path).map_err(|e| ModuleError::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
