//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`GitSha`] - Full 40-character lowercase git commit SHA
//! - [`CommitId`] - Opaque registry-assigned commit identifier
//! - [`ModuleIdentity`] - `remote/owner/repository` module name
//! - [`Secret`] - Credential that never prints itself
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use bufpush::core::types::{GitSha, ModuleIdentity};
//!
//! let sha = GitSha::new("0123456789abcdef0123456789abcdef01234567").unwrap();
//! let module = ModuleIdentity::parse("buf.build/acme/weather").unwrap();
//!
//! assert_eq!(module.owner(), "acme");
//! assert!(GitSha::new("not-a-sha").is_err());
//! assert!(GitSha::from_tag(sha.as_str()).is_some());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid git commit sha: {0}")]
    InvalidGitSha(String),

    #[error("invalid commit id: {0}")]
    InvalidCommitId(String),

    #[error("invalid module identity {0:?}: expected remote/owner/repository")]
    InvalidModuleIdentity(String),
}

/// Length of a hex-encoded SHA-1 git commit id.
const GIT_SHA_LEN: usize = 40;

/// A full git commit SHA: exactly 40 lowercase hexadecimal characters.
///
/// Unlike a general object id this is never normalized. Registry tags are
/// compared byte for byte, so `ABC...` is simply not a git SHA tag.
///
/// # Example
///
/// ```
/// use bufpush::core::types::GitSha;
///
/// let sha = GitSha::new("beefcafebeefcafebeefcafebeefcafebeefcafe").unwrap();
/// assert_eq!(sha.as_str().len(), 40);
///
/// assert!(GitSha::new("BEEFCAFEBEEFCAFEBEEFCAFEBEEFCAFEBEEFCAFE").is_err());
/// assert!(GitSha::new("beefcafe").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GitSha(String);

impl GitSha {
    /// Create a new validated git SHA.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidGitSha` unless the value is exactly 40
    /// lowercase hex characters.
    pub fn new(sha: impl Into<String>) -> Result<Self, TypeError> {
        let sha = sha.into();
        if !is_git_sha(&sha) {
            return Err(TypeError::InvalidGitSha(sha));
        }
        Ok(Self(sha))
    }

    /// Interpret a registry tag as a git SHA, if it has that shape.
    ///
    /// This is a syntactic check only. Whether the commit exists in the
    /// repository is for the commit comparator to find out.
    pub fn from_tag(tag: &str) -> Option<Self> {
        is_git_sha(tag).then(|| Self(tag.to_string()))
    }

    /// Get the SHA as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Returns true if `s` matches `^[0-9a-f]{40}$`.
pub fn is_git_sha(s: &str) -> bool {
    s.len() == GIT_SHA_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl TryFrom<String> for GitSha {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<GitSha> for String {
    fn from(sha: GitSha) -> Self {
        sha.0
    }
}

impl AsRef<str> for GitSha {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GitSha {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registry commit identifier.
///
/// Opaque to this crate; the registry assigns it and we only echo it back
/// in outputs and tag requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitId(String);

impl CommitId {
    /// Create a commit id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidCommitId` if the id is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(TypeError::InvalidCommitId("commit id cannot be empty".into()));
        }
        Ok(Self(id))
    }

    /// Get the commit id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CommitId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CommitId> for String {
    fn from(id: CommitId) -> Self {
        id.0
    }
}

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The canonical identity of a module: `remote/owner/repository`.
///
/// # Example
///
/// ```
/// use bufpush::core::types::{CommitId, ModuleIdentity};
///
/// let module = ModuleIdentity::parse("buf.build/acme/weather").unwrap();
/// assert_eq!(module.remote(), "buf.build");
/// assert_eq!(module.reference("dev"), "buf.build/acme/weather:dev");
///
/// let commit = CommitId::new("c1").unwrap();
/// assert_eq!(module.commit_url(&commit), "https://buf.build/acme/weather/tree/c1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleIdentity {
    remote: String,
    owner: String,
    repository: String,
}

impl ModuleIdentity {
    /// Create an identity from its parts.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidModuleIdentity` if any part is empty or
    /// contains a `/`.
    pub fn new(
        remote: impl Into<String>,
        owner: impl Into<String>,
        repository: impl Into<String>,
    ) -> Result<Self, TypeError> {
        let identity = Self {
            remote: remote.into(),
            owner: owner.into(),
            repository: repository.into(),
        };
        let parts = [&identity.remote, &identity.owner, &identity.repository];
        if parts.iter().any(|p| p.is_empty() || p.contains('/')) {
            return Err(TypeError::InvalidModuleIdentity(identity.to_string()));
        }
        Ok(identity)
    }

    /// Parse `remote/owner/repository`.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        match parts.as_slice() {
            [remote, owner, repository] => Self::new(*remote, *owner, *repository)
                .map_err(|_| TypeError::InvalidModuleIdentity(s.to_string())),
            _ => Err(TypeError::InvalidModuleIdentity(s.to_string())),
        }
    }

    /// The registry host, e.g. `buf.build`.
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// The owning user or organization.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The repository name.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// `owner/repository`, the form the registry looks repositories up by.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repository)
    }

    /// `remote/owner/repository:reference`.
    pub fn reference(&self, reference: &str) -> String {
        format!("{}:{}", self, reference)
    }

    /// Web URL for browsing a commit of this module.
    pub fn commit_url(&self, commit: &CommitId) -> String {
        format!("https://{}/tree/{}", self, commit)
    }
}

impl std::fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.remote, self.owner, self.repository)
    }
}

impl std::str::FromStr for ModuleIdentity {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A credential. `Debug` and `Display` never show the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a credential.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the raw value, for building request headers only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<redacted>")
    }
}
