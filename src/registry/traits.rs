//! registry::traits
//!
//! Registry client trait and its request/response types.
//!
//! # Design
//!
//! The registry reports outcomes with RPC error codes, and three of them
//! carry meaning for the push logic:
//!
//! - `NotFound`: the track (or repository, or commit) does not exist
//! - `AlreadyExists`: identical content is already stored, or a tag name
//!   is taken
//! - `FailedPrecondition`: the track exists but has no commits yet
//!
//! Each is its own [`RegistryError`] variant so call sites must decide
//! what every one of them means there. They are never folded into a
//! generic error.

use async_trait::async_trait;
use thiserror::Error;

use crate::core::module::ModuleBundle;
use crate::core::types::{CommitId, ModuleIdentity};

/// Errors from registry operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The addressed resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The resource (or identical content) already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The resource is not in a state that allows the operation.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// The commit a tag was meant for is gone from the repository.
    #[error("reference not found: {0}")]
    ReferenceNotFound(String),

    /// The token was missing or rejected.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The token lacks access to the resource.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Any other RPC error code.
    #[error("{code}: {message}")]
    Rpc { code: String, message: String },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The registry answered with something that could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RegistryError {
    /// Build an error from a Connect error code and message.
    ///
    /// # Example
    ///
    /// ```
    /// use bufpush::registry::RegistryError;
    ///
    /// let err = RegistryError::from_code("already_exists", "commit exists");
    /// assert_eq!(err, RegistryError::AlreadyExists("commit exists".into()));
    /// ```
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "not_found" => RegistryError::NotFound(message),
            "already_exists" => RegistryError::AlreadyExists(message),
            "failed_precondition" => RegistryError::FailedPrecondition(message),
            "unauthenticated" => RegistryError::Unauthenticated(message),
            "permission_denied" => RegistryError::PermissionDenied(message),
            other => RegistryError::Rpc {
                code: other.to_string(),
                message,
            },
        }
    }
}

/// The commit at the tip of a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackHead {
    /// Registry commit identifier.
    pub commit: CommitId,
    /// Every tag on the commit, in registry order.
    pub tags: Vec<String>,
}

/// A tag attached to a registry commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTag {
    pub name: String,
    pub commit: CommitId,
}

/// Operations the push and delete flows need from the schema registry.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Get the client name (e.g., "bsr").
    fn name(&self) -> &'static str;

    /// Fetch the commit at the tip of `track`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the track has never been pushed to
    /// - `FailedPrecondition` if the track exists without commits
    async fn get_track_head(
        &self,
        module: &ModuleIdentity,
        track: &str,
    ) -> Result<TrackHead, RegistryError>;

    /// Create a commit from `bundle` on `tracks`, tagged with `tags`.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if the content is identical to an existing commit
    async fn push(
        &self,
        module: &ModuleIdentity,
        bundle: &ModuleBundle,
        tags: &[String],
        tracks: &[String],
    ) -> Result<CommitId, RegistryError>;

    /// Attach `tag` to the existing commit `commit`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the repository no longer exists
    /// - `ReferenceNotFound` if `commit` no longer exists
    /// - `AlreadyExists` if a different commit already owns `tag`
    async fn tag_existing_commit(
        &self,
        module: &ModuleIdentity,
        tag: &str,
        commit: &CommitId,
    ) -> Result<RepositoryTag, RegistryError>;

    /// Delete a track by name.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the repository or track does not exist
    async fn delete_track(&self, module: &ModuleIdentity, track: &str)
        -> Result<(), RegistryError>;
}
