//! forge::traits
//!
//! Commit comparison against a remote git host.
//!
//! # Design
//!
//! The `CommitComparator` trait is async because comparisons involve
//! network I/O. A `NotFound` error is kept distinct from every other
//! failure: it means `base` is not a reachable commit in the repository
//! (a stale tag after a force-push, say), which callers treat as an
//! expected condition rather than a failure.
//!
//! # Example
//!
//! ```ignore
//! use bufpush::forge::{CommitComparator, CompareStatus, ForgeError};
//!
//! async fn is_new(forge: &dyn CommitComparator, base: &str, head: &str) -> Result<bool, ForgeError> {
//!     match forge.compare_commits(base, head).await {
//!         Ok(CompareStatus::Ahead) | Err(ForgeError::NotFound(_)) => Ok(true),
//!         Ok(_) => Ok(false),
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

/// Errors from forge operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The API reported a comparison status this crate does not know.
    #[error("unexpected status: {0}")]
    UnexpectedStatus(String),
}

/// How `head` relates to `base`.
///
/// See <https://stackoverflow.com/a/23969867> for the git semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareStatus {
    /// `head` contains `base` plus more commits.
    Ahead,
    /// `head` is an ancestor of `base`.
    Behind,
    /// Same commit.
    Identical,
    /// Neither contains the other.
    Diverged,
}

impl CompareStatus {
    /// All statuses, in declaration order.
    pub const ALL: [CompareStatus; 4] = [
        CompareStatus::Ahead,
        CompareStatus::Behind,
        CompareStatus::Identical,
        CompareStatus::Diverged,
    ];

    /// The wire name used by the GitHub compare API.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareStatus::Ahead => "ahead",
            CompareStatus::Behind => "behind",
            CompareStatus::Identical => "identical",
            CompareStatus::Diverged => "diverged",
        }
    }

    /// Parse a wire name.
    ///
    /// # Example
    ///
    /// ```
    /// use bufpush::forge::CompareStatus;
    ///
    /// assert_eq!(CompareStatus::parse("behind"), Some(CompareStatus::Behind));
    /// assert_eq!(CompareStatus::parse("sideways"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl std::fmt::Display for CompareStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies the relationship between two commits of one repository.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// - `NotFound`: `base` (or `head`) is not a commit in the repository
/// - everything else: a genuine failure the caller should propagate
#[async_trait]
pub trait CommitComparator: Send + Sync {
    /// Get the forge name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Compare `head` against `base`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if either commit does not exist in the repository
    /// - `UnexpectedStatus` if the host reports an unknown relationship
    /// - `AuthFailed`, `RateLimited`, `ApiError`, `NetworkError` otherwise
    async fn compare_commits(&self, base: &str, head: &str) -> Result<CompareStatus, ForgeError>;
}
