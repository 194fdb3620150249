//! forge::mock
//!
//! Scripted commit comparator for deterministic testing.
//!
//! # Design
//!
//! Responses are scripted per `base` commit. Every call is recorded so
//! tests can assert which tags were compared, and in what order. A base
//! with no scripted response behaves like a commit the host has never
//! seen and yields `ForgeError::NotFound`.
//!
//! # Example
//!
//! ```
//! use bufpush::forge::mock::MockComparator;
//! use bufpush::forge::{CommitComparator, CompareStatus};
//!
//! # tokio_test::block_on(async {
//! let forge = MockComparator::new().with_status("aaa", CompareStatus::Behind);
//!
//! let status = forge.compare_commits("aaa", "bbb").await.unwrap();
//! assert_eq!(status, CompareStatus::Behind);
//! assert!(forge.compare_commits("ccc", "bbb").await.is_err());
//! assert_eq!(forge.calls().len(), 2);
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::traits::{CommitComparator, CompareStatus, ForgeError};

/// Mock comparator for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockComparator {
    inner: Arc<Mutex<MockComparatorInner>>,
}

#[derive(Debug, Default)]
struct MockComparatorInner {
    /// Scripted responses keyed by base commit.
    responses: HashMap<String, Result<CompareStatus, ForgeError>>,
    /// Recorded `(base, head)` pairs, in call order.
    calls: Vec<CompareCall>,
}

/// One recorded comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareCall {
    pub base: String,
    pub head: String,
}

impl MockComparator {
    /// Create a comparator with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the status returned when comparing against `base`.
    pub fn with_status(self, base: impl Into<String>, status: CompareStatus) -> Self {
        self.lock().responses.insert(base.into(), Ok(status));
        self
    }

    /// Script an error returned when comparing against `base`.
    pub fn with_error(self, base: impl Into<String>, error: ForgeError) -> Self {
        self.lock().responses.insert(base.into(), Err(error));
        self
    }

    /// All recorded comparisons, in call order.
    pub fn calls(&self) -> Vec<CompareCall> {
        self.lock().calls.clone()
    }

    /// The `base` of every recorded comparison, in call order.
    pub fn compared_bases(&self) -> Vec<String> {
        self.lock().calls.iter().map(|c| c.base.clone()).collect()
    }

    fn lock(&self) -> MutexGuard<'_, MockComparatorInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CommitComparator for MockComparator {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn compare_commits(&self, base: &str, head: &str) -> Result<CompareStatus, ForgeError> {
        let mut inner = self.lock();
        inner.calls.push(CompareCall {
            base: base.to_string(),
            head: head.to_string(),
        });
        inner
            .responses
            .get(base)
            .cloned()
            .unwrap_or_else(|| Err(ForgeError::NotFound(format!("No commit found for SHA: {}", base))))
    }
}
