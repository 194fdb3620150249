//! registry::mock
//!
//! In-memory registry for deterministic testing.
//!
//! # Design
//!
//! The mock keeps tracks, commits and tags in memory and emulates the
//! registry's content addressing with [`ModuleBundle::digest`]: pushing a
//! bundle whose digest matches the head of a target track is refused with
//! `AlreadyExists`, the way the real registry refuses duplicate content.
//! Every call is recorded as a [`MockOperation`].
//!
//! # Example
//!
//! ```
//! use bufpush::core::module::ModuleBundle;
//! use bufpush::core::types::ModuleIdentity;
//! use bufpush::registry::mock::MockRegistry;
//! use bufpush::registry::{RegistryClient, RegistryError};
//!
//! # tokio_test::block_on(async {
//! let module = ModuleIdentity::parse("buf.build/acme/weather").unwrap();
//! let registry = MockRegistry::new();
//!
//! assert!(matches!(
//!     registry.get_track_head(&module, "main").await,
//!     Err(RegistryError::NotFound(_))
//! ));
//!
//! let commit = registry
//!     .push(&module, &ModuleBundle::default(), &[], &["main".to_string()])
//!     .await
//!     .unwrap();
//! assert_eq!(registry.get_track_head(&module, "main").await.unwrap().commit, commit);
//! # });
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::traits::{RegistryClient, RegistryError, RepositoryTag, TrackHead};
use crate::core::module::ModuleBundle;
use crate::core::types::{CommitId, ModuleIdentity};

/// Mock registry for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockRegistry {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockRegistryInner>>,
}

/// Internal mutable state.
#[derive(Debug)]
struct MockRegistryInner {
    /// Whether the repository exists at all.
    repository_exists: bool,
    /// Track name to head state.
    tracks: HashMap<String, TrackState>,
    /// Commit id to commit record.
    commits: HashMap<String, CommitRecord>,
    /// Commit ids to hand out before minting new ones.
    scripted_ids: VecDeque<String>,
    /// Next commit number to assign.
    next_commit: u64,
    /// Method to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

#[derive(Debug, Clone)]
enum TrackState {
    /// The track exists but nothing was ever pushed to it.
    Empty,
    Head(String),
}

#[derive(Debug, Clone, Default)]
struct CommitRecord {
    /// Content digest, when the content is known.
    digest: Option<String>,
    tags: Vec<String>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail get_track_head with the given error.
    GetTrackHead(RegistryError),
    /// Fail push with the given error.
    Push(RegistryError),
    /// Fail tag_existing_commit with the given error.
    TagExistingCommit(RegistryError),
    /// Fail delete_track with the given error.
    DeleteTrack(RegistryError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetTrackHead {
        track: String,
    },
    Push {
        digest: String,
        tags: Vec<String>,
        tracks: Vec<String>,
    },
    TagExistingCommit {
        tag: String,
        commit: String,
    },
    DeleteTrack {
        track: String,
    },
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRegistry {
    /// Create a registry with an existing, empty repository.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockRegistryInner {
                repository_exists: true,
                tracks: HashMap::new(),
                commits: HashMap::new(),
                scripted_ids: VecDeque::new(),
                next_commit: 1,
                fail_on: None,
                operations: Vec::new(),
            })),
        }
    }

    /// Put `commit` at the head of `track`, carrying `tags`.
    ///
    /// The commit's content is unknown, so no push is ever refused as a
    /// duplicate of it.
    pub fn with_track_head(self, track: &str, commit: &str, tags: &[&str]) -> Self {
        self.insert_head(track, commit, tags, None);
        self
    }

    /// Put `commit` at the head of `track` with the content of `bundle`.
    ///
    /// Pushing the same bundle to `track` afterwards fails with
    /// `AlreadyExists`.
    pub fn with_track_content(
        self,
        track: &str,
        commit: &str,
        tags: &[&str],
        bundle: &ModuleBundle,
    ) -> Self {
        self.insert_head(track, commit, tags, Some(bundle.digest()));
        self
    }

    /// Create `track` without any commits.
    pub fn with_empty_track(self, track: &str) -> Self {
        self.lock()
            .tracks
            .insert(track.to_string(), TrackState::Empty);
        self
    }

    /// Use `id` for the next commit created by `push`.
    pub fn with_next_commit(self, id: &str) -> Self {
        self.lock().scripted_ids.push_back(id.to_string());
        self
    }

    /// Remove the repository, as if it was deleted between calls.
    pub fn without_repository(self) -> Self {
        self.lock().repository_exists = false;
        self
    }

    /// Configure an operation to fail.
    ///
    /// # Example
    ///
    /// ```
    /// use bufpush::registry::mock::{FailOn, MockRegistry};
    /// use bufpush::registry::RegistryError;
    ///
    /// let registry = MockRegistry::new()
    ///     .fail_on(FailOn::Push(RegistryError::NetworkError("refused".into())));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.lock().fail_on = Some(fail_on);
        self
    }

    /// Clear any configured failure.
    pub fn clear_fail_on(&self) {
        self.lock().fail_on = None;
    }

    /// All recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    /// Number of `push` calls.
    pub fn push_count(&self) -> usize {
        self.count(|op| matches!(op, MockOperation::Push { .. }))
    }

    /// Number of `tag_existing_commit` calls.
    pub fn tag_count(&self) -> usize {
        self.count(|op| matches!(op, MockOperation::TagExistingCommit { .. }))
    }

    /// Number of `delete_track` calls.
    pub fn delete_count(&self) -> usize {
        self.count(|op| matches!(op, MockOperation::DeleteTrack { .. }))
    }

    /// Current head commit of `track`, if any.
    pub fn head_of(&self, track: &str) -> Option<String> {
        match self.lock().tracks.get(track) {
            Some(TrackState::Head(commit)) => Some(commit.clone()),
            _ => None,
        }
    }

    /// Tags on `commit`, in the order they were added.
    pub fn tags_of(&self, commit: &str) -> Vec<String> {
        self.lock()
            .commits
            .get(commit)
            .map(|c| c.tags.clone())
            .unwrap_or_default()
    }

    /// Whether `track` exists.
    pub fn has_track(&self, track: &str) -> bool {
        self.lock().tracks.contains_key(track)
    }

    fn insert_head(&self, track: &str, commit: &str, tags: &[&str], digest: Option<String>) {
        let mut inner = self.lock();
        let record = inner.commits.entry(commit.to_string()).or_default();
        record.digest = digest.or(record.digest.take());
        for tag in tags {
            if !record.tags.iter().any(|t| t == tag) {
                record.tags.push(tag.to_string());
            }
        }
        inner
            .tracks
            .insert(track.to_string(), TrackState::Head(commit.to_string()));
    }

    fn count(&self, pred: impl Fn(&MockOperation) -> bool) -> usize {
        self.lock().operations.iter().filter(|op| pred(op)).count()
    }

    fn lock(&self) -> MutexGuard<'_, MockRegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, op: MockOperation) {
        self.lock().operations.push(op);
    }

    fn check_fail(&self, expected: &str) -> Result<(), RegistryError> {
        match &self.lock().fail_on {
            Some(FailOn::GetTrackHead(e)) if expected == "get_track_head" => Err(e.clone()),
            Some(FailOn::Push(e)) if expected == "push" => Err(e.clone()),
            Some(FailOn::TagExistingCommit(e)) if expected == "tag_existing_commit" => {
                Err(e.clone())
            }
            Some(FailOn::DeleteTrack(e)) if expected == "delete_track" => Err(e.clone()),
            _ => Ok(()),
        }
    }
}

/// Owner of `tag` among all commits, if any.
fn tag_owner<'a>(commits: &'a HashMap<String, CommitRecord>, tag: &str) -> Option<&'a str> {
    commits
        .iter()
        .find(|(_, record)| record.tags.iter().any(|t| t == tag))
        .map(|(id, _)| id.as_str())
}

fn repository_not_found(module: &ModuleIdentity) -> RegistryError {
    RegistryError::NotFound(format!("repository {} not found", module.full_name()))
}

fn commit_id(id: &str) -> Result<CommitId, RegistryError> {
    CommitId::new(id).map_err(|e| RegistryError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl RegistryClient for MockRegistry {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_track_head(
        &self,
        module: &ModuleIdentity,
        track: &str,
    ) -> Result<TrackHead, RegistryError> {
        self.record(MockOperation::GetTrackHead {
            track: track.to_string(),
        });
        self.check_fail("get_track_head")?;

        let inner = self.lock();
        if !inner.repository_exists {
            return Err(repository_not_found(module));
        }
        match inner.tracks.get(track) {
            None => Err(RegistryError::NotFound(format!("track {} not found", track))),
            Some(TrackState::Empty) => Err(RegistryError::FailedPrecondition(format!(
                "track {} has no commits",
                track
            ))),
            Some(TrackState::Head(commit)) => Ok(TrackHead {
                commit: commit_id(commit)?,
                tags: inner
                    .commits
                    .get(commit)
                    .map(|c| c.tags.clone())
                    .unwrap_or_default(),
            }),
        }
    }

    async fn push(
        &self,
        module: &ModuleIdentity,
        bundle: &ModuleBundle,
        tags: &[String],
        tracks: &[String],
    ) -> Result<CommitId, RegistryError> {
        let digest = bundle.digest();
        self.record(MockOperation::Push {
            digest: digest.clone(),
            tags: tags.to_vec(),
            tracks: tracks.to_vec(),
        });
        self.check_fail("push")?;

        let mut inner = self.lock();
        if !inner.repository_exists {
            return Err(repository_not_found(module));
        }

        for track in tracks {
            if let Some(TrackState::Head(head)) = inner.tracks.get(track) {
                let same_content = inner
                    .commits
                    .get(head)
                    .and_then(|c| c.digest.as_deref())
                    == Some(digest.as_str());
                if same_content {
                    return Err(RegistryError::AlreadyExists(format!(
                        "content already exists as commit {}",
                        head
                    )));
                }
            }
        }
        for tag in tags {
            if tag_owner(&inner.commits, tag).is_some() {
                return Err(RegistryError::AlreadyExists(format!("tag {} already exists", tag)));
            }
        }

        let id = match inner.scripted_ids.pop_front() {
            Some(id) => id,
            None => {
                inner.next_commit += 1;
                format!("{:032x}", inner.next_commit - 1)
            }
        };
        inner.commits.insert(
            id.clone(),
            CommitRecord {
                digest: Some(digest),
                tags: tags.to_vec(),
            },
        );
        for track in tracks {
            inner
                .tracks
                .insert(track.clone(), TrackState::Head(id.clone()));
        }
        commit_id(&id)
    }

    async fn tag_existing_commit(
        &self,
        module: &ModuleIdentity,
        tag: &str,
        commit: &CommitId,
    ) -> Result<RepositoryTag, RegistryError> {
        self.record(MockOperation::TagExistingCommit {
            tag: tag.to_string(),
            commit: commit.to_string(),
        });
        self.check_fail("tag_existing_commit")?;

        let mut inner = self.lock();
        if !inner.repository_exists {
            return Err(repository_not_found(module));
        }
        if !inner.commits.contains_key(commit.as_str()) {
            return Err(RegistryError::ReferenceNotFound(commit.to_string()));
        }
        if let Some(owner) = tag_owner(&inner.commits, tag) {
            if owner != commit.as_str() {
                return Err(RegistryError::AlreadyExists(format!(
                    "tag {} already exists",
                    tag
                )));
            }
        }

        if let Some(record) = inner.commits.get_mut(commit.as_str()) {
            if !record.tags.iter().any(|t| t == tag) {
                record.tags.push(tag.to_string());
            }
        }
        Ok(RepositoryTag {
            name: tag.to_string(),
            commit: commit.clone(),
        })
    }

    async fn delete_track(&self, module: &ModuleIdentity, track: &str) -> Result<(), RegistryError> {
        self.record(MockOperation::DeleteTrack {
            track: track.to_string(),
        });
        self.check_fail("delete_track")?;

        let mut inner = self.lock();
        if !inner.repository_exists {
            return Err(repository_not_found(module));
        }
        match inner.tracks.remove(track) {
            Some(_) => Ok(()),
            None => Err(RegistryError::NotFound(format!("track {} not found", track))),
        }
    }
}
