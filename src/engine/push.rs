//! engine::push
//!
//! Push reconciliation.
//!
//! # Algorithm
//!
//! 1. Refuse to put a non-default branch's commits on `main`.
//! 2. Fetch the head of the resolved track. A track that was never pushed
//!    to (`NotFound`) or has no commits (`FailedPrecondition`) has no
//!    history.
//! 3. Keep the head's tags that look like git commit SHAs.
//! 4. Compare each of them with the current git commit, in order:
//!    - `Identical` / `Behind`: nothing to push, stop.
//!    - `Diverged`: notice, keep going.
//!    - `Ahead`: keep going.
//!    - the host does not know the tagged commit: skip that tag.
//! 5. Push the module tagged with the current commit. If the registry
//!    already has identical content, tag the existing head commit instead.
//!
//! The head is read and the push written with no lock in between. Callers
//! run at most one push per track at a time.

use thiserror::Error;
use tracing::{debug, info};

use super::Notifier;
use crate::core::module::Module;
use crate::core::track::{is_cross_branch_main, resolve_track};
use crate::core::types::{CommitId, GitSha};
use crate::forge::{CommitComparator, CompareStatus, ForgeError};
use crate::registry::{RegistryClient, RegistryError, TrackHead};

/// Errors that abort a push.
#[derive(Debug, Error)]
pub enum PushError {
    /// The request would put commits from a non-default branch on `main`.
    #[error("cannot push to main track from a non-default branch")]
    CrossBranchMain,

    /// Comparing commits failed for a reason other than an unknown commit.
    #[error(transparent)]
    Compare(#[from] ForgeError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The repository vanished while tagging the existing commit.
    #[error("a repository named \"{module}\" does not exist")]
    RepositoryNotFound { module: String },

    /// The existing commit vanished while tagging it.
    #[error("{reference} does not exist")]
    ReferenceNotFound { reference: String },

    /// Another commit already carries the current commit's tag.
    #[error("{reference} already exists with different content")]
    TagConflict { reference: String },
}

/// Everything a push needs, captured once per invocation.
#[derive(Debug, Clone)]
pub struct PushRequest {
    /// The module to push, as read from the input directory.
    pub module: Module,
    /// Track as requested by the workflow.
    pub requested_track: String,
    /// Git commit being pushed (the workflow's `github.sha`).
    pub current_commit: String,
    /// The repository's default branch.
    pub default_branch: String,
    /// Branch or tag that triggered the workflow; may be empty.
    pub ref_name: String,
}

/// Terminal result of a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The current commit already is the head of the track.
    SkippedIdentical,
    /// The current commit is an ancestor of the head of the track.
    SkippedBehind,
    /// A new registry commit was created.
    PushedNew { commit: CommitId },
    /// A new registry commit was created although the current commit has
    /// diverged from a tagged head.
    PushedDiverged { commit: CommitId },
    /// The content was unchanged, so the existing head commit was tagged.
    TaggedExisting { commit: CommitId },
}

impl PushOutcome {
    /// The resulting registry commit, if the outcome produced one.
    pub fn commit(&self) -> Option<&CommitId> {
        match self {
            PushOutcome::SkippedIdentical | PushOutcome::SkippedBehind => None,
            PushOutcome::PushedNew { commit }
            | PushOutcome::PushedDiverged { commit }
            | PushOutcome::TaggedExisting { commit } => Some(commit),
        }
    }

    /// Short machine-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PushOutcome::SkippedIdentical => "skipped-identical",
            PushOutcome::SkippedBehind => "skipped-behind",
            PushOutcome::PushedNew { .. } => "pushed-new",
            PushOutcome::PushedDiverged { .. } => "pushed-diverged",
            PushOutcome::TaggedExisting { .. } => "tagged-existing",
        }
    }
}

impl std::fmt::Display for PushOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two values a successful push publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutputs {
    pub commit: CommitId,
    /// Browsable URL of the commit in the registry.
    pub commit_url: String,
}

/// Result of a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReport {
    /// The track that was resolved from the request.
    pub track: String,
    pub outcome: PushOutcome,
    /// Present whenever `outcome` carries a commit.
    pub outputs: Option<PushOutputs>,
}

/// Decides and performs the push for one request.
pub struct PushReconciler<'a> {
    registry: &'a dyn RegistryClient,
    comparator: &'a dyn CommitComparator,
}

impl<'a> PushReconciler<'a> {
    pub fn new(registry: &'a dyn RegistryClient, comparator: &'a dyn CommitComparator) -> Self {
        Self {
            registry,
            comparator,
        }
    }

    /// Run the reconciliation for `request`.
    ///
    /// Notices are delivered to `notifier` as they happen, so a notice
    /// emitted before a fatal error is not lost.
    pub async fn reconcile(
        &self,
        request: &PushRequest,
        notifier: &mut dyn Notifier,
    ) -> Result<PushReport, PushError> {
        if is_cross_branch_main(
            &request.requested_track,
            &request.default_branch,
            &request.ref_name,
        ) {
            return Err(PushError::CrossBranchMain);
        }
        let track = resolve_track(
            &request.requested_track,
            &request.default_branch,
            &request.ref_name,
        );
        let identity = &request.module.identity;
        debug!(
            module = %identity,
            %track,
            commit = %request.current_commit,
            registry = self.registry.name(),
            comparator = self.comparator.name(),
            "reconciling push"
        );

        let head = self.track_head(request, &track).await?;

        let mut diverged = false;
        if let Some(head) = &head {
            for tag in sha_tags(&head.tags) {
                let status = match self
                    .comparator
                    .compare_commits(tag.as_str(), &request.current_commit)
                    .await
                {
                    Ok(status) => status,
                    Err(ForgeError::NotFound(_)) => {
                        debug!(tag = tag.as_str(), "tagged commit unknown to the git host, skipping");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };
                debug!(tag = tag.as_str(), %status, "compared with tagged commit");

                match status {
                    CompareStatus::Identical => {
                        notifier.notice(&format!(
                            "Skipping because the current git commit is already the head of track {}",
                            track
                        ));
                        return Ok(self.finish(request, track, PushOutcome::SkippedIdentical));
                    }
                    CompareStatus::Behind => {
                        notifier.notice(&format!(
                            "Skipping because the current git commit is behind the head of track {}",
                            track
                        ));
                        return Ok(self.finish(request, track, PushOutcome::SkippedBehind));
                    }
                    CompareStatus::Diverged => {
                        notifier.notice(&format!(
                            "The current git commit is diverged from the head of track {}",
                            track
                        ));
                        diverged = true;
                    }
                    CompareStatus::Ahead => {}
                }
            }
        }

        debug!(
            files = request.module.bundle.len(),
            digest = %request.module.bundle.digest(),
            "pushing module"
        );
        let tags = [request.current_commit.clone()];
        let tracks = [track.clone()];
        let outcome = match self
            .registry
            .push(identity, &request.module.bundle, &tags, &tracks)
            .await
        {
            Ok(commit) if diverged => PushOutcome::PushedDiverged { commit },
            Ok(commit) => PushOutcome::PushedNew { commit },
            Err(RegistryError::AlreadyExists(message)) => {
                let Some(head) = head else {
                    // Identical content cannot exist on a track with no history.
                    return Err(RegistryError::AlreadyExists(message).into());
                };
                let commit = self
                    .tag_existing_commit(request, &head.commit)
                    .await?;
                notifier.notice(&format!(
                    "The content of {} is unchanged; tagged existing commit {}",
                    identity.reference(&request.current_commit),
                    commit
                ));
                PushOutcome::TaggedExisting { commit }
            }
            Err(e) => return Err(e.into()),
        };

        Ok(self.finish(request, track, outcome))
    }

    /// Fetch the head of `track`, or `None` when the track has no history.
    async fn track_head(
        &self,
        request: &PushRequest,
        track: &str,
    ) -> Result<Option<TrackHead>, PushError> {
        match self
            .registry
            .get_track_head(&request.module.identity, track)
            .await
        {
            Ok(head) => {
                debug!(commit = %head.commit, tags = head.tags.len(), "found track head");
                Ok(Some(head))
            }
            Err(RegistryError::NotFound(_)) => {
                debug!(track, "track does not exist yet");
                Ok(None)
            }
            // Either the track exists without commits, or some other
            // precondition failed; the push below reports the latter.
            Err(RegistryError::FailedPrecondition(message)) => {
                debug!(track, %message, "track has no commits");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Tag `commit` with the current git commit.
    async fn tag_existing_commit(
        &self,
        request: &PushRequest,
        commit: &CommitId,
    ) -> Result<CommitId, PushError> {
        let identity = &request.module.identity;
        let tag = &request.current_commit;
        match self
            .registry
            .tag_existing_commit(identity, tag, commit)
            .await
        {
            Ok(_) => Ok(commit.clone()),
            Err(RegistryError::NotFound(_)) => Err(PushError::RepositoryNotFound {
                module: identity.to_string(),
            }),
            Err(RegistryError::ReferenceNotFound(_)) => Err(PushError::ReferenceNotFound {
                reference: identity.reference(commit.as_str()),
            }),
            Err(RegistryError::AlreadyExists(_)) => Err(PushError::TagConflict {
                reference: identity.reference(tag),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn finish(&self, request: &PushRequest, track: String, outcome: PushOutcome) -> PushReport {
        info!(%track, outcome = %outcome, "push reconciled");
        let outputs = outcome.commit().map(|commit| PushOutputs {
            commit: commit.clone(),
            commit_url: request.module.identity.commit_url(commit),
        });
        PushReport {
            track,
            outcome,
            outputs,
        }
    }
}

/// Tags that have the shape of a full git commit SHA, in their original order.
///
/// Only the shape is checked; whether the commit exists is for the git
/// host to say.
pub fn sha_tags(tags: &[String]) -> impl Iterator<Item = GitSha> + '_ {
    tags.iter().filter_map(|t| GitSha::from_tag(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::module::{ModuleBundle, ModuleFile};
    use crate::core::types::ModuleIdentity;
    use crate::forge::mock::MockComparator;
    use crate::registry::mock::{FailOn, MockOperation, MockRegistry};
    use std::path::PathBuf;

    const SHA_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const SHA_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const CURRENT: &str = "cccccccccccccccccccccccccccccccccccccccc";

    fn module() -> Module {
        Module {
            identity: ModuleIdentity::parse("buf.build/foo/bar").unwrap(),
            bundle: ModuleBundle::new(vec![ModuleFile {
                path: "foo/v1/foo.proto".into(),
                content: b"syntax = \"proto3\";".to_vec(),
            }]),
            root: PathBuf::from("."),
        }
    }

    fn request(track: &str) -> PushRequest {
        PushRequest {
            module: module(),
            requested_track: track.into(),
            current_commit: CURRENT.into(),
            default_branch: "main".into(),
            ref_name: track.into(),
        }
    }

    async fn run(
        registry: &MockRegistry,
        comparator: &MockComparator,
        request: &PushRequest,
    ) -> (Result<PushReport, PushError>, Vec<String>) {
        let mut notices: Vec<String> = Vec::new();
        let result = PushReconciler::new(registry, comparator)
            .reconcile(request, &mut notices)
            .await;
        (result, notices)
    }

    #[test]
    fn sha_tags_filters_by_shape() {
        let tags: Vec<String> = vec![
            SHA_A.into(),
            "v1.0.0".into(),
            SHA_A.to_uppercase(),
            SHA_B[..39].into(),
            SHA_B.into(),
        ];
        let kept: Vec<String> = sha_tags(&tags).map(String::from).collect();
        assert_eq!(kept, vec![SHA_A, SHA_B]);
    }

    #[test]
    fn outcome_commit_and_names() {
        let commit = CommitId::new("c1").unwrap();
        assert_eq!(PushOutcome::SkippedBehind.commit(), None);
        assert_eq!(PushOutcome::SkippedIdentical.commit(), None);
        let pushed = PushOutcome::PushedNew {
            commit: commit.clone(),
        };
        assert_eq!(pushed.commit(), Some(&commit));
        assert_eq!(pushed.to_string(), "pushed-new");
        assert_eq!(
            PushOutcome::TaggedExisting { commit }.as_str(),
            "tagged-existing"
        );
    }

    #[tokio::test]
    async fn identical_head_skips() {
        let registry = MockRegistry::new().with_track_head("main", "c0", &[SHA_A]);
        let comparator = MockComparator::new().with_status(SHA_A, CompareStatus::Identical);

        let (result, notices) = run(&registry, &comparator, &request("main")).await;
        let report = result.unwrap();
        assert_eq!(report.outcome, PushOutcome::SkippedIdentical);
        assert_eq!(report.outputs, None);
        assert_eq!(
            notices,
            vec!["Skipping because the current git commit is already the head of track main"]
        );
        assert_eq!(registry.push_count(), 0);
    }

    #[tokio::test]
    async fn unknown_tagged_commit_is_skipped() {
        let registry = MockRegistry::new().with_track_head("main", "c0", &[SHA_A, SHA_B]);
        let comparator = MockComparator::new().with_status(SHA_B, CompareStatus::Behind);

        let (result, _) = run(&registry, &comparator, &request("main")).await;
        assert_eq!(result.unwrap().outcome, PushOutcome::SkippedBehind);
        assert_eq!(comparator.compared_bases(), vec![SHA_A, SHA_B]);
    }

    #[tokio::test]
    async fn compare_failure_aborts() {
        let registry = MockRegistry::new().with_track_head("main", "c0", &[SHA_A]);
        let comparator = MockComparator::new().with_error(SHA_A, ForgeError::RateLimited);

        let (result, _) = run(&registry, &comparator, &request("main")).await;
        assert!(matches!(
            result,
            Err(PushError::Compare(ForgeError::RateLimited))
        ));
        assert_eq!(registry.push_count(), 0);
    }

    #[tokio::test]
    async fn diverged_push_is_reported() {
        let registry = MockRegistry::new().with_track_head("main", "c0", &[SHA_A]);
        let comparator = MockComparator::new().with_status(SHA_A, CompareStatus::Diverged);

        let (result, notices) = run(&registry, &comparator, &request("main")).await;
        let report = result.unwrap();
        assert!(matches!(report.outcome, PushOutcome::PushedDiverged { .. }));
        assert_eq!(
            notices,
            vec!["The current git commit is diverged from the head of track main"]
        );
    }

    #[tokio::test]
    async fn push_tags_current_commit_on_resolved_track() {
        let registry = MockRegistry::new();
        let comparator = MockComparator::new();
        let mut req = request("master");
        req.default_branch = "master".into();

        let (result, _) = run(&registry, &comparator, &req).await;
        let report = result.unwrap();
        assert_eq!(report.track, "main");
        let ops = registry.operations();
        assert_eq!(
            ops[1],
            MockOperation::Push {
                digest: req.module.bundle.digest(),
                tags: vec![CURRENT.into()],
                tracks: vec!["main".into()],
            }
        );
    }

    #[tokio::test]
    async fn already_exists_without_head_propagates() {
        let registry = MockRegistry::new().fail_on(FailOn::Push(RegistryError::AlreadyExists(
            "exists".into(),
        )));
        let comparator = MockComparator::new();

        let (result, _) = run(&registry, &comparator, &request("main")).await;
        assert!(matches!(
            result,
            Err(PushError::Registry(RegistryError::AlreadyExists(_)))
        ));
        assert_eq!(registry.tag_count(), 0);
    }

    #[tokio::test]
    async fn tag_errors_are_mapped() {
        let comparator = MockComparator::new();
        let cases = [
            (
                RegistryError::NotFound("repo".into()),
                "a repository named \"buf.build/foo/bar\" does not exist".to_string(),
            ),
            (
                RegistryError::ReferenceNotFound("c0".into()),
                "buf.build/foo/bar:c0 does not exist".to_string(),
            ),
            (
                RegistryError::AlreadyExists("tag".into()),
                format!("buf.build/foo/bar:{} already exists with different content", CURRENT),
            ),
        ];
        for (error, message) in cases {
            let registry = MockRegistry::new()
                .with_track_content("main", "c0", &[], &module().bundle)
                .fail_on(FailOn::TagExistingCommit(error));
            let (result, _) = run(&registry, &comparator, &request("main")).await;
            assert_eq!(result.unwrap_err().to_string(), message);
        }
    }

    #[tokio::test]
    async fn other_track_head_errors_propagate() {
        let registry = MockRegistry::new().fail_on(FailOn::GetTrackHead(
            RegistryError::PermissionDenied("no".into()),
        ));
        let comparator = MockComparator::new();

        let (result, _) = run(&registry, &comparator, &request("main")).await;
        assert!(matches!(
            result,
            Err(PushError::Registry(RegistryError::PermissionDenied(_)))
        ));
        assert_eq!(registry.push_count(), 0);
    }
}
