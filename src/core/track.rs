//! core::track
//!
//! Track naming rules.
//!
//! The registry's canonical default track is always called `main`, while a
//! git repository's default branch may be called anything. A push whose
//! track equals the repository's default branch is mapped onto `main`.

/// The registry's default track. It cannot be deleted.
pub const MAIN_TRACK: &str = "main";

/// Map a requested track onto the track that should receive the push.
///
/// Returns [`MAIN_TRACK`] when `track` equals `default_branch` and the
/// event came from that branch (`ref_name` equal to `track`, or unknown).
/// Otherwise `track` is returned unchanged, so a default-branch-named track
/// requested from some other ref keeps its literal name.
///
/// # Example
///
/// ```
/// use bufpush::core::track::resolve_track;
///
/// assert_eq!(resolve_track("master", "master", "master"), "main");
/// assert_eq!(resolve_track("master", "master", ""), "main");
/// assert_eq!(resolve_track("master", "master", "feature"), "master");
/// assert_eq!(resolve_track("feature", "master", "feature"), "feature");
/// ```
pub fn resolve_track(track: &str, default_branch: &str, ref_name: &str) -> String {
    if track == default_branch && (track == ref_name || ref_name.is_empty()) {
        return MAIN_TRACK.to_string();
    }
    track.to_string()
}

/// Whether a request would put commits from a non-default branch on `main`.
///
/// This happens when a repository whose default branch is, say, `master`
/// also has a branch literally named `main`. Pushing from that branch must
/// not mix its history into the `main` track.
///
/// # Example
///
/// ```
/// use bufpush::core::track::is_cross_branch_main;
///
/// assert!(is_cross_branch_main("main", "develop", "main"));
/// assert!(!is_cross_branch_main("main", "main", "main"));
/// assert!(!is_cross_branch_main("main", "develop", "develop"));
/// ```
pub fn is_cross_branch_main(track: &str, default_branch: &str, ref_name: &str) -> bool {
    default_branch != MAIN_TRACK && track == MAIN_TRACK && track == ref_name
}
