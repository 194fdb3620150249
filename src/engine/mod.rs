//! engine
//!
//! Orchestrates the two operations the action performs against the registry.
//!
//! # Architecture
//!
//! - [`push`]: `PushReconciler` decides whether the current git commit
//!   needs a new registry commit on its track, and converges a push of
//!   unchanged content onto the existing commit.
//! - [`delete`]: `TrackDeleter` removes a non-main track.
//!
//! Both receive their collaborators (`RegistryClient`, `CommitComparator`)
//! as trait objects and their inputs as an immutable request, so they never
//! touch the process environment or the network directly. User-facing
//! notices go through a [`Notifier`], in the order they happen.
//!
//! # Example
//!
//! ```ignore
//! use bufpush::engine::push::{PushReconciler, PushRequest};
//!
//! let reconciler = PushReconciler::new(&registry, &comparator);
//! let mut notices: Vec<String> = Vec::new();
//! let report = reconciler.reconcile(&request, &mut notices).await?;
//! if let Some(outputs) = report.outputs {
//!     println!("{} {}", outputs.commit, outputs.commit_url);
//! }
//! ```

pub mod delete;
pub mod push;

pub use delete::{DeleteOutcome, DeleteTrackError, DeleteTrackRequest, TrackDeleter};
pub use push::{PushError, PushOutcome, PushOutputs, PushReconciler, PushReport, PushRequest};

/// Receiver of informational notices.
///
/// A notice is not an error: skips, divergence and unchanged content are
/// all reported this way and the process still exits successfully.
pub trait Notifier {
    fn notice(&mut self, message: &str);
}

/// Collects notices in memory.
impl Notifier for Vec<String> {
    fn notice(&mut self, message: &str) {
        self.push(message.to_string());
    }
}
