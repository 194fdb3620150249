//! forge
//!
//! Abstraction for the remote git host used to compare commits.
//!
//! # Architecture
//!
//! The `CommitComparator` trait defines the only question the push logic
//! asks a git host: how does the current commit relate to a commit that
//! the registry has tagged? The engine depends on the trait; the CLI
//! decides which implementation to hand it.
//!
//! # Modules
//!
//! - `traits`: `CommitComparator`, `CompareStatus`, `ForgeError`
//! - [`github`]: GitHub REST implementation
//! - [`mock`]: Scripted implementation for deterministic testing

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
