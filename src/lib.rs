//! buf-push-action - push a module to the Buf Schema Registry from GitHub Actions
//!
//! The action pushes the module in a repository directory to a registry
//! track and tags the resulting commit with the git commit it came from.
//! Those tags let later runs compare the track's head with the commit being
//! pushed, so a re-run, an older commit, or unchanged content never creates
//! a redundant registry commit.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Push reconciliation and track deletion
//! - [`core`] - Domain types, track rules, configuration, module reading
//! - [`forge`] - Commit comparison on the git host (GitHub)
//! - [`registry`] - Schema registry client (BSR)
//! - [`ui`] - Workflow commands for the Actions runner
//!
//! # Correctness Invariants
//!
//! 1. The `main` track only receives commits from the default branch
//! 2. Only tags shaped like git commit SHAs are compared
//! 3. `Identical` or `Behind` stops before anything is pushed
//! 4. Unchanged content converges onto the existing commit, never a new one

pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod registry;
pub mod ui;
