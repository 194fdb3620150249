//! ui
//!
//! Output to the GitHub Actions runner.
//!
//! # Modules
//!
//! - [`output`] - Workflow commands: notices, errors, step outputs

pub mod output;
