//! core
//!
//! Core domain types, rules, and local inputs.
//!
//! # Modules
//!
//! - [`types`] - Strong types: GitSha, CommitId, ModuleIdentity, Secret
//! - [`track`] - Track naming rules
//! - [`config`] - Action configuration, `buf.yaml` and `buf.lock` loading
//! - [`module`] - Reading a module from disk
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Nothing here performs network I/O

pub mod config;
pub mod module;
pub mod track;
pub mod types;
