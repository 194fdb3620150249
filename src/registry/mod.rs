//! registry
//!
//! Abstraction for the schema registry that stores pushed modules.
//!
//! # Modules
//!
//! - `traits`: `RegistryClient`, `RegistryError`, `TrackHead`, `RepositoryTag`
//! - [`bsr`]: Buf Schema Registry client (Connect protocol, JSON codec)
//! - [`mock`]: In-memory implementation for deterministic testing

pub mod bsr;
pub mod mock;
mod traits;

pub use traits::*;
