//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Resolves configuration from its arguments and the captured environment
//! 2. Builds the collaborators and calls the engine
//! 3. Writes notices and step outputs for the runner
//!
//! # Async Commands
//!
//! The registry and git host clients are async. Each handler builds a
//! current-thread runtime and awaits every call in sequence.

mod delete_track;
mod push;

pub use delete_track::delete_track;
pub use push::push;

use anyhow::Result;

use super::args::Command;
use super::Context;
use crate::core::config::ActionConfig;
use crate::core::types::ModuleIdentity;
use crate::registry::bsr::BsrClient;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Push {
            input,
            track,
            commit,
            default_branch,
            ref_name,
        } => push::push(
            ctx,
            push::PushArgs {
                input,
                track,
                commit,
                default_branch,
                ref_name,
            },
        ),
        Command::DeleteTrack {
            input,
            track,
            default_branch,
            ref_name,
        } => delete_track::delete_track(
            ctx,
            delete_track::DeleteTrackArgs {
                input,
                track,
                default_branch,
                ref_name,
            },
        ),
    }
}

/// Runtime for one command: single-threaded, calls awaited in order.
fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

/// Registry client for `module`, honoring an API base override.
fn registry_client(config: &ActionConfig, module: &ModuleIdentity) -> BsrClient {
    match &config.registry_api_base {
        Some(api_base) => BsrClient::with_api_base(config.buf_token.clone(), api_base.clone()),
        None => BsrClient::for_remote(config.buf_token.clone(), module.remote()),
    }
}
