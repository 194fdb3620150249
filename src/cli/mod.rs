//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Capture the environment once and install logging
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, resolves
//! configuration, builds the registry and git host clients, and hands them
//! to the [`crate::engine`]. Decisions about what to push live there.

pub mod args;
pub mod commands;

pub use args::Cli;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::core::config::EnvSnapshot;

/// Process-wide state shared by the commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Environment captured at startup.
    pub env: EnvSnapshot,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let env = EnvSnapshot::capture();

    init_tracing(&env, cli.debug);

    let ctx = Context { env };
    commands::dispatch(cli.command, &ctx)
}

/// Install the stderr `tracing` subscriber.
///
/// `RUST_LOG` wins; otherwise `debug` when requested by flag or by the
/// runner, `warn` by default.
fn init_tracing(env: &EnvSnapshot, debug: bool) {
    let default = log_level(debug, env.runner_debug());
    let filter = env
        .get("RUST_LOG")
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default));

    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Default log level for the flags given.
fn log_level(debug: bool, runner_debug: bool) -> &'static str {
    if debug || runner_debug {
        "debug"
    } else {
        "warn"
    }
}
