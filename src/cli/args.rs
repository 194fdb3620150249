//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug logging

use clap::{Parser, Subcommand};

/// Push a module to the Buf Schema Registry from a GitHub Actions workflow
#[derive(Parser, Debug)]
#[command(name = "buf-push-action")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Push the module to a track, unless the track already has this commit
    #[command(
        name = "push",
        long_about = "Push the module to a track, unless the track already has this commit.\n\n\
            The head of the track is compared with the current git commit. Nothing is \
            pushed when the current commit is already the head or is behind it. When the \
            content is unchanged the existing registry commit is tagged instead.\n\n\
            Empty arguments fall back to the action inputs (INPUT_*) and GITHUB_REF_NAME.",
        after_help = "\
EXAMPLES:
    # What the action runs on a push to the default branch
    buf-push-action push proto main $GITHUB_SHA main main

    # Push from a feature branch to a track of the same name
    buf-push-action push . feature/x $GITHUB_SHA main feature/x"
    )]
    Push {
        /// Directory containing buf.yaml
        input: String,

        /// Track to push to
        track: String,

        /// Current git commit SHA
        commit: String,

        /// The repository's default branch
        default_branch: String,

        /// Branch or tag that triggered the workflow. Defaults to
        /// GITHUB_REF_NAME; an explicit empty value means unknown
        ref_name: Option<String>,
    },

    /// Delete a track from the registry (never main)
    #[command(name = "delete-track")]
    DeleteTrack {
        /// Directory containing buf.yaml
        #[arg(long)]
        input: Option<String>,

        /// Track to delete
        #[arg(long)]
        track: Option<String>,

        /// The repository's default branch
        #[arg(long)]
        default_branch: Option<String>,

        /// Branch or tag that triggered the workflow
        #[arg(long)]
        ref_name: Option<String>,
    },
}
