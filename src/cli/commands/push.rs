//! cli::commands::push
//!
//! Push the module at the input directory to a track.
//!
//! # Example
//!
//! ```bash
//! buf-push-action push proto main "$GITHUB_SHA" main "$GITHUB_REF_NAME"
//! ```

use anyhow::{Context as _, Result};
use tracing::debug;

use super::{registry_client, runtime};
use crate::cli::Context;
use crate::core::config::{require_commit, ActionConfig, GitHubConfig, Inputs};
use crate::core::module::Module;
use crate::engine::{PushReconciler, PushRequest};
use crate::forge::github::GitHubComparator;
use crate::ui::output::Workflow;

/// Arguments of the push command, as given on the command line.
#[derive(Debug, Clone)]
pub struct PushArgs {
    pub input: String,
    pub track: String,
    pub commit: String,
    pub default_branch: String,
    pub ref_name: Option<String>,
}

/// Run the push command.
pub fn push(ctx: &Context, args: PushArgs) -> Result<()> {
    let config = ActionConfig::resolve(
        &ctx.env,
        &Inputs {
            input: Some(args.input),
            track: Some(args.track),
            default_branch: Some(args.default_branch),
            ref_name: args.ref_name,
        },
    )?;
    let current_commit = require_commit(&args.commit)?.to_string();
    let github = GitHubConfig::resolve(&ctx.env)?;

    let module = Module::read(&config.input)?;
    debug!(
        module = %module.identity,
        root = %module.root.display(),
        files = module.bundle.len(),
        "read module"
    );

    let registry = registry_client(&config, &module.identity);
    let comparator = GitHubComparator::from_config(&github);
    let request = PushRequest {
        module,
        requested_track: config.track.clone(),
        current_commit,
        default_branch: config.default_branch.clone(),
        ref_name: config.ref_name.clone(),
    };

    let mut workflow = Workflow::stdout(config.output_file.clone());
    let report = runtime()?.block_on(
        PushReconciler::new(&registry, &comparator).reconcile(&request, &mut workflow),
    )?;

    if let Some(outputs) = report.outputs {
        workflow
            .set_output("commit", outputs.commit.as_str())
            .context("failed to write step output")?;
        workflow
            .set_output("commit_url", &outputs.commit_url)
            .context("failed to write step output")?;
    }
    Ok(())
}
