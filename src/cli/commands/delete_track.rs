//! cli::commands::delete_track
//!
//! Delete the track a branch pushed to, typically when the branch is
//! deleted.
//!
//! # Example
//!
//! ```bash
//! buf-push-action delete-track --input proto --track feature/x
//! ```

use anyhow::Result;

use super::{registry_client, runtime};
use crate::cli::Context;
use crate::core::config::{ActionConfig, BufYaml, Inputs};
use crate::engine::{DeleteTrackRequest, TrackDeleter};
use crate::ui::output::Workflow;

/// Arguments of the delete-track command.
#[derive(Debug, Clone, Default)]
pub struct DeleteTrackArgs {
    pub input: Option<String>,
    pub track: Option<String>,
    pub default_branch: Option<String>,
    pub ref_name: Option<String>,
}

/// Run the delete-track command.
pub fn delete_track(ctx: &Context, args: DeleteTrackArgs) -> Result<()> {
    let config = ActionConfig::resolve(
        &ctx.env,
        &Inputs {
            input: args.input,
            track: args.track,
            default_branch: args.default_branch,
            // `--ref-name ""` still falls back to GITHUB_REF_NAME here.
            ref_name: args.ref_name.filter(|r| !r.trim().is_empty()),
        },
    )?;

    // Only the identity is needed; the module's files are not read.
    let (buf_yaml, _) = BufYaml::load(&config.input)?;
    let module = buf_yaml.module_identity()?;

    let registry = registry_client(&config, &module);
    let request = DeleteTrackRequest {
        module,
        requested_track: config.track.clone(),
        default_branch: config.default_branch.clone(),
        ref_name: config.ref_name.clone(),
    };

    let mut workflow = Workflow::stdout(config.output_file.clone());
    runtime()?.block_on(TrackDeleter::new(&registry).delete(&request, &mut workflow))?;
    Ok(())
}
