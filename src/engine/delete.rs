//! engine::delete
//!
//! Track deletion. The `main` track is never deleted.

use thiserror::Error;
use tracing::{debug, info};

use super::Notifier;
use crate::core::track::{resolve_track, MAIN_TRACK};
use crate::core::types::ModuleIdentity;
use crate::registry::{RegistryClient, RegistryError};

/// Errors from deleting a track.
#[derive(Debug, Error)]
pub enum DeleteTrackError {
    /// The repository or the track does not exist.
    #[error("{reference} does not exist")]
    NotFound { reference: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Inputs of a track deletion.
#[derive(Debug, Clone)]
pub struct DeleteTrackRequest {
    pub module: ModuleIdentity,
    pub requested_track: String,
    pub default_branch: String,
    pub ref_name: String,
}

/// What a deletion did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The track was deleted.
    Deleted { track: String },
    /// The request resolved to `main`; nothing was deleted.
    MainProtected,
}

/// Deletes non-main tracks.
pub struct TrackDeleter<'a> {
    registry: &'a dyn RegistryClient,
}

impl<'a> TrackDeleter<'a> {
    pub fn new(registry: &'a dyn RegistryClient) -> Self {
        Self { registry }
    }

    /// Delete the track `request` resolves to.
    pub async fn delete(
        &self,
        request: &DeleteTrackRequest,
        notifier: &mut dyn Notifier,
    ) -> Result<DeleteOutcome, DeleteTrackError> {
        let track = resolve_track(
            &request.requested_track,
            &request.default_branch,
            &request.ref_name,
        );
        if track == MAIN_TRACK {
            notifier.notice("Skipping because the main track can not be deleted from BSR");
            return Ok(DeleteOutcome::MainProtected);
        }

        debug!(
            module = %request.module,
            %track,
            registry = self.registry.name(),
            "deleting track"
        );
        match self.registry.delete_track(&request.module, &track).await {
            Ok(()) => {
                info!(%track, "track deleted");
                Ok(DeleteOutcome::Deleted { track })
            }
            Err(RegistryError::NotFound(_)) => Err(DeleteTrackError::NotFound {
                reference: request.module.reference(&track),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
