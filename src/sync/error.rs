use thiserror::Error;

use crate::archive::ArchiveError;
use crate::soundcloud::types::RemoteId;
use crate::soundcloud::{CatalogError, Track};

/// The step of a track's pipeline that failed.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("artwork download failed: {0}")]
    Artwork(#[source] CatalogError),

    #[error("media download failed: {0}")]
    Media(#[source] CatalogError),

    #[error("tagging failed: {0:#}")]
    Tag(#[source] anyhow::Error),

    #[error("upload failed: {0}")]
    Upload(#[source] ArchiveError),
}

/// A per-track failure. Recorded against the track and never aborts the run.
#[derive(Debug, Error)]
#[error("track {track_id} ('{title}'): {error}")]
pub struct TrackError {
    pub track_id: RemoteId,
    pub title: String,
    #[source]
    pub error: StepError,
}

impl TrackError {
    pub(crate) fn new(track: &Track, error: StepError) -> Self {
        Self {
            track_id: track.id.clone(),
            title: track.title.clone(),
            error,
        }
    }
}
