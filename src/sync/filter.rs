use super::sanitize::sanitize_name;
use crate::archive::{Archive, ArchiveError};
use crate::soundcloud::Track;

/// Result of diffing candidates against the archive.
#[derive(Debug, Default)]
pub struct FilterOutcome {
    /// Not yet archived, in discovery order, capped.
    pub new: Vec<Track>,
    pub already_archived: usize,
    /// Titles that sanitize to nothing and cannot be keyed.
    pub unnamed: usize,
    /// New tracks dropped by the cap.
    pub over_cap: usize,
}

/// List the archive once and keep the candidates whose sanitized name does
/// not occur inside any archived key.
///
/// Matching is substring containment, not equality, so that keys written
/// under older naming schemes still count as archived.
pub async fn filter_existing(
    archive: &dyn Archive,
    list_prefix: &str,
    candidates: Vec<Track>,
    max_tracks: Option<usize>,
) -> Result<FilterOutcome, ArchiveError> {
    let keys = archive.list_keys(list_prefix).await?;
    tracing::info!(archived = keys.len(), prefix = list_prefix, "Listed archive");
    Ok(partition_new(candidates, &keys, max_tracks))
}

pub(crate) fn partition_new(
    candidates: Vec<Track>,
    archived_keys: &[String],
    max_tracks: Option<usize>,
) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();

    for track in candidates {
        let name = sanitize_name(&track.title);
        if name.is_empty() {
            tracing::warn!(track_id = %track.id, title = %track.title, "Title sanitizes to an empty name, skipping");
            outcome.unnamed += 1;
            continue;
        }
        if archived_keys.iter().any(|key| key.contains(name.as_str())) {
            tracing::debug!(track_id = %track.id, name = %name, "Already archived");
            outcome.already_archived += 1;
            continue;
        }
        outcome.new.push(track);
    }

    if let Some(max) = max_tracks {
        if outcome.new.len() > max {
            outcome.over_cap = outcome.new.len() - max;
            outcome.new.truncate(max);
        }
    }

    outcome
}
