use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::{StepError, TrackError};
use super::sanitize::sanitize_name;
use super::tagger::{Tagger, TrackTags};
use super::temp::{temp_stem, TempFile};
use crate::archive::Archive;
use crate::soundcloud::{Catalog, Track};

/// Archive key for a track: `<prefix>/<sanitized title>.mp3`.
pub fn archive_key(prefix: &str, track: &Track) -> String {
    format!("{}/{}.mp3", prefix, sanitize_name(&track.title))
}

/// Runs one track through download, tag, upload, and cleanup.
pub(crate) struct TrackProcessor<'a> {
    pub(crate) catalog: &'a dyn Catalog,
    pub(crate) archive: &'a dyn Archive,
    pub(crate) tagger: Arc<dyn Tagger>,
    pub(crate) work_dir: &'a Path,
    pub(crate) prefix: &'a str,
}

impl TrackProcessor<'_> {
    /// Process a track, returning the archive key it was uploaded under.
    ///
    /// `slot` is the track's position in the run queue and keeps its temp
    /// files distinct from every other in-flight track.
    pub(crate) async fn process(&self, slot: usize, track: &Track) -> Result<String, TrackError> {
        let stem = temp_stem(slot, &track.id.0);
        let media = TempFile::new(self.work_dir.join(format!("{}.mp3", stem)));
        let artwork_url = track.artwork_locator();
        let artwork = artwork_url
            .as_ref()
            .map(|_| TempFile::new(self.work_dir.join(format!("{}.jpg", stem))));

        tracing::debug!(track_id = %track.id, title = %track.title, "Processing");

        let media_download = async {
            self.catalog
                .download_media(track, media.path())
                .await
                .map_err(|e| TrackError::new(track, StepError::Media(e)))
        };
        let artwork_download = async {
            match (artwork_url.as_deref(), artwork.as_ref()) {
                (Some(url), Some(file)) => self
                    .catalog
                    .download_artwork(url, file.path())
                    .await
                    .map(Some)
                    .map_err(|e| TrackError::new(track, StepError::Artwork(e))),
                _ => Ok(None),
            }
        };
        let (media_bytes, artwork_bytes) = tokio::try_join!(media_download, artwork_download)?;
        tracing::debug!(
            track_id = %track.id,
            media_bytes,
            artwork_bytes = artwork_bytes.unwrap_or(0),
            "Downloaded"
        );

        let cover: Option<PathBuf> = artwork.as_ref().map(|a| a.path().to_path_buf());
        self.embed_tags(track, media.path().to_path_buf(), cover)
            .await
            .map_err(|e| TrackError::new(track, StepError::Tag(e)))?;

        if let Some(artwork) = artwork {
            artwork.release().await;
        }

        let key = archive_key(self.prefix, track);
        self.archive
            .upload(&key, media.path())
            .await
            .map_err(|e| TrackError::new(track, StepError::Upload(e)))?;

        media.release().await;
        Ok(key)
    }

    async fn embed_tags(
        &self,
        track: &Track,
        media: PathBuf,
        cover: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        let tagger = Arc::clone(&self.tagger);
        let tags = TrackTags::from_track(track);
        tokio::task::spawn_blocking(move || tagger.embed(&media, &tags, cover.as_deref()))
            .await
            .map_err(|e| anyhow::anyhow!("tagging task panicked: {}", e))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soundcloud::types::track_fixture;

    #[test]
    fn test_archive_key_uses_sanitized_title() {
        let track = track_fixture("1", "Intro: Part 1/2 🔥");
        assert_eq!(archive_key("sound-sync", &track), "sound-sync/Intro- Part 1-2 .mp3");
    }

    #[test]
    fn test_archive_key_nested_prefix() {
        let track = track_fixture("1", "My Song");
        assert_eq!(archive_key("music/soundcloud", &track), "music/soundcloud/My Song.mp3");
    }
}
