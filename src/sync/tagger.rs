use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::picture::{Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};

use crate::soundcloud::Track;

/// Descriptive tags written into an archived file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: Option<String>,
    pub year: Option<i32>,
}

impl TrackTags {
    pub fn from_track(track: &Track) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.user.username.clone(),
            album: track.album().to_string(),
            genre: track
                .genre
                .as_deref()
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string),
            year: track.year(),
        }
    }
}

/// Embeds tags into a downloaded media file. Called from the blocking pool.
pub trait Tagger: Send + Sync {
    fn embed(&self, media: &Path, tags: &TrackTags, cover: Option<&Path>) -> Result<()>;
}

/// Writes the file's primary tag format (ID3v2 for MP3) with `lofty`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagger;

impl Tagger for LoftyTagger {
    fn embed(&self, media: &Path, tags: &TrackTags, cover: Option<&Path>) -> Result<()> {
        let mut tagged = Probe::open(media)
            .with_context(|| format!("Opening {}", media.display()))?
            .read()
            .with_context(|| format!("Reading audio from {}", media.display()))?;

        if tagged.primary_tag().is_none() {
            let tag_type = tagged.primary_tag_type();
            tagged.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged
            .primary_tag_mut()
            .context("Audio format does not support tags")?;

        tag.set_title(tags.title.clone());
        tag.set_artist(tags.artist.clone());
        tag.set_album(tags.album.clone());
        if let Some(genre) = &tags.genre {
            tag.set_genre(genre.clone());
        }
        if let Some(year) = tags.year {
            tag.insert_text(ItemKey::Year, year.to_string());
        }

        if let Some(cover) = cover {
            let mut reader = File::open(cover)
                .with_context(|| format!("Opening artwork {}", cover.display()))?;
            let mut picture = Picture::from_reader(&mut reader)
                .with_context(|| format!("Decoding artwork {}", cover.display()))?;
            picture.set_pic_type(PictureType::CoverFront);
            tag.remove_picture_type(PictureType::CoverFront);
            tag.push_picture(picture);
        }

        tagged
            .save_to_path(media, WriteOptions::default())
            .with_context(|| format!("Writing tags to {}", media.display()))?;

        tracing::debug!(path = %media.display(), title = %tags.title, "Embedded tags");
        Ok(())
    }
}
