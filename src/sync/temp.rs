use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A temporary file owned by one track's processing. The file is removed
/// when the guard is released or dropped, whichever comes first, so every
/// exit path of the pipeline cleans up.
///
/// Removal failures are logged and never change the track's outcome.
#[derive(Debug)]
pub(crate) struct TempFile {
    path: PathBuf,
    released: bool,
}

impl TempFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now.
    pub(crate) async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed temp file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Could not remove temp file {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed temp file on unwind"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Could not remove temp file {}: {}", self.path.display(), e),
        }
    }
}

/// Stem for a track's temp files. The queue slot keeps paths disjoint even
/// when the same track is queued twice (favorite and playlist entry).
pub(crate) fn temp_stem(slot: usize, track_id: &str) -> String {
    let id: String = track_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{}-{}", slot, id)
}
