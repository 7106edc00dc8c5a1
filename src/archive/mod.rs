//! Archive index: the object store that holds already-synced tracks.

pub mod error;
pub mod s3;

use std::path::Path;

pub use self::error::ArchiveError;

/// Destination for synced tracks.
#[async_trait::async_trait]
pub trait Archive: Send + Sync {
    /// Every key under `prefix`, across all listing pages, in listing order.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, ArchiveError>;

    /// Upload the file at `path` under `key`.
    async fn upload(&self, key: &str, path: &Path) -> Result<(), ArchiveError>;
}
