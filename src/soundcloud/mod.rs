//! SoundCloud catalog: OAuth password-grant login, identity lookup, and
//! cursor-paginated favorites/playlists listings flattened into the set of
//! tracks eligible for archiving.

pub mod client;
pub mod error;
pub mod types;

use std::path::Path;
use std::time::Duration;

pub use self::client::SoundCloudClient;
pub use self::error::CatalogError;
pub use self::types::{AccessToken, Track};

/// Connection settings for the catalog API.
#[derive(Clone)]
pub struct CatalogConfig {
    pub api_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

/// Remote source of tracks. The sync engine only talks to the catalog
/// through this trait so tests can substitute an in-memory catalog.
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    async fn authenticate(&self) -> Result<AccessToken, CatalogError>;

    /// Favorites followed by the tracks of every owned playlist, filtered to
    /// eligible tracks. Duplicates are not removed.
    async fn eligible_tracks(&self, token: &AccessToken) -> Result<Vec<Track>, CatalogError>;

    /// Download the track's audio to `dest`, returning the byte count.
    async fn download_media(&self, track: &Track, dest: &Path) -> Result<u64, CatalogError>;

    /// Download an artwork image to `dest`, returning the byte count.
    async fn download_artwork(&self, url: &str, dest: &Path) -> Result<u64, CatalogError>;
}
