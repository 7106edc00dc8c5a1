use clap::Parser;

use crate::sync::DEFAULT_CONCURRENCY;
use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "sound-sync",
    about = "Archive favorited and playlisted SoundCloud tracks to S3"
)]
pub struct Cli {
    /// SoundCloud application client id
    #[arg(long, env = "SOUNDCLOUD_CLIENT_ID")]
    pub client_id: String,

    /// SoundCloud application client secret
    #[arg(long, env = "SOUNDCLOUD_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// SoundCloud account username
    #[arg(short = 'u', long, env = "SOUNDCLOUD_USERNAME")]
    pub username: String,

    /// SoundCloud account password.
    /// WARNING: passing via --password is visible in process listings.
    /// Prefer the SOUNDCLOUD_PASSWORD environment variable instead.
    #[arg(short = 'p', long, env = "SOUNDCLOUD_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Destination bucket
    #[arg(long, env = "S3_BUCKET")]
    pub bucket: String,

    /// Bucket region (falls back to the AWS default chain)
    #[arg(long, env = "S3_REGION")]
    pub region: Option<String>,

    /// Static access key id (falls back to the AWS default chain)
    #[arg(long, env = "S3_ACCESS_KEY_ID")]
    pub access_key_id: Option<String>,

    /// Static secret access key
    #[arg(long, env = "S3_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_access_key: Option<String>,

    /// Custom endpoint for S3-compatible stores
    #[arg(long, env = "S3_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Key prefix under which tracks are archived
    #[arg(long, env = "SOUND_SYNC_PREFIX", default_value = "sound-sync")]
    pub prefix: String,

    /// Directory for temporary audio and artwork files
    #[arg(short = 'w', long, env = "SOUND_SYNC_WORK_DIR", default_value = "~/.sound-sync/tmp")]
    pub work_dir: String,

    /// Sync at most this many new tracks per run
    #[arg(long, env = "SOUND_SYNC_MAX_TRACKS")]
    pub max_tracks: Option<usize>,

    /// Number of tracks processed concurrently
    #[arg(long, env = "SOUND_SYNC_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Catalog HTTP timeout in seconds (whole request for API calls, per read for downloads)
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,

    /// Per-attempt timeout in seconds for archive listing and uploads
    #[arg(long, env = "SOUND_SYNC_UPLOAD_TIMEOUT", default_value_t = 600)]
    pub upload_timeout: u64,

    /// SoundCloud API base URL
    #[arg(long, default_value = "https://api.soundcloud.com")]
    pub api_url: String,

    /// OAuth token endpoint (default: <api-url>/oauth2/token)
    #[arg(long)]
    pub token_url: Option<String>,

    /// List the tracks that would be synced without downloading or uploading
    #[arg(long)]
    pub dry_run: bool,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress_bar: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}
