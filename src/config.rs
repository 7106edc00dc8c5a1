use std::path::PathBuf;
use std::time::Duration;

use crate::archive::s3::S3Config;
use crate::soundcloud::CatalogConfig;
use crate::sync::SyncConfig;

/// Application configuration.
///
/// Built once from the CLI and never mutated; each collaborator receives its
/// own slice of it through the `*_config()` accessors.
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub api_url: String,
    pub token_url: String,

    pub bucket: String,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint: Option<String>,

    pub prefix: String,
    pub work_dir: PathBuf,

    pub timeout: Duration,
    pub upload_timeout: Duration,
    pub max_tracks: Option<usize>,
    pub concurrency: usize,

    pub dry_run: bool,
    pub no_progress_bar: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("prefix", &self.prefix)
            .field("work_dir", &self.work_dir)
            .field("timeout", &self.timeout)
            .field("upload_timeout", &self.upload_timeout)
            .field("max_tracks", &self.max_tracks)
            .field("concurrency", &self.concurrency)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Strip leading and trailing slashes so keys can always be built as
/// `<prefix>/<name>.mp3`.
pub(crate) fn normalize_prefix(prefix: &str) -> anyhow::Result<String> {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        anyhow::bail!("Archive prefix must not be empty (got '{}')", prefix);
    }
    Ok(trimmed.to_string())
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        if cli.concurrency == 0 {
            anyhow::bail!("--concurrency must be at least 1");
        }
        if cli.timeout == 0 {
            anyhow::bail!("--timeout must be at least 1 second");
        }
        if cli.upload_timeout == 0 {
            anyhow::bail!("--upload-timeout must be at least 1 second");
        }
        if cli.access_key_id.is_some() != cli.secret_access_key.is_some() {
            anyhow::bail!("S3 access key id and secret access key must be given together");
        }

        let api_url = cli.api_url.trim_end_matches('/').to_string();
        let token_url = cli
            .token_url
            .unwrap_or_else(|| format!("{}/oauth2/token", api_url));

        Ok(Self {
            client_id: cli.client_id,
            client_secret: cli.client_secret,
            username: cli.username,
            password: cli.password,
            api_url,
            token_url,
            bucket: cli.bucket,
            region: cli.region,
            access_key_id: cli.access_key_id,
            secret_access_key: cli.secret_access_key,
            endpoint: cli.endpoint.filter(|e| !e.is_empty()),
            prefix: normalize_prefix(&cli.prefix)?,
            work_dir: expand_tilde(&cli.work_dir),
            timeout: Duration::from_secs(cli.timeout),
            upload_timeout: Duration::from_secs(cli.upload_timeout),
            max_tracks: cli.max_tracks,
            concurrency: cli.concurrency,
            dry_run: cli.dry_run,
            no_progress_bar: cli.no_progress_bar,
        })
    }

    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            api_url: self.api_url.clone(),
            token_url: self.token_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            timeout: self.timeout,
        }
    }

    pub fn s3_config(&self) -> S3Config {
        S3Config {
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            endpoint: self.endpoint.clone(),
            connect_timeout: self.timeout,
            operation_timeout: self.upload_timeout,
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            prefix: self.prefix.clone(),
            work_dir: self.work_dir.clone(),
            max_tracks: self.max_tracks,
            concurrency: self.concurrency,
            dry_run: self.dry_run,
            no_progress_bar: self.no_progress_bar,
        }
    }
}
