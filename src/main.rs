//! sound-sync: archive SoundCloud favorites and playlists to S3.
//!
//! Logs in with the OAuth password grant, collects every eligible track from
//! the user's favorites and playlists, skips the ones already present under
//! the archive prefix, and pushes the rest through a bounded pool of
//! download → tag → upload pipelines.

#![warn(clippy::all)]

mod archive;
mod cli;
mod config;
mod shutdown;
mod soundcloud;
mod sync;
mod types;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use archive::s3::S3Archive;
use soundcloud::SoundCloudClient;
use sync::tagger::LoftyTagger;
use sync::SyncEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = config::Config::from_cli(cli)?;
    tracing::debug!(?config, "Loaded configuration");
    tracing::info!(
        concurrency = config.concurrency,
        prefix = %config.prefix,
        bucket = %config.bucket,
        "Starting sound-sync"
    );

    let catalog = SoundCloudClient::new(config.catalog_config())?;
    let archive = S3Archive::connect(&config.s3_config()).await;
    let engine = SyncEngine::new(
        Box::new(catalog),
        Box::new(archive),
        Arc::new(LoftyTagger),
        config.sync_config(),
    );

    let shutdown_token = shutdown::install_signal_handler()?;
    let result = engine.run(shutdown_token.clone()).await?;

    if result.has_failures() {
        anyhow::bail!(
            "{} of {} tracks failed to sync",
            result.failed.len(),
            result.new
        );
    }
    if shutdown_token.is_cancelled() {
        tracing::info!("Shutdown requested, exiting...");
    }
    Ok(())
}
