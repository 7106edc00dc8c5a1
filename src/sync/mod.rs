//! Sync engine: authenticate, enumerate the catalog, diff it against the
//! archive, then fan the new tracks out over a bounded window of
//! download → tag → upload pipelines.
//!
//! Every settlement flows back to the loop in [`SyncEngine::run`], which is
//! the only place the [`SyncResult`] is mutated.

pub mod error;
pub mod filter;
pub mod processor;
pub mod sanitize;
pub mod tagger;
pub(crate) mod temp;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures_util::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use crate::archive::Archive;
use crate::soundcloud::Catalog;

pub use self::error::TrackError;
use self::processor::TrackProcessor;
use self::tagger::Tagger;

/// Default number of tracks processed at once.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Subset of application config consumed by the sync engine.
/// Decoupled from CLI parsing so the engine can be tested independently.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Archive key prefix without a trailing slash.
    pub(crate) prefix: String,
    pub(crate) work_dir: PathBuf,
    pub(crate) max_tracks: Option<usize>,
    pub(crate) concurrency: usize,
    pub(crate) dry_run: bool,
    pub(crate) no_progress_bar: bool,
}

/// Outcome of one run.
#[derive(Debug, Default)]
pub struct SyncResult {
    /// Eligible tracks returned by the catalog.
    pub discovered: usize,
    pub already_archived: usize,
    /// Tracks whose titles sanitize to nothing.
    pub unnamed: usize,
    /// New tracks left out by `max_tracks`.
    pub over_cap: usize,
    /// Tracks selected for this run.
    pub new: usize,
    /// Archive keys written this run.
    pub synced: Vec<String>,
    pub failed: Vec<TrackError>,
    /// Selected tracks never dispatched because of shutdown.
    pub not_started: usize,
}

impl SyncResult {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

pub struct SyncEngine {
    catalog: Box<dyn Catalog>,
    archive: Box<dyn Archive>,
    tagger: Arc<dyn Tagger>,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(
        catalog: Box<dyn Catalog>,
        archive: Box<dyn Archive>,
        tagger: Arc<dyn Tagger>,
        config: SyncConfig,
    ) -> Self {
        Self {
            catalog,
            archive,
            tagger,
            config,
        }
    }

    /// Run one full sync.
    ///
    /// Authentication, catalog listing, and archive listing failures abort
    /// the run with an error. Per-track failures are collected in the
    /// returned [`SyncResult`].
    pub async fn run(&self, shutdown_token: CancellationToken) -> Result<SyncResult> {
        let started = Instant::now();
        let config = &self.config;

        tokio::fs::create_dir_all(&config.work_dir)
            .await
            .with_context(|| format!("Creating work directory {}", config.work_dir.display()))?;

        let token = self
            .catalog
            .authenticate()
            .await
            .context("Authenticating with SoundCloud")?;
        tracing::info!("Authenticated");

        let mut tracks = self
            .catalog
            .eligible_tracks(&token)
            .await
            .context("Listing SoundCloud tracks")?;
        tracks.retain(|t| t.is_eligible());

        let mut result = SyncResult {
            discovered: tracks.len(),
            ..SyncResult::default()
        };
        tracing::info!(discovered = result.discovered, "Fetched eligible tracks");

        let list_prefix = format!("{}/", config.prefix);
        let outcome =
            filter::filter_existing(self.archive.as_ref(), &list_prefix, tracks, config.max_tracks)
                .await
                .context("Listing archived tracks")?;
        result.already_archived = outcome.already_archived;
        result.unnamed = outcome.unnamed;
        result.over_cap = outcome.over_cap;
        result.new = outcome.new.len();

        if config.dry_run {
            for track in &outcome.new {
                tracing::info!(
                    "[DRY RUN] Would sync {} ({}) to {}",
                    track.title,
                    track.id,
                    processor::archive_key(&config.prefix, track)
                );
            }
            log_summary(&result, config, started.elapsed());
            return Ok(result);
        }

        if outcome.new.is_empty() {
            tracing::info!("No new tracks to sync");
            log_summary(&result, config, started.elapsed());
            return Ok(result);
        }

        let processor = TrackProcessor {
            catalog: self.catalog.as_ref(),
            archive: self.archive.as_ref(),
            tagger: Arc::clone(&self.tagger),
            work_dir: &config.work_dir,
            prefix: &config.prefix,
        };
        let processor = &processor;

        let pb = create_progress_bar(config.no_progress_bar, result.new as u64);
        let settled = stream::iter(outcome.new.into_iter().enumerate())
            .take_while(|_| std::future::ready(!shutdown_token.is_cancelled()))
            .map(|(slot, track)| async move {
                let settlement = processor.process(slot, &track).await;
                (track, settlement)
            })
            .buffer_unordered(config.concurrency.max(1));
        tokio::pin!(settled);

        while let Some((track, settlement)) = settled.next().await {
            pb.set_message(track.title.clone());
            match settlement {
                Ok(key) => {
                    pb.suspend(|| tracing::info!(track_id = %track.id, key = %key, "Synced"));
                    result.synced.push(key);
                }
                Err(e) => {
                    pb.suspend(|| tracing::error!("Sync failed: {}", e));
                    result.failed.push(e);
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        result.not_started = result.new - result.synced.len() - result.failed.len();
        if result.not_started > 0 {
            tracing::info!(
                not_started = result.not_started,
                "Shutdown requested, remaining tracks were not started"
            );
        }

        log_summary(&result, config, started.elapsed());
        Ok(result)
    }
}

fn log_summary(result: &SyncResult, config: &SyncConfig, elapsed: Duration) {
    if config.dry_run {
        tracing::info!("── Dry Run Summary ──");
        tracing::info!(
            "  {} discovered, {} already archived, {} would be synced",
            result.discovered,
            result.already_archived,
            result.new
        );
    } else {
        tracing::info!("── Summary ──");
        tracing::info!(
            "  {} discovered, {} already archived, {} new",
            result.discovered,
            result.already_archived,
            result.new
        );
        tracing::info!(
            "  {} synced, {} failed, {} not started",
            result.synced.len(),
            result.failed.len(),
            result.not_started
        );
    }
    if result.unnamed > 0 {
        tracing::info!("  {} skipped with unusable titles", result.unnamed);
    }
    if result.over_cap > 0 {
        tracing::info!("  {} deferred by the track cap", result.over_cap);
    }
    for failure in &result.failed {
        tracing::error!("  failed: {}", failure);
    }
    tracing::info!("  prefix: {}/", config.prefix);
    tracing::info!("  elapsed: {}", format_duration(elapsed));
}

/// Create a progress bar with a consistent template.
///
/// Returns `ProgressBar::hidden()` when the user passed `--no-progress-bar` or
/// stdout is not a TTY (e.g. piped output, cron jobs).
fn create_progress_bar(no_progress_bar: bool, total: u64) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    match ProgressStyle::with_template(
        "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    ) {
        Ok(style) => pb.set_style(style.progress_chars("=> ")),
        Err(e) => tracing::debug!("Falling back to default progress style: {}", e),
    }
    pb
}

fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
