//! Stop-the-sync signal handling.
//!
//! The first SIGINT, SIGTERM, or SIGHUP cancels the token handed to
//! [`crate::sync::SyncEngine::run`]: queued tracks are not dispatched and are
//! reported as not started, while tracks already downloading finish and
//! clean up their temp files. Another signal aborts with tracks in flight.

use anyhow::Context;
use tokio_util::sync::CancellationToken;

/// Exit status for an abort, as for a process killed by SIGINT.
const ABORT_EXIT_CODE: i32 = 130;

/// Signal streams owned by the listener task.
struct StopSignals {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(unix)]
    hangup: tokio::signal::unix::Signal,
}

impl StopSignals {
    fn register() -> anyhow::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Ok(Self {
                terminate: signal(SignalKind::terminate()).context("Registering SIGTERM handler")?,
                hangup: signal(SignalKind::hangup()).context("Registering SIGHUP handler")?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Wait for the next stop signal and name it.
    async fn next(&mut self) -> std::io::Result<&'static str> {
        #[cfg(unix)]
        {
            tokio::select! {
                res = tokio::signal::ctrl_c() => res.map(|()| "SIGINT"),
                _ = self.terminate.recv() => Ok("SIGTERM"),
                _ = self.hangup.recv() => Ok("SIGHUP"),
            }
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await.map(|()| "Ctrl+C")
        }
    }
}

/// Start listening for stop signals. The returned token is cancelled on the
/// first one.
pub(crate) fn install_signal_handler() -> anyhow::Result<CancellationToken> {
    let mut signals = StopSignals::register()?;
    let token = CancellationToken::new();
    let stop = token.clone();

    tokio::spawn(async move {
        let mut received = 0u32;
        loop {
            let signal = match signals.next().await {
                Ok(signal) => signal,
                Err(e) => {
                    tracing::warn!("Stop signal listener failed: {}", e);
                    return;
                }
            };
            received += 1;
            if received == 1 {
                tracing::info!(signal, "Stopping: no new tracks will start, waiting for in-flight ones");
                tracing::info!("Send the signal again to abort immediately");
                stop.cancel();
            } else {
                tracing::warn!(signal, "Aborting with tracks in flight; their temp files may remain");
                std::process::exit(ABORT_EXIT_CODE);
            }
        }
    });

    Ok(token)
}
