// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that the server monitors. Queued memory writes are
//! drained before the process exits.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::orchestrator::Orchestrator;

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
/// The signal handler task runs in the background until the token is cancelled.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => token_clone.cancel(),
            _ = token_clone.cancelled() => {}
        }
        debug!("shutdown signal handler completed");
    });

    token
}

async fn wait_for_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                    _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler, listening for Ctrl+C only");
                let _ = ctrl_c.await;
                info!("received Ctrl+C, initiating shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("received Ctrl+C, initiating shutdown");
    }
}

/// Drains queued memory writes, waiting up to `timeout`, then shuts adapters down.
pub async fn drain(orchestrator: &Orchestrator, timeout: Duration) {
    info!(timeout_secs = timeout.as_secs(), "draining background memory writes");
    if let Err(e) = orchestrator.shutdown(timeout).await {
        warn!(error = %e, "error during shutdown");
    }
    let stats = orchestrator.memory().writer_stats();
    info!(
        written = stats.written,
        failed = stats.failed,
        dropped = stats.dropped,
        "shutdown complete"
    );
}
