// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `maddy serve` command implementation.
//!
//! Builds the Gemini provider, the memory system and the orchestrator, then
//! serves the HTTP gateway until SIGINT or SIGTERM. Queued memory writes are
//! drained before the process exits.

use std::sync::Arc;
use std::time::Duration;

use maddy_agent::{Orchestrator, shutdown};
use maddy_config::MaddyConfig;
use maddy_context::Persona;
use maddy_core::MaddyError;
use maddy_gateway::AppState;
use maddy_gemini::{GeminiEmbedder, GeminiProvider};
use maddy_memory::MemorySystem;
use tracing::info;

/// Runs the `maddy serve` command.
pub async fn run_serve(config: MaddyConfig) -> Result<(), MaddyError> {
    init_tracing(&config.agent.log_level);

    info!(
        name = config.agent.name.as_str(),
        version = env!("CARGO_PKG_VERSION"),
        "starting maddy serve"
    );

    let orchestrator = build_orchestrator(&config).await?;
    let cancel = shutdown::install_signal_handler();

    let served = maddy_gateway::serve(
        &config.gateway,
        AppState::new(orchestrator.clone()),
        cancel.clone(),
    )
    .await;

    // Releases the signal task when the server stopped on its own.
    cancel.cancel();

    shutdown::drain(
        &orchestrator,
        Duration::from_secs(config.memory.drain_timeout_secs),
    )
    .await;
    log_allocator_stats();

    served?;
    info!("maddy serve shutdown complete");
    Ok(())
}

/// Assembles the orchestrator shared by `serve` and `shell`.
pub async fn build_orchestrator(config: &MaddyConfig) -> Result<Arc<Orchestrator>, MaddyError> {
    let provider = GeminiProvider::new(&config.gemini)?;

    let memory = if config.memory.enabled {
        let embedder = GeminiEmbedder::new(&config.gemini)?;
        MemorySystem::from_config(&config.memory, Arc::new(embedder))
    } else {
        info!("memory disabled by configuration");
        MemorySystem::disabled()
    };

    let persona = Persona::load(&config.agent).await;

    Ok(Arc::new(Orchestrator::new(
        Arc::new(provider),
        Arc::new(memory),
        persona,
        config,
    )))
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` takes precedence when set. Output goes to stderr so the
/// shell's replies stay clean on stdout.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("maddy={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(not(target_env = "msvc"))]
fn log_allocator_stats() {
    // Stats are cached until the epoch advances.
    let _ = tikv_jemalloc_ctl::epoch::advance();
    let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
    let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
    info!(
        allocated_mb = allocated / (1024 * 1024),
        resident_mb = resident / (1024 * 1024),
        "allocator stats at shutdown"
    );
}

#[cfg(target_env = "msvc")]
fn log_allocator_stats() {}
