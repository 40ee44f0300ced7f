// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session view of long-term memory.
//!
//! [`MemorySystem`] is shared process-wide and owns the backend and the
//! episodic writer. Each session gets a [`SessionMemory`] carrying its own
//! profile cache. No operation here aborts an exchange: failures are logged
//! and turned into "no memory".

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use maddy_config::model::MemoryConfig;
use maddy_core::error::MaddyError;
use maddy_core::traits::EmbeddingAdapter;
use maddy_core::types::{Collection, ProfileFacts};
use tracing::{debug, warn};

use crate::backend::MemoryBackend;
use crate::types::{format_episodic_block, parse_profile_lines, profile_document};
use crate::writer::{EpisodicJob, EpisodicWriter, WriterStats};

/// Process-wide memory services.
pub struct MemorySystem {
    backend: Arc<MemoryBackend>,
    writer: Option<Arc<EpisodicWriter>>,
    probe: String,
    profile_k: usize,
}

impl MemorySystem {
    /// Wraps `backend` and starts the episodic writer. Must run inside a tokio runtime.
    pub fn new(backend: Arc<MemoryBackend>, config: &MemoryConfig) -> Self {
        let writer = backend
            .is_enabled()
            .then(|| Arc::new(EpisodicWriter::spawn(backend.clone(), config.write_queue_capacity)));
        Self {
            backend,
            writer,
            probe: config.profile_probe.clone(),
            profile_k: config.profile_results,
        }
    }

    /// Builds the SQLite-backed system described by `config`, or a disabled one.
    pub fn from_config(config: &MemoryConfig, embedder: Arc<dyn EmbeddingAdapter>) -> Self {
        if !config.enabled {
            debug!("memory disabled by configuration");
            return Self::disabled();
        }
        let backend = Arc::new(MemoryBackend::sqlite(&config.path, embedder));
        Self::new(backend, config)
    }

    /// A system where every operation is a quiet no-op.
    pub fn disabled() -> Self {
        let defaults = MemoryConfig::default();
        Self {
            backend: Arc::new(MemoryBackend::disabled()),
            writer: None,
            probe: defaults.profile_probe,
            profile_k: defaults.profile_results,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_enabled()
    }

    pub fn backend(&self) -> &Arc<MemoryBackend> {
        &self.backend
    }

    /// Opens a fresh per-session view with an empty profile cache.
    pub fn session(&self) -> SessionMemory {
        SessionMemory {
            backend: self.backend.clone(),
            writer: self.writer.clone(),
            probe: self.probe.clone(),
            profile_k: self.profile_k,
            profile: Mutex::new(ProfileCache::default()),
        }
    }

    pub fn writer_stats(&self) -> WriterStats {
        self.writer.as_ref().map(|w| w.stats()).unwrap_or_default()
    }

    /// Drains the writer within `timeout`, then shuts the store down.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), MaddyError> {
        if let Some(writer) = &self.writer {
            writer.shutdown(timeout).await;
        }
        self.backend.shutdown().await
    }
}

#[derive(Debug, Default)]
struct ProfileCache {
    facts: ProfileFacts,
    loaded: bool,
}

/// Memory operations scoped to one session.
pub struct SessionMemory {
    backend: Arc<MemoryBackend>,
    writer: Option<Arc<EpisodicWriter>>,
    probe: String,
    profile_k: usize,
    profile: Mutex<ProfileCache>,
}

impl SessionMemory {
    /// Persists `facts` and merges them into the session cache.
    ///
    /// The cache is updated even when persistence fails, so the rest of the
    /// session still sees what the user just said.
    pub async fn write_profile(&self, facts: &ProfileFacts) {
        if let Err(e) = self.try_write_profile(facts).await {
            warn!(error = %e, "profile write failed; continuing without it");
        }
    }

    /// Like [`write_profile`](Self::write_profile) but reports persistence errors.
    pub async fn try_write_profile(&self, facts: &ProfileFacts) -> Result<(), MaddyError> {
        if facts.is_empty() {
            return Ok(());
        }
        self.merge(facts);
        if !self.backend.is_enabled() {
            return Ok(());
        }
        self.backend
            .add(Collection::Profile, profile_document(facts))
            .await?;
        debug!(keys = facts.len(), "profile facts persisted");
        Ok(())
    }

    fn merge(&self, facts: &ProfileFacts) {
        let mut cache = self.profile.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .facts
            .extend(facts.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Returns the cached profile, loading it from the store on first call.
    ///
    /// The load runs at most once per session, even if the search fails.
    /// Facts written earlier in the session take precedence over stored ones.
    pub async fn read_profile_cache(&self) -> ProfileFacts {
        {
            let cache = self.profile.lock().unwrap_or_else(PoisonError::into_inner);
            if cache.loaded {
                return cache.facts.clone();
            }
        }

        let result = if self.backend.is_enabled() {
            Some(
                self.backend
                    .search(Collection::Profile, &self.probe, self.profile_k)
                    .await,
            )
        } else {
            None
        };

        let mut cache = self.profile.lock().unwrap_or_else(PoisonError::into_inner);
        if !cache.loaded {
            cache.loaded = true;
            match result {
                Some(Ok(documents)) => {
                    for doc in &documents {
                        for (key, value) in parse_profile_lines(&doc.content) {
                            cache.facts.entry(key).or_insert(value);
                        }
                    }
                    debug!(documents = documents.len(), "profile cache loaded");
                }
                Some(Err(e)) => warn!(error = %e, "profile load failed; starting with an empty profile"),
                None => {}
            }
        }
        cache.facts.clone()
    }

    /// Returns the formatted episodic block for `query`, or `""` on no results or failure.
    pub async fn search_episodic(&self, query: &str, k: usize) -> String {
        if !self.backend.is_enabled() {
            return String::new();
        }
        match self.try_search_episodic(query, k).await {
            Ok(block) => block,
            Err(e) => {
                warn!(error = %e, "episodic search failed; continuing without memory");
                String::new()
            }
        }
    }

    /// Episodic search with the failure surfaced.
    pub async fn try_search_episodic(&self, query: &str, k: usize) -> Result<String, MaddyError> {
        let documents = self.backend.search(Collection::Episodic, query, k).await?;
        Ok(format_episodic_block(&documents))
    }

    /// Queues the exchange for background persistence. Never waits.
    pub fn write_episodic(&self, user_message: &str, reply: &str, model: &str) -> bool {
        let Some(writer) = &self.writer else {
            return false;
        };
        writer.schedule(EpisodicJob {
            user_message: user_message.to_string(),
            reply: reply.to_string(),
            model: model.to_string(),
        })
    }
}
