// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background persistence of exchange transcripts.
//!
//! Writes are queued on a bounded channel and drained by a single worker
//! task, so the reply path never waits on embedding or disk. A full queue
//! drops the newest job with a warning. Shutdown closes the queue and gives
//! the worker a bounded window to finish what is already queued.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use maddy_core::types::Collection;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::MemoryBackend;
use crate::types::episodic_document;

/// One exchange waiting to be persisted.
#[derive(Debug, Clone)]
pub struct EpisodicJob {
    pub user_message: String,
    pub reply: String,
    pub model: String,
}

/// Counters for the writer's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub scheduled: u64,
    pub written: u64,
    pub failed: u64,
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    scheduled: AtomicU64,
    written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> WriterStats {
        WriterStats {
            scheduled: self.scheduled.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Queue plus worker that persists episodic documents off the reply path.
pub struct EpisodicWriter {
    tx: Mutex<Option<mpsc::Sender<EpisodicJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl EpisodicWriter {
    /// Starts the worker. Must be called from within a tokio runtime.
    pub fn spawn(backend: Arc<MemoryBackend>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<EpisodicJob>(capacity.max(1));
        let counters = Arc::new(Counters::default());

        let worker_counters = counters.clone();
        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let doc = episodic_document(&job.user_message, &job.reply, &job.model);
                match backend.add(Collection::Episodic, doc).await {
                    Ok(()) => {
                        worker_counters.written.fetch_add(1, Ordering::Relaxed);
                        debug!("episodic memory written");
                    }
                    Err(e) => {
                        worker_counters.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(error = %e, "episodic memory write failed");
                    }
                }
            }
            debug!("episodic writer drained");
        });

        Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            counters,
        }
    }

    /// Enqueues a job without waiting. Returns false if it was dropped.
    pub fn schedule(&self, job: EpisodicJob) -> bool {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = guard.as_ref() else {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("episodic writer is shut down; dropping write");
            return false;
        };
        match tx.try_send(job) {
            Ok(()) => {
                self.counters.scheduled.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("episodic write queue full; dropping write");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("episodic writer stopped; dropping write");
                false
            }
        }
    }

    /// Closes the queue and waits up to `timeout` for queued writes to finish.
    ///
    /// Returns true if the worker drained in time. Calling it twice is harmless.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        drop(self.tx.lock().unwrap_or_else(PoisonError::into_inner).take());
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut worker) = worker else {
            return true;
        };

        match tokio::time::timeout(timeout, &mut worker).await {
            Ok(_) => {
                let stats = self.stats();
                info!(
                    written = stats.written,
                    failed = stats.failed,
                    dropped = stats.dropped,
                    "episodic writer stopped"
                );
                true
            }
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "episodic writer did not drain in time");
                worker.abort();
                false
            }
        }
    }

    pub fn stats(&self) -> WriterStats {
        self.counters.snapshot()
    }
}

impl Drop for EpisodicWriter {
    fn drop(&mut self) {
        let worker = self
            .worker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            worker.abort();
        }
    }
}
