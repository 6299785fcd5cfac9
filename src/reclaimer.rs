//! Asynchronous chunk reclamation.
//!
//! When a file is deleted its metadata is gone immediately, but the chunk
//! replicas still occupy space on data nodes. The reclaimer tears those
//! down in the background: a bounded pool of workers consumes one removal
//! task per `(chunk, node)` pair, retrying failures with exponential
//! backoff. A removal that still fails after the last attempt is counted
//! and logged, and that is the end of it: metadata deletion is final, and
//! physical teardown is best-effort. There is no ordering guarantee between
//! removals of different chunks or different replicas of the same chunk.

use crate::config::{ReclaimerConfig, RetryConfig};
use crate::error::{BedrockError, Result};
use crate::registry::NodeRegistry;
use crate::types::{ChunkId, ChunkMeta, NodeInfo};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Data-node collaborator interface.
///
/// Only the success/failure signal matters here; transport is the
/// implementor's concern.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Remove one chunk replica from one node.
    async fn remove_chunk(&self, node: &NodeInfo, chunk_id: ChunkId) -> Result<()>;
}

/// One unit of reclamation work.
struct RemovalTask {
    chunk_id: ChunkId,
    node: NodeInfo,
}

#[derive(Default)]
struct ReclaimCounters {
    enqueued: AtomicU64,
    removed: AtomicU64,
    retries: AtomicU64,
    failed: AtomicU64,
}

/// Snapshot of reclamation counters.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReclaimStats {
    /// Removal tasks accepted onto the queue.
    pub enqueued: u64,
    /// Replicas successfully removed.
    pub removed: u64,
    /// Retry attempts made.
    pub retries: u64,
    /// Tasks that failed permanently after exhausting retries.
    pub failed: u64,
}

impl ReclaimStats {
    /// Tasks that have reached a terminal state.
    pub fn settled(&self) -> u64 {
        self.removed + self.failed
    }
}

/// Tears down chunk replicas on data nodes after file deletion.
pub struct ChunkReclaimer {
    sender: parking_lot::Mutex<Option<mpsc::Sender<RemovalTask>>>,
    workers: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<ReclaimCounters>,
    registry: Arc<NodeRegistry>,
}

impl ChunkReclaimer {
    /// Start the worker pool. Must be called within a tokio runtime.
    pub fn new(
        store: Arc<dyn ChunkStore>,
        registry: Arc<NodeRegistry>,
        config: ReclaimerConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<RemovalTask>(config.queue_depth);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let counters = Arc::new(ReclaimCounters::default());

        let workers = (0..config.worker_count)
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let store = Arc::clone(&store);
                let counters = Arc::clone(&counters);
                let retry = config.retry.clone();
                tokio::spawn(async move {
                    run_worker(worker, rx, store, retry, counters).await;
                })
            })
            .collect();

        info!(
            workers = config.worker_count,
            queue_depth = config.queue_depth,
            "Chunk reclaimer started"
        );

        Self {
            sender: parking_lot::Mutex::new(Some(tx)),
            workers: parking_lot::Mutex::new(workers),
            counters,
            registry,
        }
    }

    /// Enqueue removal tasks for every replica of every given chunk.
    ///
    /// Blocks only on queue backpressure, never on node acknowledgements.
    /// Replicas on nodes that have since deregistered are skipped; there is
    /// nothing left to contact.
    pub async fn enqueue(&self, chunks: &[ChunkMeta]) -> Result<()> {
        let sender = self
            .sender
            .lock()
            .clone()
            .ok_or(BedrockError::QueueClosed)?;

        for chunk in chunks {
            for &node_id in &chunk.replicas {
                let Some(node) = self.registry.get(node_id) else {
                    debug!(
                        chunk_id = chunk.id,
                        node_id, "Replica node no longer registered, skipping removal"
                    );
                    continue;
                };

                sender
                    .send(RemovalTask {
                        chunk_id: chunk.id,
                        node,
                    })
                    .await
                    .map_err(|_| BedrockError::QueueClosed)?;
                self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
            }
        }

        Ok(())
    }

    /// Current reclamation counters.
    pub fn stats(&self) -> ReclaimStats {
        ReclaimStats {
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            removed: self.counters.removed.load(Ordering::Relaxed),
            retries: self.counters.retries.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Close the queue, drain remaining tasks, and join the workers.
    pub async fn shutdown(&self) {
        // Dropping the sender lets workers drain the queue and exit
        drop(self.sender.lock().take());

        let workers: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            let _ = worker.await;
        }

        info!("Chunk reclaimer shut down");
    }
}

async fn run_worker(
    worker: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<RemovalTask>>>,
    store: Arc<dyn ChunkStore>,
    retry: RetryConfig,
    counters: Arc<ReclaimCounters>,
) {
    loop {
        let task = { rx.lock().await.recv().await };
        let Some(task) = task else {
            debug!(worker, "Reclaim worker exiting");
            break;
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match store.remove_chunk(&task.node, task.chunk_id).await {
                Ok(()) => {
                    counters.removed.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        worker,
                        chunk_id = task.chunk_id,
                        node_id = task.node.id,
                        "Chunk replica removed"
                    );
                    break;
                }
                Err(e) if attempt < retry.max_attempts && e.is_retryable() => {
                    counters.retries.fetch_add(1, Ordering::Relaxed);
                    let delay = retry.delay_for_attempt(attempt);
                    debug!(
                        worker,
                        chunk_id = task.chunk_id,
                        node_id = task.node.id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Chunk removal failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        worker,
                        chunk_id = task.chunk_id,
                        node_id = task.node.id,
                        attempts = attempt,
                        error = %e,
                        "Chunk removal failed permanently"
                    );
                    break;
                }
            }
        }
    }
}
