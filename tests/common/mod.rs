//! Common test utilities for integration tests.

use async_trait::async_trait;
use bedrock::{
    BedrockConfig, ChunkId, ChunkStore, MetadataService, NodeId, NodeInfo, Result,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Chunk store that records every removal it is asked to perform.
pub struct RecordingChunkStore {
    removed: Mutex<Vec<(NodeId, ChunkId)>>,
}

impl RecordingChunkStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            removed: Mutex::new(Vec::new()),
        })
    }

    /// Sorted `(node_id, chunk_id)` pairs removed so far.
    pub fn removals(&self) -> Vec<(NodeId, ChunkId)> {
        let mut removed = self.removed.lock().clone();
        removed.sort();
        removed
    }
}

#[async_trait]
impl ChunkStore for RecordingChunkStore {
    async fn remove_chunk(&self, node: &NodeInfo, chunk_id: ChunkId) -> Result<()> {
        self.removed.lock().push((node.id, chunk_id));
        Ok(())
    }
}

/// Chunk store that fails the first `failures` calls, then succeeds.
pub struct FlakyChunkStore {
    failures: u64,
    calls: AtomicU64,
    removed: Mutex<Vec<(NodeId, ChunkId)>>,
}

impl FlakyChunkStore {
    pub fn new(failures: u64) -> Arc<Self> {
        Arc::new(Self {
            failures,
            calls: AtomicU64::new(0),
            removed: Mutex::new(Vec::new()),
        })
    }

    pub fn removal_count(&self) -> usize {
        self.removed.lock().len()
    }
}

#[async_trait]
impl ChunkStore for FlakyChunkStore {
    async fn remove_chunk(&self, node: &NodeInfo, chunk_id: ChunkId) -> Result<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(bedrock::BedrockError::ChunkRemovalFailed {
                chunk_id,
                node_id: node.id,
            });
        }
        self.removed.lock().push((node.id, chunk_id));
        Ok(())
    }
}

/// Deterministic service config for tests.
pub fn test_config() -> BedrockConfig {
    let mut config = BedrockConfig::development();
    config.placement.seed = Some(42);
    config
}

/// Build a service with `node_count` registered nodes.
pub fn service_with_nodes(
    store: Arc<dyn ChunkStore>,
    node_count: u16,
) -> (MetadataService, Vec<NodeId>) {
    let service = MetadataService::new(test_config(), store).expect("valid test config");
    let ids = (0..node_count)
        .map(|i| service.register_node("10.0.0.1", 4100 + i, &format!("datanode-{}", i)))
        .collect();
    (service, ids)
}

/// Poll until all enqueued reclamation tasks settle or the timeout passes.
pub async fn wait_for_reclamation(service: &MetadataService) {
    for _ in 0..400 {
        let stats = service.stats().reclaim;
        if stats.settled() >= stats.enqueued {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("reclamation did not settle: {:?}", service.stats().reclaim);
}
