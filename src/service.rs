//! The metadata service façade.
//!
//! Owns all shared state (node registry, file catalog, chunk allocator,
//! chunk reclaimer) and exposes every boundary operation of the master.
//! Aggregates synchronize independently, so unrelated operations (a node
//! heartbeat and a file create, say) never contend on a shared lock, while
//! operations on the same node key, file name, or chunk id are totally
//! ordered by their aggregate's lock.

use crate::allocator::{ChunkAllocation, ChunkAllocator};
use crate::catalog::FileCatalog;
use crate::config::BedrockConfig;
use crate::error::Result;
use crate::placement::{PlacementPolicy, RandomPlacement};
use crate::reclaimer::{ChunkReclaimer, ChunkStore, ReclaimStats};
use crate::registry::NodeRegistry;
use crate::types::{ChunkMeta, FileId, FileMeta, NodeId, NodeInfo};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Point-in-time counters for the whole service.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub nodes: usize,
    pub files: usize,
    pub chunks: usize,
    pub reclaim: ReclaimStats,
}

/// The master metadata service of the distributed file store.
pub struct MetadataService {
    registry: Arc<NodeRegistry>,
    catalog: Arc<FileCatalog>,
    allocator: ChunkAllocator,
    reclaimer: ChunkReclaimer,
    staleness: Duration,
}

impl MetadataService {
    /// Build the service from configuration and the data-node collaborator.
    ///
    /// Must be called within a tokio runtime; the reclaimer spawns its
    /// worker pool immediately.
    pub fn new(config: BedrockConfig, store: Arc<dyn ChunkStore>) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(NodeRegistry::new());
        let catalog = Arc::new(FileCatalog::new());

        let policy: Arc<dyn PlacementPolicy> = match config.placement.seed {
            Some(seed) => Arc::new(RandomPlacement::seeded(seed)),
            None => Arc::new(RandomPlacement::new()),
        };

        let allocator = ChunkAllocator::new(
            Arc::clone(&registry),
            Arc::clone(&catalog),
            policy,
            Some(config.registry.staleness),
        );

        let reclaimer = ChunkReclaimer::new(store, Arc::clone(&registry), config.reclaimer);

        Ok(Self {
            registry,
            catalog,
            allocator,
            reclaimer,
            staleness: config.registry.staleness,
        })
    }

    /// Register a storage node or refresh its liveness (heartbeat).
    pub fn register_node(&self, host: &str, port: u16, service_name: &str) -> NodeId {
        self.registry.register_or_refresh(host, port, service_name)
    }

    /// Deregister a storage node. No-op if unknown.
    pub fn deregister_node(&self, host: &str, port: u16) {
        self.registry.remove(host, port);
    }

    /// Storage nodes currently considered live.
    pub fn live_nodes(&self) -> Vec<NodeInfo> {
        self.registry.live_nodes(Some(self.staleness))
    }

    /// Evict nodes whose liveness has lapsed; returns the evicted nodes.
    pub fn evict_stale_nodes(&self) -> Vec<NodeInfo> {
        self.registry.evict_stale(self.staleness)
    }

    /// Create a logical file.
    pub fn create_file(&self, name: &str, replica_count: u32) -> Result<FileMeta> {
        self.catalog.create_file(name, replica_count)
    }

    /// Delete a file and schedule teardown of its chunks.
    ///
    /// Catalog state is removed synchronously; once this returns, the file
    /// and its chunks are gone from the metadata and that is irreversible.
    /// Physical removal on data nodes happens asynchronously and
    /// best-effort; its failures never surface here.
    pub async fn delete_file(&self, name: &str) -> Result<Vec<ChunkMeta>> {
        let removed = self.catalog.delete_file(name)?;

        if let Err(e) = self.reclaimer.enqueue(&removed).await {
            // Metadata deletion already happened and stands; losing the
            // teardown tasks only leaks replicas on data nodes.
            warn!(
                file = %name,
                chunks = removed.len(),
                error = %e,
                "Failed to enqueue chunk reclamation"
            );
        }

        Ok(removed)
    }

    /// Create a chunk for a file and place its replicas on live nodes.
    pub fn create_chunk(&self, file_id: FileId, offset: u64, size: u64) -> Result<ChunkAllocation> {
        self.allocator.create_chunk(file_id, offset, size)
    }

    /// Look up a file by name.
    pub fn get_file(&self, name: &str) -> Result<FileMeta> {
        self.catalog.get_file(name)
    }

    /// Names of all existing files, sorted.
    pub fn list_files(&self) -> Vec<String> {
        self.catalog.list_files()
    }

    /// Look up a chunk descriptor.
    pub fn get_chunk(&self, chunk_id: u64) -> Option<ChunkMeta> {
        self.catalog.get_chunk(chunk_id)
    }

    /// Service-wide counters.
    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            nodes: self.registry.len(),
            files: self.catalog.file_count(),
            chunks: self.catalog.chunk_count(),
            reclaim: self.reclaimer.stats(),
        }
    }

    /// Stop the reclamation workers after draining queued tasks.
    pub async fn shutdown(&self) {
        self.reclaimer.shutdown().await;
    }
}
