//! Chunk allocation: identity assignment and replica node selection.
//!
//! Allocation fails fast with `NoAvailableNodes` when no node is live; it
//! never waits for nodes to appear. When fewer nodes are live than the
//! file's desired replica count, the chunk is created under-replicated and
//! the degradation is made explicit in the returned [`ChunkAllocation`]
//! rather than silently folded into success.

use crate::catalog::FileCatalog;
use crate::error::{BedrockError, Result};
use crate::placement::PlacementPolicy;
use crate::registry::NodeRegistry;
use crate::types::{ChunkMeta, FileId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of a chunk allocation.
///
/// Under-replication is degraded *success*: the chunk exists and is usable,
/// but callers that need full replication can check [`is_degraded`] and
/// react (re-replicate later, alert, or treat it as fatal themselves).
///
/// [`is_degraded`]: ChunkAllocation::is_degraded
#[derive(Debug, Clone)]
pub struct ChunkAllocation {
    /// The created chunk, including its assigned replica nodes.
    pub chunk: ChunkMeta,
    /// The owning file's desired replica count at allocation time.
    pub desired_replicas: u32,
}

impl ChunkAllocation {
    /// Whether the chunk received fewer replicas than desired.
    pub fn is_degraded(&self) -> bool {
        self.chunk.replica_count() < self.desired_replicas as usize
    }
}

/// Assigns chunk identity and selects replica nodes.
pub struct ChunkAllocator {
    registry: Arc<NodeRegistry>,
    catalog: Arc<FileCatalog>,
    policy: Arc<dyn PlacementPolicy>,
    /// Liveness threshold applied when snapshotting candidate nodes.
    staleness: Option<Duration>,
    next_chunk_id: AtomicU64,
}

impl ChunkAllocator {
    pub fn new(
        registry: Arc<NodeRegistry>,
        catalog: Arc<FileCatalog>,
        policy: Arc<dyn PlacementPolicy>,
        staleness: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            catalog,
            policy,
            staleness,
            next_chunk_id: AtomicU64::new(1),
        }
    }

    /// Create a chunk for `file_id` covering `[offset, offset + size)`.
    ///
    /// Offset and size are opaque here; the catalog does not track file
    /// length. The live-node snapshot is taken once, so a node removed
    /// mid-allocation cannot yield a chunk pointing at a node the snapshot
    /// never contained.
    pub fn create_chunk(
        &self,
        file_id: FileId,
        offset: u64,
        size: u64,
    ) -> Result<ChunkAllocation> {
        let file = self.catalog.get_file_by_id(file_id)?;
        let desired = file.replica_count;

        let live = self.registry.live_nodes(self.staleness);
        if live.is_empty() {
            return Err(BedrockError::NoAvailableNodes);
        }

        let replicas = self.policy.select(&live, desired as usize);

        let id = self.next_chunk_id.fetch_add(1, Ordering::SeqCst);
        let mut chunk = ChunkMeta::new(id, file_id, offset, size);
        chunk.replicas = replicas;

        // May race with a concurrent delete_file; the catalog re-checks the
        // file under its own lock. A lost race burns the chunk id, which is
        // fine: ids are unique, not dense.
        self.catalog.insert_chunk(chunk.clone())?;

        let allocation = ChunkAllocation {
            chunk,
            desired_replicas: desired,
        };

        if allocation.is_degraded() {
            warn!(
                chunk_id = allocation.chunk.id,
                file_id,
                assigned = allocation.chunk.replica_count(),
                desired,
                "Chunk created under-replicated"
            );
        } else {
            debug!(
                chunk_id = allocation.chunk.id,
                file_id,
                replicas = allocation.chunk.replica_count(),
                "Chunk created"
            );
        }

        Ok(allocation)
    }
}
