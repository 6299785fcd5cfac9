//! Storage node registry with heartbeat-based liveness.
//!
//! A node is keyed by its `(host, port)` pair. Registration is idempotent:
//! the first call allocates a fresh [`NodeId`], every later call with the
//! same key refreshes liveness and returns the existing id. Lookup and
//! insert share one write lock, so concurrent registrations for the same
//! key can never allocate two ids.

use crate::types::{NodeId, NodeInfo, NodeKey};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

#[derive(Default)]
struct RegistryInner {
    /// Identity key to node id.
    ids: HashMap<NodeKey, NodeId>,
    /// Node id to node record.
    nodes: HashMap<NodeId, NodeInfo>,
}

/// Tracks storage node identity and liveness.
pub struct NodeRegistry {
    inner: RwLock<RegistryInner>,
    next_id: AtomicU64,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a node or refresh its liveness.
    ///
    /// Returns the node's stable id. Re-registration under the same
    /// `(host, port)` key updates `last_active` and the service name but
    /// never creates a duplicate entry.
    pub fn register_or_refresh(&self, host: &str, port: u16, service_name: &str) -> NodeId {
        let key = NodeKey::new(host, port);
        let mut inner = self.inner.write();

        if let Some(&id) = inner.ids.get(&key) {
            if let Some(node) = inner.nodes.get_mut(&id) {
                node.touch();
                if node.service_name != service_name {
                    node.service_name = service_name.to_string();
                }
            }
            debug!(node_id = id, key = %key, "Node heartbeat");
            return id;
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let node = NodeInfo {
            id,
            host: host.to_string(),
            port,
            service_name: service_name.to_string(),
            last_active: SystemTime::now(),
        };
        inner.ids.insert(key.clone(), id);
        inner.nodes.insert(id, node);

        info!(node_id = id, key = %key, service = %service_name, "Node registered");
        id
    }

    /// Remove a node by identity key. No-op if the node is unknown.
    pub fn remove(&self, host: &str, port: u16) {
        let key = NodeKey::new(host, port);
        let mut inner = self.inner.write();

        if let Some(id) = inner.ids.remove(&key) {
            inner.nodes.remove(&id);
            info!(node_id = id, key = %key, "Node deregistered");
        }
    }

    /// Snapshot of nodes whose last heartbeat is within the threshold.
    ///
    /// `None` means all registered nodes. The snapshot is consistent within
    /// one call; it is what the allocator places replicas against.
    pub fn live_nodes(&self, staleness: Option<Duration>) -> Vec<NodeInfo> {
        let inner = self.inner.read();
        inner
            .nodes
            .values()
            .filter(|n| staleness.map(|s| n.is_live(s)).unwrap_or(true))
            .cloned()
            .collect()
    }

    /// Remove and return nodes whose liveness has lapsed.
    ///
    /// Intended for periodic operator-driven sweeps; placement already
    /// ignores stale nodes via [`NodeRegistry::live_nodes`].
    pub fn evict_stale(&self, staleness: Duration) -> Vec<NodeInfo> {
        let mut inner = self.inner.write();

        let lapsed: Vec<NodeInfo> = inner
            .nodes
            .values()
            .filter(|n| !n.is_live(staleness))
            .cloned()
            .collect();

        for node in &lapsed {
            inner.ids.remove(&node.key());
            inner.nodes.remove(&node.id);
            warn!(node_id = node.id, key = %node.key(), "Node evicted after liveness timeout");
        }

        lapsed
    }

    /// Look up a node by id.
    pub fn get(&self, id: NodeId) -> Option<NodeInfo> {
        self.inner.read().nodes.get(&id).cloned()
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
