//! Core type definitions for the Bedrock metadata service.
//!
//! All identifiers are plain `u64` aliases generated by shared atomic
//! counters: strictly increasing, never reused. A node's *identity key* is
//! its `(host, port)` pair; the numeric [`NodeId`] is assigned on first
//! registration and stays stable for the node's registered lifetime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime};

/// Unique identifier for a storage node.
pub type NodeId = u64;

/// Unique identifier for a logical file.
pub type FileId = u64;

/// Unique identifier for a chunk.
pub type ChunkId = u64;

/// Identity key for a storage node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    pub host: String,
    pub port: u16,
}

impl NodeKey {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A registered storage node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: NodeId,
    pub host: String,
    pub port: u16,
    pub service_name: String,
    /// Refreshed on every heartbeat.
    pub last_active: SystemTime,
}

impl NodeInfo {
    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.host.clone(), self.port)
    }

    /// Whether the node heartbeated within the staleness threshold.
    ///
    /// A clock that appears to run backwards counts as live rather than
    /// evicting an otherwise healthy node.
    pub fn is_live(&self, staleness: Duration) -> bool {
        self.last_active
            .elapsed()
            .map(|since| since <= staleness)
            .unwrap_or(true)
    }

    /// Mark the node active now.
    pub fn touch(&mut self) {
        self.last_active = SystemTime::now();
    }
}

/// A logical file: a named, ordered sequence of chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMeta {
    pub id: FileId,
    /// External lookup key, unique among currently-existing files.
    pub name: String,
    /// Desired number of replicas per chunk.
    pub replica_count: u32,
    /// Chunk ids in creation order.
    pub chunks: Vec<ChunkId>,
}

impl FileMeta {
    pub fn new(id: FileId, name: impl Into<String>, replica_count: u32) -> Self {
        Self {
            id,
            name: name.into(),
            replica_count,
            chunks: Vec::new(),
        }
    }
}

/// A chunk: a fixed byte range of one file, replicated across nodes.
///
/// Offset and size are immutable once created. The replica list holds
/// distinct node ids; its length is `min(desired, live)` at creation time
/// and never exceeds the file's desired replica count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub id: ChunkId,
    pub file_id: FileId,
    pub offset: u64,
    pub size: u64,
    pub replicas: Vec<NodeId>,
}

impl ChunkMeta {
    pub fn new(id: ChunkId, file_id: FileId, offset: u64, size: u64) -> Self {
        Self {
            id,
            file_id,
            offset,
            size,
            replicas: Vec::new(),
        }
    }

    /// Number of nodes currently assigned to this chunk.
    pub fn replica_count(&self) -> usize {
        self.replicas.len()
    }
}
