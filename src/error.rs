//! Error types for the Bedrock metadata service.
//!
//! All operation failures are recoverable by the caller; none of them crash
//! the service. Under-replication is deliberately *not* an error (see
//! [`crate::allocator::ChunkAllocation`]), and reclamation failures are
//! terminal from the catalog's point of view: they are reported through the
//! reclaim statistics and the log, never propagated back to `delete_file`.

use crate::types::{ChunkId, NodeId};
use std::io;
use thiserror::Error;

/// Main error type for Bedrock operations.
#[derive(Error, Debug)]
pub enum BedrockError {
    // Catalog errors
    #[error("File already exists: {0}")]
    FileAlreadyExists(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Allocation errors
    #[error("No available nodes for chunk placement")]
    NoAvailableNodes,

    // Reclamation errors
    #[error("Failed to remove chunk {chunk_id} from node {node_id}")]
    ChunkRemovalFailed { chunk_id: ChunkId, node_id: NodeId },

    #[error("Reclamation queue is closed")]
    QueueClosed,

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // External errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BedrockError {
    /// Check if the error is retryable.
    ///
    /// Drives the reclaimer's retry loop: a failed chunk removal is worth
    /// retrying, a missing file is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BedrockError::ChunkRemovalFailed { .. } | BedrockError::Io(_)
        )
    }
}

/// Result type alias for Bedrock operations.
pub type Result<T> = std::result::Result<T, BedrockError>;
