//! Bedrock - master metadata service for a distributed file store.
//!
//! Bedrock is the metadata authority of the store: it tracks which storage
//! nodes are alive, which logical files exist, how each file is split into
//! chunks, and which nodes hold replicas of each chunk. Data never flows
//! through it; clients talk to data nodes directly for chunk content.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 MetadataService                      │
//! ├──────────────┬──────────────┬───────────────────────┤
//! │ NodeRegistry │ FileCatalog  │ ChunkAllocator        │
//! │ (liveness)   │ (files +     │ (ids + placement)     │
//! │              │  chunk table)│                       │
//! ├──────────────┴──────────────┴───────────────────────┤
//! │ ChunkReclaimer: bounded workers, retry w/ backoff   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Each aggregate synchronizes independently; there is no global lock.
//! Deleting a file removes its metadata synchronously and hands physical
//! teardown to the reclaimer, which contacts data nodes asynchronously via
//! the [`ChunkStore`] collaborator trait.
//!
//! # Quick Start
//!
//! ```no_run
//! use bedrock::{BedrockConfig, ChunkStore, MetadataService};
//! use std::sync::Arc;
//!
//! # fn store() -> Arc<dyn ChunkStore> { unimplemented!() }
//! #[tokio::main]
//! async fn main() -> bedrock::Result<()> {
//!     let config = BedrockConfig::development();
//!     bedrock::telemetry::init(&config.telemetry)?;
//!
//!     let service = MetadataService::new(config, store())?;
//!     service.register_node("10.0.0.1", 4100, "datanode-1");
//!
//!     let file = service.create_file("logs/app.log", 3)?;
//!     let allocation = service.create_chunk(file.id, 0, 64 * 1024 * 1024)?;
//!     if allocation.is_degraded() {
//!         // fewer live nodes than desired replicas; still usable
//!     }
//!     Ok(())
//! }
//! ```

pub mod allocator;
pub mod catalog;
pub mod config;
pub mod error;
pub mod placement;
pub mod reclaimer;
pub mod registry;
pub mod service;
pub mod telemetry;
pub mod types;

// Re-exports
pub use allocator::ChunkAllocation;
pub use config::BedrockConfig;
pub use error::{BedrockError, Result};
pub use reclaimer::{ChunkStore, ReclaimStats};
pub use service::{MetadataService, ServiceStats};
pub use types::*;
