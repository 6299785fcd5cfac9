//! File catalog: logical files and the chunk table.
//!
//! Files and chunks live under one lock so that no reader ever observes a
//! file with a dangling chunk reference or a chunk without an owning file.
//! Deleting a file removes its metadata synchronously and hands the removed
//! chunks back for asynchronous reclamation; the catalog itself never waits
//! on data nodes.

use crate::error::{BedrockError, Result};
use crate::types::{ChunkId, ChunkMeta, FileId, FileMeta};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

#[derive(Default)]
struct CatalogInner {
    /// Files keyed by name (the external lookup key).
    files: HashMap<String, FileMeta>,
    /// File id to name, for id-based operations.
    names: HashMap<FileId, String>,
    /// Chunk table.
    chunks: HashMap<ChunkId, ChunkMeta>,
}

/// Tracks logical file to chunk-list associations.
pub struct FileCatalog {
    inner: RwLock<CatalogInner>,
    next_file_id: AtomicU64,
}

impl FileCatalog {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CatalogInner::default()),
            next_file_id: AtomicU64::new(1),
        }
    }

    /// Create a new file with the given desired replica count.
    pub fn create_file(&self, name: &str, replica_count: u32) -> Result<FileMeta> {
        if name.is_empty() {
            return Err(BedrockError::InvalidArgument(
                "File name must not be empty".to_string(),
            ));
        }
        if replica_count < 1 {
            return Err(BedrockError::InvalidArgument(format!(
                "Replica count must be >= 1, got {}",
                replica_count
            )));
        }

        let mut inner = self.inner.write();
        if inner.files.contains_key(name) {
            return Err(BedrockError::FileAlreadyExists(name.to_string()));
        }

        let id = self.next_file_id.fetch_add(1, Ordering::SeqCst);
        let file = FileMeta::new(id, name, replica_count);
        inner.names.insert(id, name.to_string());
        inner.files.insert(name.to_string(), file.clone());

        info!(file_id = id, name = %name, replicas = replica_count, "File created");
        Ok(file)
    }

    /// Delete a file and all of its chunk entries.
    ///
    /// Returns the removed chunks so the caller can schedule their physical
    /// teardown. The metadata removal is final once this returns.
    pub fn delete_file(&self, name: &str) -> Result<Vec<ChunkMeta>> {
        let mut inner = self.inner.write();

        let file = inner
            .files
            .remove(name)
            .ok_or_else(|| BedrockError::FileNotFound(name.to_string()))?;
        inner.names.remove(&file.id);

        let removed: Vec<ChunkMeta> = file
            .chunks
            .iter()
            .filter_map(|id| inner.chunks.remove(id))
            .collect();

        info!(
            file_id = file.id,
            name = %name,
            chunks = removed.len(),
            "File deleted"
        );
        Ok(removed)
    }

    /// Look up a file by name. Returns a point-in-time snapshot.
    pub fn get_file(&self, name: &str) -> Result<FileMeta> {
        self.inner
            .read()
            .files
            .get(name)
            .cloned()
            .ok_or_else(|| BedrockError::FileNotFound(name.to_string()))
    }

    /// Look up a file by id.
    pub fn get_file_by_id(&self, file_id: FileId) -> Result<FileMeta> {
        let inner = self.inner.read();
        inner
            .names
            .get(&file_id)
            .and_then(|name| inner.files.get(name))
            .cloned()
            .ok_or_else(|| BedrockError::FileNotFound(format!("file id {}", file_id)))
    }

    /// Names of all existing files, sorted.
    pub fn list_files(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().files.keys().cloned().collect();
        names.sort();
        names
    }

    /// Attach a freshly allocated chunk to its owning file.
    ///
    /// The file-existence check, the append to the file's chunk list, and
    /// the chunk-table insert happen in one critical section, so a chunk is
    /// never stored orphaned. Fails if the file was deleted between chunk
    /// allocation and insertion.
    pub(crate) fn insert_chunk(&self, chunk: ChunkMeta) -> Result<()> {
        let mut inner = self.inner.write();

        let name = inner
            .names
            .get(&chunk.file_id)
            .cloned()
            .ok_or_else(|| BedrockError::FileNotFound(format!("file id {}", chunk.file_id)))?;

        let file = inner
            .files
            .get_mut(&name)
            .ok_or_else(|| BedrockError::FileNotFound(name.clone()))?;
        file.chunks.push(chunk.id);

        debug!(
            chunk_id = chunk.id,
            file_id = chunk.file_id,
            replicas = chunk.replicas.len(),
            "Chunk attached"
        );
        inner.chunks.insert(chunk.id, chunk);
        Ok(())
    }

    /// Look up a chunk in the chunk table.
    pub fn get_chunk(&self, id: ChunkId) -> Option<ChunkMeta> {
        self.inner.read().chunks.get(&id).cloned()
    }

    /// Number of existing files.
    pub fn file_count(&self) -> usize {
        self.inner.read().files.len()
    }

    /// Number of chunks in the chunk table.
    pub fn chunk_count(&self) -> usize {
        self.inner.read().chunks.len()
    }
}

impl Default for FileCatalog {
    fn default() -> Self {
        Self::new()
    }
}
