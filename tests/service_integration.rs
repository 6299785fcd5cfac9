//! Integration tests for the metadata service façade.

#[allow(dead_code)]
mod common;

use bedrock::{BedrockError, MetadataService};
use common::{
    service_with_nodes, test_config, wait_for_reclamation, FlakyChunkStore, RecordingChunkStore,
};
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test]
async fn test_idempotent_registration() {
    let store = RecordingChunkStore::new();
    let (service, _) = service_with_nodes(store, 0);

    let first = service.register_node("10.0.0.1", 4100, "datanode-1");
    let second = service.register_node("10.0.0.1", 4100, "datanode-1");

    assert_eq!(first, second);
    assert_eq!(service.stats().nodes, 1);
    assert_eq!(service.live_nodes().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_duplicate_nodes_under_concurrent_registration() {
    let store = RecordingChunkStore::new();
    let (service, _) = service_with_nodes(store, 0);
    let service = Arc::new(service);

    // Overlapping keys: 4 distinct nodes, each registered from 8 threads
    let handles: Vec<_> = (0..32u16)
        .map(|i| {
            let service = Arc::clone(&service);
            std::thread::spawn(move || service.register_node("10.0.0.1", 4100 + (i % 4), "dn"))
        })
        .collect();

    let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let unique: HashSet<_> = ids.iter().copied().collect();

    assert_eq!(unique.len(), 4);
    assert_eq!(service.stats().nodes, 4);
}

#[tokio::test]
async fn test_unique_file_names() {
    let store = RecordingChunkStore::new();
    let (service, _) = service_with_nodes(store, 1);

    service.create_file("data.bin", 1).unwrap();
    let result = service.create_file("data.bin", 2);
    assert!(matches!(result, Err(BedrockError::FileAlreadyExists(_))));

    // The name becomes available again once the file is gone
    service.delete_file("data.bin").await.unwrap();
    service.create_file("data.bin", 2).unwrap();
}

#[tokio::test]
async fn test_invalid_replica_count() {
    let store = RecordingChunkStore::new();
    let (service, _) = service_with_nodes(store, 1);

    let result = service.create_file("data.bin", 0);
    assert!(matches!(result, Err(BedrockError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_allocation_draws_from_live_set() {
    let store = RecordingChunkStore::new();
    let (service, node_ids) = service_with_nodes(store, 5);

    let file = service.create_file("data.bin", 3).unwrap();
    let allocation = service.create_chunk(file.id, 0, 1024).unwrap();

    assert_eq!(allocation.chunk.replica_count(), 3);
    assert!(!allocation.is_degraded());

    let live: HashSet<_> = node_ids.into_iter().collect();
    let unique: HashSet<_> = allocation.chunk.replicas.iter().copied().collect();
    assert_eq!(unique.len(), 3);
    assert!(unique.is_subset(&live));
}

#[tokio::test]
async fn test_under_replication_succeeds() {
    let store = RecordingChunkStore::new();
    let (service, _) = service_with_nodes(store, 1);

    let file = service.create_file("data.bin", 3).unwrap();
    let allocation = service.create_chunk(file.id, 0, 1024).unwrap();

    assert_eq!(allocation.chunk.replica_count(), 1);
    assert_eq!(allocation.desired_replicas, 3);
    assert!(allocation.is_degraded());
}

#[tokio::test]
async fn test_zero_live_nodes_fails_fast() {
    let store = RecordingChunkStore::new();
    let (service, _) = service_with_nodes(store, 0);

    let file = service.create_file("data.bin", 3).unwrap();
    let result = service.create_chunk(file.id, 0, 1024);

    assert!(matches!(result, Err(BedrockError::NoAvailableNodes)));
}

#[tokio::test]
async fn test_deletion_cascade() {
    let store = RecordingChunkStore::new();
    let (service, _) = service_with_nodes(store.clone(), 3);

    let file = service.create_file("data.bin", 2).unwrap();
    let c1 = service.create_chunk(file.id, 0, 1024).unwrap().chunk;
    let c2 = service.create_chunk(file.id, 1024, 1024).unwrap().chunk;

    let removed = service.delete_file("data.bin").await.unwrap();
    assert_eq!(removed.len(), 2);

    // Metadata is gone immediately, independent of reclamation progress
    assert!(matches!(
        service.get_file("data.bin"),
        Err(BedrockError::FileNotFound(_))
    ));
    assert!(service.get_chunk(c1.id).is_none());
    assert!(service.get_chunk(c2.id).is_none());
    assert_eq!(service.stats().chunks, 0);

    // Reclamation eventually contacts every replica node
    wait_for_reclamation(&service).await;
    let expected: usize = [&c1, &c2].iter().map(|c| c.replica_count()).sum();
    assert_eq!(store.removals().len(), expected);
}

#[tokio::test]
async fn test_delete_missing_file() {
    let store = RecordingChunkStore::new();
    let (service, _) = service_with_nodes(store, 1);

    let result = service.delete_file("ghost").await;
    assert!(matches!(result, Err(BedrockError::FileNotFound(_))));
}

#[tokio::test]
async fn test_reclamation_failures_do_not_resurrect_metadata() {
    // Store fails every call; removal is permanently unsuccessful
    let store = FlakyChunkStore::new(u64::MAX);
    let (service, _) = service_with_nodes(store.clone(), 2);

    let file = service.create_file("data.bin", 2).unwrap();
    service.create_chunk(file.id, 0, 1024).unwrap();

    service.delete_file("data.bin").await.unwrap();
    wait_for_reclamation(&service).await;

    let stats = service.stats();
    assert_eq!(stats.reclaim.failed, stats.reclaim.enqueued);
    assert_eq!(store.removal_count(), 0);

    // Catalog deletion stands regardless
    assert!(matches!(
        service.get_file("data.bin"),
        Err(BedrockError::FileNotFound(_))
    ));
    assert_eq!(stats.files, 0);
    assert_eq!(stats.chunks, 0);
}

#[tokio::test]
async fn test_reclamation_retries_transient_failures() {
    // First two calls fail, then everything succeeds
    let store = FlakyChunkStore::new(2);
    let (service, _) = service_with_nodes(store.clone(), 1);

    let file = service.create_file("data.bin", 1).unwrap();
    service.create_chunk(file.id, 0, 1024).unwrap();
    service.create_chunk(file.id, 1024, 1024).unwrap();

    service.delete_file("data.bin").await.unwrap();
    wait_for_reclamation(&service).await;

    let stats = service.stats().reclaim;
    assert_eq!(stats.removed, 2);
    assert_eq!(stats.failed, 0);
    assert!(stats.retries >= 2);
    assert_eq!(store.removal_count(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_chunk_creation_distinct_ids() {
    let store = RecordingChunkStore::new();
    let (service, _) = service_with_nodes(store, 3);
    let service = Arc::new(service);

    let file = service.create_file("data.bin", 2).unwrap();

    let handles: Vec<_> = (0..8u64)
        .map(|t| {
            let service = Arc::clone(&service);
            let file_id = file.id;
            std::thread::spawn(move || {
                (0..16u64)
                    .map(|i| {
                        service
                            .create_chunk(file_id, (t * 16 + i) * 1024, 1024)
                            .unwrap()
                            .chunk
                            .id
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    // No duplicates and no lost allocations
    let unique: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 128);
    assert_eq!(service.stats().chunks, 128);
    assert_eq!(service.get_file("data.bin").unwrap().chunks.len(), 128);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_create_delete_never_leaves_orphans() {
    let store = RecordingChunkStore::new();
    let (service, _) = service_with_nodes(store, 3);
    let service = Arc::new(service);

    let file = service.create_file("data.bin", 2).unwrap();

    let writer = {
        let service = Arc::clone(&service);
        let file_id = file.id;
        std::thread::spawn(move || {
            let mut created = 0u64;
            for i in 0..64u64 {
                if service.create_chunk(file_id, i * 1024, 1024).is_ok() {
                    created += 1;
                }
            }
            created
        })
    };

    // Delete the file while chunks are being created
    let _ = service.delete_file("data.bin").await;
    let created = writer.join().unwrap();

    // Chunks created before the delete are gone with the file; chunks
    // created after it must have failed with FileNotFound. Either way the
    // chunk table holds nothing for a file that no longer exists.
    assert!(created <= 64);
    assert_eq!(service.stats().files, 0);
    for chunk_id in 1..=64u64 {
        if let Some(chunk) = service.get_chunk(chunk_id) {
            panic!("orphaned chunk {} for deleted file", chunk.id);
        }
    }
}

#[tokio::test]
async fn test_deregistered_node_not_used_for_placement() {
    let store = RecordingChunkStore::new();
    let (service, node_ids) = service_with_nodes(store, 3);

    service.deregister_node("10.0.0.1", 4100);
    assert_eq!(service.live_nodes().len(), 2);

    let file = service.create_file("data.bin", 3).unwrap();
    let allocation = service.create_chunk(file.id, 0, 1024).unwrap();

    // Degraded to the two remaining nodes, never the removed one
    assert_eq!(allocation.chunk.replica_count(), 2);
    assert!(!allocation.chunk.replicas.contains(&node_ids[0]));
}

#[tokio::test]
async fn test_shutdown_completes_pending_reclamation() {
    let store = RecordingChunkStore::new();
    let (service, _) = service_with_nodes(store.clone(), 2);

    let file = service.create_file("data.bin", 2).unwrap();
    for i in 0..5u64 {
        service.create_chunk(file.id, i * 1024, 1024).unwrap();
    }

    service.delete_file("data.bin").await.unwrap();
    service.shutdown().await;

    // All 5 chunks x 2 replicas were torn down before shutdown returned
    assert_eq!(store.removals().len(), 10);
}

#[tokio::test]
async fn test_seeded_placement_is_reproducible() {
    let run = |seed: u64| async move {
        let store = RecordingChunkStore::new();
        let mut config = test_config();
        config.placement.seed = Some(seed);
        let service = MetadataService::new(config, store).unwrap();
        for i in 0..5u16 {
            service.register_node("10.0.0.1", 4100 + i, "dn");
        }
        let file = service.create_file("data.bin", 3).unwrap();
        service.create_chunk(file.id, 0, 1024).unwrap().chunk.replicas
    };

    assert_eq!(run(9).await, run(9).await);
}
