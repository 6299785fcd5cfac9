//! Replica placement policies.
//!
//! Placement is deliberately stateless about node topology: the default
//! policy picks replicas uniformly at random without replacement, with no
//! affinity or locality. The policy is an injectable seam so tests can pin
//! the RNG seed and assert on exact placements.

use crate::types::{NodeId, NodeInfo};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Strategy for choosing which nodes host a chunk's replicas.
pub trait PlacementPolicy: Send + Sync {
    /// Select up to `count` distinct node ids from the candidate set.
    ///
    /// Returns `min(count, candidates.len())` ids; fewer candidates than
    /// requested is the under-replication case, not an error.
    fn select(&self, candidates: &[NodeInfo], count: usize) -> Vec<NodeId>;
}

/// Uniform random placement without replacement.
pub struct RandomPlacement {
    rng: Mutex<StdRng>,
}

impl RandomPlacement {
    /// Placement seeded from system entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic placement for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl PlacementPolicy for RandomPlacement {
    fn select(&self, candidates: &[NodeInfo], count: usize) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = candidates.iter().map(|n| n.id).collect();
        ids.shuffle(&mut *self.rng.lock());
        ids.truncate(count.min(candidates.len()));
        ids
    }
}

impl Default for RandomPlacement {
    fn default() -> Self {
        Self::new()
    }
}
