//! Simple replication strategy.
//!
//! Places N copies sequentially around the ring (clockwise from the owner).
//!
//! # Algorithm
//!
//! 1. Find the owner (first entry whose range end is at or past the token)
//! 2. Continue clockwise for N-1 more entries
//! 3. Return their addresses (owner first)
//!
//! Rings of two nodes or fewer are not replicated, so the owner alone is
//! returned for them.

use crate::strategy::ReplicationStrategy;
use corelib::node::NodeAddress;
use corelib::ring::RingSnapshot;
use corelib::token::Md5Token;

/// Smallest ring on which successor replication runs.
pub const MIN_REPLICATED_RING: usize = 3;

/// Simple replication strategy: N copies placed sequentially around the ring.
#[derive(Debug, Clone)]
pub struct SimpleStrategy {
    /// Number of copies to keep (including the owner).
    replication_factor: usize,
}

impl SimpleStrategy {
    /// Create a new simple strategy with the given replication factor.
    ///
    /// # Arguments
    /// * `replication_factor` - Number of copies
    ///   - 1: No replication (single copy)
    ///   - 3: Owner + two successor replicas
    pub fn new(replication_factor: usize) -> Self {
        Self { replication_factor }
    }
}

impl Default for SimpleStrategy {
    /// Owner plus two successors.
    fn default() -> Self {
        Self::new(3)
    }
}

impl ReplicationStrategy for SimpleStrategy {
    fn replication_factor(&self) -> usize {
        self.replication_factor
    }

    fn replicas_for_token(&self, ring: &RingSnapshot, token: Md5Token) -> Vec<NodeAddress> {
        if self.replication_factor == 0 {
            return Vec::new();
        }
        let Some(owner) = ring.owner_index(token) else {
            return Vec::new();
        };

        let copies = if ring.len() < MIN_REPLICATED_RING {
            1
        } else {
            self.replication_factor.min(ring.len())
        };

        (0..copies)
            .filter_map(|step| ring.successor_of(owner, step))
            .map(|entry| entry.address.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn ring(n: u16) -> RingSnapshot {
        let alive: Vec<NodeAddress> = (0..n)
            .map(|i| NodeAddress::new("127.0.0.1", 51000 + i))
            .collect();
        RingSnapshot::compute(&alive, n as usize).unwrap()
    }

    #[test]
    fn test_simple_strategy_replication_factor() {
        let strategy = SimpleStrategy::new(3);
        assert_eq!(strategy.replication_factor(), 3);
        assert_eq!(SimpleStrategy::default().replication_factor(), 3);
    }

    #[test]
    fn test_simple_strategy_replicas() {
        let ring = ring(5);
        let strategy = SimpleStrategy::new(3);
        let replicas = strategy.replicas_for_key(&ring, "test-key");

        assert_eq!(replicas.len(), 3);
        assert_eq!(&replicas[0], &ring.owner_of("test-key").unwrap().address);
        let unique: HashSet<_> = replicas.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_small_rings_are_not_replicated() {
        let strategy = SimpleStrategy::default();
        assert_eq!(strategy.replicas_for_key(&ring(1), "k").len(), 1);
        assert_eq!(strategy.replicas_for_key(&ring(2), "k").len(), 1);
        assert_eq!(strategy.replicas_for_key(&ring(3), "k").len(), 3);
        assert!(strategy
            .replicas_for_key(&RingSnapshot::default(), "k")
            .is_empty());
    }
}
