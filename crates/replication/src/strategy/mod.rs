//! Replication strategy abstractions.
//!
//! Replication strategies determine how many copies of a key exist and
//! which ring members hold them.
//!
//! - **SimpleStrategy**: N copies placed sequentially around the ring

pub mod simple;

pub use simple::{SimpleStrategy, MIN_REPLICATED_RING};

use corelib::node::NodeAddress;
use corelib::partitioner::{Md5Partitioner, Partitioner};
use corelib::ring::RingSnapshot;
use corelib::token::Md5Token;

/// Trait for replication strategies.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (Send + Sync) as they are shared
/// by every connection task of a node.
pub trait ReplicationStrategy: Send + Sync + 'static {
    /// Get the number of copies this strategy keeps, owner included.
    fn replication_factor(&self) -> usize;

    /// Find the nodes holding `token`.
    ///
    /// # Arguments
    /// * `ring` - The ring snapshot to query
    /// * `token` - Position of the key
    ///
    /// # Returns
    /// Addresses holding a copy, owner first
    ///
    /// # Performance
    /// O(log n + r) where r = replication factor, n = ring size
    fn replicas_for_token(&self, ring: &RingSnapshot, token: Md5Token) -> Vec<NodeAddress>;

    /// Find the nodes holding `key`.
    fn replicas_for_key(&self, ring: &RingSnapshot, key: &str) -> Vec<NodeAddress> {
        self.replicas_for_token(ring, Md5Partitioner.key_token(key))
    }
}
