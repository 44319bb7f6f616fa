//! Per-node replica assignment.
//!
//! On rings of three or more nodes every node pushes its writes to the two
//! entries after it and stores copies of the two entries before it.

use crate::strategy::simple::MIN_REPLICATED_RING;
use corelib::node::NodeAddress;
use corelib::ring::{HashRange, RingEntry, RingSnapshot};
use corelib::token::Md5Token;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicaAssignment {
    pub successor1: RingEntry,
    pub successor2: RingEntry,
    pub predecessor1: RingEntry,
    pub predecessor2: RingEntry,
}

impl ReplicaAssignment {
    /// Derives the assignment of the entry at `index`.
    ///
    /// Returns `None` for rings of two nodes or fewer, or an index past the
    /// end of the ring.
    pub fn derive(ring: &RingSnapshot, index: usize) -> Option<Self> {
        if ring.len() < MIN_REPLICATED_RING || index >= ring.len() {
            return None;
        }
        Some(Self {
            successor1: ring.successor_of(index, 1)?.clone(),
            successor2: ring.successor_of(index, 2)?.clone(),
            predecessor1: ring.predecessor_of(index, 1)?.clone(),
            predecessor2: ring.predecessor_of(index, 2)?.clone(),
        })
    }

    /// Derives the assignment of the node at `address`.
    pub fn for_node(ring: &RingSnapshot, address: &NodeAddress) -> Option<Self> {
        ring.position_of(address)
            .and_then(|index| Self::derive(ring, index))
    }

    pub fn successors(&self) -> [&NodeAddress; 2] {
        [&self.successor1.address, &self.successor2.address]
    }

    /// Ranges this node stores on behalf of its predecessors.
    pub fn replicated_ranges(&self) -> [HashRange; 2] {
        [self.predecessor1.range, self.predecessor2.range]
    }

    /// True if `token` falls in a range this node holds as a replica.
    pub fn holds_replica_of(&self, token: Md5Token) -> bool {
        self.replicated_ranges()
            .iter()
            .any(|range| range.contains(token))
    }
}
