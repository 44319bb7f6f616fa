//! Topology diffs between two ring snapshots.
//!
//! Membership changes by exactly one node at a time. Comparing the old and
//! new snapshot position by position finds that node and the ring
//! successor whose range it split off from or merged into.

use crate::error::{Error, Result};
use crate::ring::{RingEntry, RingSnapshot};

/// The node that joined or left, plus its ring successor.
///
/// `node` carries the entry from the ring it is a member of (the new ring
/// for a join, the old ring for a departure). `successor` always comes from
/// the new ring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopologyChange {
    pub node: RingEntry,
    pub successor: RingEntry,
}

impl TopologyChange {
    /// Finds the node inserted when growing from `old` to `new`.
    ///
    /// The first index where the two rings disagree holds the new node and
    /// the entry after it is its successor. With no disagreement the new
    /// node sorted last and its successor wraps to the first entry.
    pub fn joined(old: &RingSnapshot, new: &RingSnapshot) -> Result<Self> {
        if new.len() != old.len() + 1 {
            return Err(Error::Topology(format!(
                "join expects one extra node, got {} -> {}",
                old.len(),
                new.len()
            )));
        }
        let n = new.len();
        let index = old
            .entries()
            .iter()
            .zip(new.entries())
            .position(|(before, after)| before.address != after.address)
            .unwrap_or(n - 1);

        Ok(Self {
            node: new.entries()[index].clone(),
            successor: new.entries()[(index + 1) % n].clone(),
        })
    }

    /// Finds the node removed when shrinking from `old` to `new`.
    ///
    /// The first index where the two rings disagree holds the removed node in
    /// `old` and its successor in `new`. With no disagreement the removed node
    /// was last in `old` and its successor is the first entry of `new`.
    pub fn left(old: &RingSnapshot, new: &RingSnapshot) -> Result<Self> {
        if new.is_empty() || new.len() + 1 != old.len() {
            return Err(Error::Topology(format!(
                "departure expects one node fewer, got {} -> {}",
                old.len(),
                new.len()
            )));
        }
        let (node, successor) = match new
            .entries()
            .iter()
            .zip(old.entries())
            .position(|(after, before)| after.address != before.address)
        {
            Some(i) => (old.entries()[i].clone(), new.entries()[i].clone()),
            None => (old.entries()[old.len() - 1].clone(), new.entries()[0].clone()),
        };

        Ok(Self { node, successor })
    }
}
