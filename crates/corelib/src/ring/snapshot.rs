//! Ring snapshot computation and ownership lookup.

use crate::error::{Error, Result};
use crate::node::NodeAddress;
use crate::partitioner::{Md5Partitioner, Partitioner};
use crate::ring::range::HashRange;
use crate::token::{Md5Token, Token};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One node's slot on the ring.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct RingEntry {
    pub address: NodeAddress,
    pub range: HashRange,
}

impl RingEntry {
    /// True if this entry owns `token`.
    pub fn is_responsible(&self, token: Md5Token) -> bool {
        self.range.contains(token)
    }
}

/// Immutable ring: entries sorted by ascending range end.
///
/// Each entry ends at its node's own token and starts one past its
/// predecessor's end, so the entries tile the token space.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RingSnapshot {
    entries: Vec<RingEntry>,
}

impl RingSnapshot {
    /// Builds the ring for the first `desired` addresses of `alive`.
    ///
    /// # Arguments
    ///
    /// * `alive` - Alive addresses in inventory order
    /// * `desired` - Number of nodes the ring should hold
    ///
    /// # Returns
    ///
    /// A snapshot with exactly `desired` entries, or an error when fewer
    /// addresses are alive, `desired` is zero, or an address repeats.
    pub fn compute(alive: &[NodeAddress], desired: usize) -> Result<Self> {
        if desired == 0 {
            return Err(Error::RingOperation("a ring needs at least one node".into()));
        }
        if desired > alive.len() {
            return Err(Error::InsufficientNodes {
                requested: desired,
                available: alive.len(),
            });
        }

        let mut seen = HashSet::with_capacity(desired);
        let mut placed: Vec<(Md5Token, &NodeAddress)> = Vec::with_capacity(desired);
        for address in &alive[..desired] {
            let token = address.token();
            if !seen.insert(token) {
                return Err(Error::InvalidNode(format!("{} appears twice", address)));
            }
            placed.push((token, address));
        }
        placed.sort_by_key(|(token, _)| *token);

        let n = placed.len();
        let entries = (0..n)
            .map(|i| {
                let (end, address) = placed[i];
                let (prev_end, _) = placed[(i + n - 1) % n];
                RingEntry {
                    address: address.clone(),
                    range: HashRange::new(prev_end.successor(), end),
                }
            })
            .collect();

        Ok(Self { entries })
    }

    /// Wraps entries received from a peer, re-sorting them by range end.
    pub fn from_entries(mut entries: Vec<RingEntry>) -> Self {
        entries.sort_by_key(|entry| entry.range.end);
        Self { entries }
    }

    pub fn entries(&self) -> &[RingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RingEntry> {
        self.entries.get(index)
    }

    pub fn addresses(&self) -> impl Iterator<Item = &NodeAddress> {
        self.entries.iter().map(|entry| &entry.address)
    }

    /// Index of `address` on the ring, if it is a member.
    pub fn position_of(&self, address: &NodeAddress) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.address == address)
    }

    pub fn entry_for(&self, address: &NodeAddress) -> Option<&RingEntry> {
        self.position_of(address).map(|i| &self.entries[i])
    }

    /// The entry `steps` positions clockwise from `index`.
    pub fn successor_of(&self, index: usize, steps: usize) -> Option<&RingEntry> {
        let n = self.entries.len();
        if n == 0 {
            return None;
        }
        self.entries.get((index + steps % n) % n)
    }

    /// The entry `steps` positions counter-clockwise from `index`.
    pub fn predecessor_of(&self, index: usize, steps: usize) -> Option<&RingEntry> {
        let n = self.entries.len();
        if n == 0 {
            return None;
        }
        self.entries.get((index + n - steps % n) % n)
    }

    /// Index of the entry owning `token`.
    ///
    /// # Performance
    ///
    /// O(log n): the first entry whose end is at or past `token`, wrapping
    /// to the first entry when `token` lies past the last end.
    pub fn owner_index(&self, token: Md5Token) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = self.entries.partition_point(|entry| entry.range.end < token);
        Some(if idx == self.entries.len() { 0 } else { idx })
    }

    pub fn owner_of_token(&self, token: Md5Token) -> Option<&RingEntry> {
        self.owner_index(token).map(|i| &self.entries[i])
    }

    /// The entry responsible for `key`.
    pub fn owner_of(&self, key: &str) -> Option<&RingEntry> {
        self.owner_of_token(Md5Partitioner.key_token(key))
    }
}
