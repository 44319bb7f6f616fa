//! Static node inventory.
//!
//! One candidate per line as `name host port`. Blank lines and lines
//! starting with `#` are ignored.

use crate::error::{CoordinatorError, Result};
use corelib::node::{Node, NodeAddress};
use std::collections::HashSet;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryEntry {
    pub node: Node,
    pub alive: bool,
}

/// Candidate nodes in file order. Dead nodes are never revived.
#[derive(Clone, Debug, Default)]
pub struct Inventory {
    entries: Vec<InventoryEntry>,
}

impl Inventory {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CoordinatorError::InventoryIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut nodes = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let invalid = |reason: String| CoordinatorError::InvalidInventory { line: i + 1, reason };
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [name, host, port] = fields[..] else {
                return Err(invalid(format!("expected `name host port`, got {:?}", line)));
            };
            let port = port
                .parse::<u16>()
                .map_err(|e| invalid(format!("bad port {:?}: {}", port, e)))?;
            nodes.push(Node::new(name, NodeAddress::new(host, port)));
        }
        Self::from_nodes(nodes)
    }

    /// Rejects repeated addresses.
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self> {
        let mut seen = HashSet::new();
        for (i, node) in nodes.iter().enumerate() {
            if !seen.insert(&node.address) {
                return Err(CoordinatorError::InvalidInventory {
                    line: i + 1,
                    reason: format!("{} listed twice", node.address),
                });
            }
        }
        Ok(Self {
            entries: nodes
                .into_iter()
                .map(|node| InventoryEntry { node, alive: true })
                .collect(),
        })
    }

    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Alive addresses in inventory order.
    pub fn alive_addresses(&self) -> Vec<NodeAddress> {
        self.entries
            .iter()
            .filter(|entry| entry.alive)
            .map(|entry| entry.node.address.clone())
            .collect()
    }

    pub fn node(&self, address: &NodeAddress) -> Result<&Node> {
        self.entries
            .iter()
            .map(|entry| &entry.node)
            .find(|node| &node.address == address)
            .ok_or_else(|| CoordinatorError::UnknownNode(address.clone()))
    }

    /// Returns false if `address` was already dead or is not listed.
    pub fn mark_dead(&mut self, address: &NodeAddress) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|entry| &entry.node.address == address && entry.alive)
        {
            Some(entry) => {
                entry.alive = false;
                true
            }
            None => false,
        }
    }

    pub fn dead_count(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.alive).count()
    }

    /// Upper bound on the ring size.
    pub fn max_available(&self) -> usize {
        self.len() - self.dead_count()
    }
}
