//! Node abstractions for the ring.
//!
//! A node is identified on the wire and on the ring by its `host:port`
//! address. Its ring position is the MD5 token of that text.

use crate::error::Error;
use crate::partitioner::{Md5Partitioner, Partitioner};
use crate::token::Md5Token;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Network address of a storage node.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct NodeAddress {
    pub host: String,
    pub port: u16,
}

impl NodeAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Position of this node on the ring.
    pub fn token(&self) -> Md5Token {
        Md5Partitioner.address_token(self)
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for NodeAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidNode(format!("missing port in {:?}", s)))?;
        if host.is_empty() {
            return Err(Error::InvalidNode(format!("missing host in {:?}", s)));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| Error::InvalidNode(format!("bad port in {:?}: {}", s, e)))?;
        Ok(Self::new(host, port))
    }
}

/// Candidate node listed in the static inventory.
///
/// Keep this struct small and cheap to clone; liveness and connections
/// live with the coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    /// Human-readable name.
    pub name: String,
    pub address: NodeAddress,
}

impl Node {
    /// Construct a new node with basic metadata.
    pub fn new(name: impl Into<String>, address: NodeAddress) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}
