//! Core library for the partitioned key-value ring.
//!
//! This crate provides the fundamental abstractions shared by every node,
//! the coordinator and the client router:
//! - MD5 tokens and the partitioner that produces them
//! - Node addresses and inventory descriptors
//! - Ring snapshots with hash-range ownership
//! - Topology diffs between two snapshots
//! - The in-memory storage engine with hash-range queries

pub mod error;
pub mod node;
pub mod partitioner;
pub mod ring;
pub mod storage;
pub mod token;
pub mod topology;

pub use error::{Error, Result};
pub use node::{Node, NodeAddress};
pub use partitioner::{Md5Partitioner, Partitioner};
pub use ring::{HashRange, RingEntry, RingSnapshot};
pub use storage::{PutOutcome, Storage};
pub use token::{Md5Token, Token};
pub use topology::TopologyChange;
