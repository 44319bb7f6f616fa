//! Successor replication for the key-value ring.
//!
//! This crate provides:
//! - Which nodes hold copies of a key (owner plus ring successors)
//! - Per-node replica assignment: two successors, two predecessors
//! - Live links that forward every write to both successors
//! - Range migration and bulk replication during topology changes

pub mod error;
pub mod link;
pub mod migration;
pub mod placement;
pub mod strategy;

pub use error::ReplicationError;
pub use link::{ReplicaLink, ReplicaLinks};
pub use migration::{move_range, replicate_range, MigrationReport};
pub use placement::ReplicaAssignment;
pub use strategy::{ReplicationStrategy, SimpleStrategy, MIN_REPLICATED_RING};
