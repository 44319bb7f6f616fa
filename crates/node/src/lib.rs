//! Storage node of the key-value ring.
//!
//! A node serves client reads and writes for its slice of the ring, keeps
//! replicas for its two predecessors, and obeys the coordinator's
//! administrative commands.

pub mod capabilities;
pub mod error;
pub mod handler;
pub mod server;
pub mod state;

pub use capabilities::{ClientStorage, ClusterControl, ReplicationTarget};
pub use error::NodeError;
pub use server::{NodeServer, ShutdownHandle};
pub use state::{NodeState, NodeTopology};
