//! The three faces a node shows to the network.
//!
//! Each connection handler is handed one value implementing all three and
//! routes frames to the matching capability.

use async_trait::async_trait;
use corelib::node::NodeAddress;
use corelib::ring::{HashRange, RingSnapshot};
use streaming::{Command, KvMessage, StatusType};

/// Client reads and writes, gated by the node's lifecycle flags.
#[async_trait]
pub trait ClientStorage: Send + Sync {
    /// A node that is not responsible attaches its current ring.
    async fn get(&self, key: &str) -> KvMessage;

    /// Writes `key`, or deletes it when `value` is empty or `null`.
    async fn put(&self, key: &str, value: &str) -> KvMessage;
}

/// Coordinator commands. Each returns the reply command.
#[async_trait]
pub trait ClusterControl: Send + Sync {
    async fn init(&self, ring: RingSnapshot) -> Command;
    async fn start(&self) -> Command;
    async fn stop(&self) -> Command;
    async fn lock_write(&self) -> Command;
    async fn unlock_write(&self) -> Command;
    async fn update(&self, ring: RingSnapshot) -> Command;
    async fn move_data(&self, range: HashRange, destination: NodeAddress, keep_local: bool) -> Command;
    async fn replicate(&self, range: HashRange, destination: NodeAddress) -> Command;
    /// Stops serving. No reply is sent.
    async fn shutdown(&self);
}

/// Node-to-node replica traffic. Never gated by client flags.
#[async_trait]
pub trait ReplicationTarget: Send + Sync {
    async fn replica_put(&self, key: &str, value: &str) -> StatusType;
    async fn delete_topological(&self) -> StatusType;
}
