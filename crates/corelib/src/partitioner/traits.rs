//! Placement of keys and nodes on the ring.

use crate::node::NodeAddress;
use crate::token::Token;

/// Maps bytes to ring positions.
///
/// Keys and node addresses must go through the same partitioner, otherwise
/// ownership checks on nodes and routing in clients disagree.
pub trait Partitioner: Send + Sync + 'static {
    type TokenType: Token;

    fn partition(&self, bytes: &[u8]) -> Self::TokenType;

    /// Position of a client key.
    fn key_token(&self, key: &str) -> Self::TokenType {
        self.partition(key.as_bytes())
    }

    /// Position of a node, hashed from its `host:port` form.
    fn address_token(&self, address: &NodeAddress) -> Self::TokenType {
        self.partition(address.to_string().as_bytes())
    }
}
