//! Error types for the node.

use corelib::node::NodeAddress;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("cannot listen on {address}: {source}")]
    Bind {
        address: NodeAddress,
        #[source]
        source: std::io::Error,
    },
}
