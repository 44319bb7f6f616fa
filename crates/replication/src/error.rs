//! Error types for replication and migration.

use corelib::node::NodeAddress;
use streaming::StreamingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error("cannot reach {address}: {source}")]
    Unreachable {
        address: NodeAddress,
        #[source]
        source: StreamingError,
    },
    #[error("transfer to {address} failed: {source}")]
    Transfer {
        address: NodeAddress,
        #[source]
        source: StreamingError,
    },
    #[error("replica {address} dropped a deletion notice: {source}")]
    Prune {
        address: NodeAddress,
        #[source]
        source: StreamingError,
    },
}
