//! Error types for the coordinator.

use corelib::node::NodeAddress;
use std::path::PathBuf;
use streaming::{Command, StreamingError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoordinatorError>;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("cannot read inventory {path}: {source}")]
    InventoryIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("inventory line {line}: {reason}")]
    InvalidInventory { line: usize, reason: String },
    #[error("{0} is not in the inventory")]
    UnknownNode(NodeAddress),
    #[error("launching {node} failed: {reason}")]
    Launch { node: String, reason: String },
    #[error("cannot reach {address}: {source}")]
    Unreachable {
        address: NodeAddress,
        #[source]
        source: StreamingError,
    },
    #[error("{address} dropped {command:?}: {source}")]
    Streaming {
        address: NodeAddress,
        command: Command,
        #[source]
        source: StreamingError,
    },
    #[error("{node} answered {reply:?} to {command:?}")]
    Rejected {
        node: NodeAddress,
        command: Command,
        reply: Command,
    },
    #[error("no admin connection to {0}")]
    NoLink(NodeAddress),
    #[error("service is not initialized")]
    NotInitialized,
    #[error("service is already initialized")]
    AlreadyInitialized,
    #[error(transparent)]
    Ring(#[from] corelib::Error),
}

impl CoordinatorError {
    /// True when the peer could not be talked to at all.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            CoordinatorError::Unreachable { .. } | CoordinatorError::Streaming { .. }
        )
    }
}
