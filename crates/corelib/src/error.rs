//! Error types for the core library.

use thiserror::Error;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Invalid token value
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    /// Invalid node configuration
    #[error("Invalid node: {0}")]
    InvalidNode(String),
    /// More nodes were requested than are alive
    #[error("Requested {requested} nodes but only {available} are available")]
    InsufficientNodes { requested: usize, available: usize },
    /// Ring operation failed
    #[error("Ring operation failed: {0}")]
    RingOperation(String),
    /// Topology error
    #[error("Topology error: {0}")]
    Topology(String),
}
