//! Error types for the streaming crate.

use thiserror::Error;

/// Result type alias for the streaming crate.
pub type Result<T> = std::result::Result<T, StreamingError>;

#[derive(Debug, Error)]
pub enum StreamingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed frame: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("Frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },
    #[error("Connection closed by peer")]
    ConnectionClosed,
    #[error("Expected a {expected} frame")]
    UnexpectedFrame { expected: &'static str },
    #[error("Cipher failure: {0}")]
    Cipher(String),
}
