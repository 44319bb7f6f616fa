use corelib::node::NodeAddress;
use streaming::StreamingError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot reach service at {address}: {source}")]
    Unreachable {
        address: NodeAddress,
        #[source]
        source: StreamingError,
    },
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },
    #[error("gave up on {key:?} after repeated redirects")]
    TooManyRedirects { key: String },
    #[error("not connected")]
    NotConnected,
}
