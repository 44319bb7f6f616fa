//! Client library for the key-value ring.
//!
//! [`KvStore`] talks to one node at a time and follows
//! `SERVER_NOT_RESPONSIBLE` redirects using the ring snapshot the node
//! attaches to the reply.

pub mod error;
pub mod router;

pub use error::ClientError;
pub use router::{KvStore, DEFAULT_FALLBACK, MAX_KEY_LEN, MAX_REDIRECTS};
