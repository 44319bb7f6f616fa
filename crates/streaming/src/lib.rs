//! Wire protocol for the key-value ring.
//!
//! This crate provides the messages and transport shared by nodes, the
//! coordinator and clients:
//! - Client and replica key-value messages
//! - Coordinator administrative commands
//! - Carriage-return delimited frames with a pluggable cipher
//! - Framed request/response connections over TCP

pub mod codec;
pub mod connection;
pub mod error;
pub mod protocol;

pub use codec::{Cipher, FrameCodec, Plaintext};
pub use connection::Connection;
pub use error::StreamingError;
pub use protocol::{is_delete_value, AdminMessage, Command, Frame, KvMessage, StatusType};
