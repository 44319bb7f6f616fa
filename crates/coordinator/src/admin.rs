//! Coordinator side of the administrative protocol.

use crate::error::{CoordinatorError, Result};
use corelib::node::NodeAddress;
use std::time::Duration;
use streaming::{AdminMessage, Command, Connection, Frame};
use tracing::{debug, warn};

/// The reply that confirms `command`, if it has one.
pub fn success_reply(command: Command) -> Option<Command> {
    Some(match command {
        Command::Init => Command::InitSuccess,
        Command::Start => Command::StartSuccess,
        Command::Stop => Command::StopSuccess,
        Command::LockWrite => Command::LockWriteSuccess,
        Command::UnlockWrite => Command::UnlockWriteSuccess,
        Command::MoveData | Command::MoveDataReplicate => Command::MoveDataSuccess,
        Command::Update => Command::UpdateSuccess,
        Command::Replicate => Command::ReplicateSuccess,
        Command::Ping => Command::Echo,
        _ => return None,
    })
}

/// Persistent admin connection to one node.
#[derive(Debug)]
pub struct AdminLink {
    address: NodeAddress,
    conn: Connection,
}

impl AdminLink {
    /// Connects, retrying once after `retry_backoff`.
    pub async fn connect(address: NodeAddress, retry_backoff: Duration) -> Result<Self> {
        let conn = match Connection::connect(&address).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(node = %address, error = %e, backoff = ?retry_backoff, "connect failed, retrying once");
                tokio::time::sleep(retry_backoff).await;
                Connection::connect(&address)
                    .await
                    .map_err(|source| CoordinatorError::Unreachable {
                        address: address.clone(),
                        source,
                    })?
            }
        };
        debug!(node = %address, "admin link open");
        Ok(Self { address, conn })
    }

    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    pub async fn request(&mut self, message: AdminMessage) -> Result<Command> {
        let command = message.command;
        self.conn
            .request_admin(message)
            .await
            .map(|reply| reply.command)
            .map_err(|source| CoordinatorError::Streaming {
                address: self.address.clone(),
                command,
                source,
            })
    }

    /// Sends `message` and requires its success reply.
    pub async fn require(&mut self, message: AdminMessage) -> Result<()> {
        let command = message.command;
        let reply = self.request(message).await?;
        if Some(reply) == success_reply(command) {
            debug!(node = %self.address, ?command, "acknowledged");
            Ok(())
        } else {
            Err(CoordinatorError::Rejected {
                node: self.address.clone(),
                command,
                reply,
            })
        }
    }

    /// Sends without waiting for a reply.
    pub async fn notify(&mut self, message: AdminMessage) -> Result<()> {
        let command = message.command;
        self.conn
            .send(Frame::Admin(message))
            .await
            .map_err(|source| CoordinatorError::Streaming {
                address: self.address.clone(),
                command,
                source,
            })
    }

    pub async fn ping(&mut self) -> Result<()> {
        self.require(AdminMessage::new(Command::Ping)).await
    }
}
