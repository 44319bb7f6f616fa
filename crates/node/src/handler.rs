//! Frame dispatch.

use crate::capabilities::{ClientStorage, ClusterControl, ReplicationTarget};
use streaming::{AdminMessage, Command, Frame, KvMessage, StatusType};
use tracing::debug;

/// Routes one frame to the capability that handles it.
///
/// Returns the reply, or `None` after SHUTDOWN, which gets no reply.
pub async fn dispatch<N>(node: &N, frame: Frame) -> Option<Frame>
where
    N: ClientStorage + ClusterControl + ReplicationTarget,
{
    match frame {
        Frame::Admin(message) => dispatch_admin(node, message)
            .await
            .map(|command| Frame::Admin(AdminMessage::new(command))),
        Frame::Kv(message) => Some(Frame::Kv(dispatch_kv(node, message).await)),
    }
}

async fn dispatch_admin<N>(node: &N, message: AdminMessage) -> Option<Command>
where
    N: ClusterControl,
{
    debug!(command = ?message.command, "admin request");
    let reply = match message.command {
        Command::Init => node.init(message.metadata).await,
        Command::Start => node.start().await,
        Command::Stop => node.stop().await,
        Command::LockWrite => node.lock_write().await,
        Command::UnlockWrite => node.unlock_write().await,
        Command::Update => node.update(message.metadata).await,
        Command::MoveData | Command::MoveDataReplicate => {
            let keep_local = message.command == Command::MoveDataReplicate;
            match (message.range, message.destination) {
                (Some(range), Some(destination)) => {
                    node.move_data(range, destination, keep_local).await
                }
                _ => Command::MoveDataFail,
            }
        }
        Command::Replicate => match (message.range, message.destination) {
            (Some(range), Some(destination)) => node.replicate(range, destination).await,
            _ => Command::ReplicateFail,
        },
        Command::Ping => Command::Echo,
        Command::Shutdown => {
            node.shutdown().await;
            return None;
        }
        _ => Command::Unknown,
    };
    Some(reply)
}

async fn dispatch_kv<N>(node: &N, message: KvMessage) -> KvMessage
where
    N: ClientStorage + ReplicationTarget,
{
    match message.status {
        StatusType::Get => node.get(&message.key).await,
        StatusType::Put => node.put(&message.key, &message.value).await,
        StatusType::ReplicaPut => {
            let status = node.replica_put(&message.key, &message.value).await;
            KvMessage::new(status, message.key, "")
        }
        StatusType::DeleteTopological => {
            KvMessage::new(node.delete_topological().await, message.key, "")
        }
        _ => KvMessage::new(StatusType::Unknown, message.key, ""),
    }
}
