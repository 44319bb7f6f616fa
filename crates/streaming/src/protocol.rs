//! Protocol messages.
//!
//! Two families share one connection type: key-value messages tagged with a
//! [`StatusType`], and administrative messages tagged with a [`Command`].

use corelib::node::NodeAddress;
use corelib::ring::{HashRange, RingSnapshot};
use serde::{Deserialize, Serialize};

/// Status of a key-value request or reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusType {
    Get,
    GetSuccess,
    GetError,
    Put,
    PutSuccess,
    PutUpdate,
    PutError,
    DeleteSuccess,
    DeleteError,
    ServerStopped,
    ServerWriteLock,
    ServerNotResponsible,
    ReplicaPut,
    ReplicaPutSuccess,
    ReplicaPutUpdate,
    ReplicaPutError,
    ReplicaDeleteSuccess,
    ReplicaDeleteError,
    DeleteTopological,
    #[serde(other)]
    Unknown,
}

impl StatusType {
    /// True for the two replies that confirm a stored value.
    pub fn is_put_success(self) -> bool {
        matches!(self, StatusType::PutSuccess | StatusType::PutUpdate)
    }

    pub fn is_replica_put_success(self) -> bool {
        matches!(self, StatusType::ReplicaPutSuccess | StatusType::ReplicaPutUpdate)
    }
}

/// Administrative command or reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    Init,
    InitSuccess,
    InitFail,
    Start,
    StartSuccess,
    StartFail,
    Stop,
    StopSuccess,
    StopFail,
    Shutdown,
    ShutdownSuccess,
    ShutdownFail,
    LockWrite,
    LockWriteSuccess,
    LockWriteFail,
    UnlockWrite,
    UnlockWriteSuccess,
    UnlockWriteFail,
    MoveData,
    MoveDataReplicate,
    MoveDataSuccess,
    MoveDataFail,
    Update,
    UpdateSuccess,
    UpdateFail,
    Replicate,
    ReplicateSuccess,
    ReplicateFail,
    Ping,
    Echo,
    #[serde(other)]
    Unknown,
}

/// A PUT carrying an empty value or `null` is a delete.
pub fn is_delete_value(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("null")
}

/// Key-value message.
///
/// `metadata` is only populated on `SERVER_NOT_RESPONSIBLE` replies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvMessage {
    pub key: String,
    #[serde(default)]
    pub value: String,
    pub status: StatusType,
    #[serde(default, skip_serializing_if = "RingSnapshot::is_empty")]
    pub metadata: RingSnapshot,
}

impl KvMessage {
    pub fn new(status: StatusType, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            status,
            metadata: RingSnapshot::default(),
        }
    }

    pub fn get(key: impl Into<String>) -> Self {
        Self::new(StatusType::Get, key, "")
    }

    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(StatusType::Put, key, value)
    }

    /// Replicated write. An empty value deletes on the replica.
    pub fn replica_put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(StatusType::ReplicaPut, key, value)
    }

    pub fn replica_delete(key: impl Into<String>) -> Self {
        Self::new(StatusType::ReplicaPut, key, "")
    }

    pub fn delete_topological() -> Self {
        Self::new(StatusType::DeleteTopological, "", "")
    }

    pub fn with_metadata(mut self, ring: RingSnapshot) -> Self {
        self.metadata = ring;
        self
    }

    /// True if this request deletes its key.
    pub fn is_delete(&self) -> bool {
        is_delete_value(&self.value)
    }
}

/// Administrative message exchanged between the coordinator and a node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminMessage {
    pub command: Command,
    #[serde(default, skip_serializing_if = "RingSnapshot::is_empty")]
    pub metadata: RingSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<NodeAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<HashRange>,
}

impl AdminMessage {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            metadata: RingSnapshot::default(),
            destination: None,
            range: None,
        }
    }

    pub fn init(ring: RingSnapshot) -> Self {
        Self::new(Command::Init).with_metadata(ring)
    }

    pub fn update(ring: RingSnapshot) -> Self {
        Self::new(Command::Update).with_metadata(ring)
    }

    /// MOVE_DATA, or MOVE_DATA_REPLICATE when the source keeps its copy.
    pub fn move_data(range: HashRange, destination: NodeAddress, keep_local: bool) -> Self {
        let command = if keep_local {
            Command::MoveDataReplicate
        } else {
            Command::MoveData
        };
        Self::new(command)
            .with_range(range)
            .with_destination(destination)
    }

    pub fn replicate(range: HashRange, destination: NodeAddress) -> Self {
        Self::new(Command::Replicate)
            .with_range(range)
            .with_destination(destination)
    }

    pub fn with_metadata(mut self, ring: RingSnapshot) -> Self {
        self.metadata = ring;
        self
    }

    pub fn with_destination(mut self, destination: NodeAddress) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_range(mut self, range: HashRange) -> Self {
        self.range = Some(range);
        self
    }
}

/// Anything that travels over a connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum Frame {
    Admin(AdminMessage),
    Kv(KvMessage),
}

impl From<AdminMessage> for Frame {
    fn from(message: AdminMessage) -> Self {
        Frame::Admin(message)
    }
}

impl From<KvMessage> for Frame {
    fn from(message: KvMessage) -> Self {
        Frame::Kv(message)
    }
}
