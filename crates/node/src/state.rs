//! Per-node state.
//!
//! One `NodeState` is built when the node starts and shared by every
//! connection task. It implements all three capabilities.

use crate::capabilities::{ClientStorage, ClusterControl, ReplicationTarget};
use async_trait::async_trait;
use corelib::node::NodeAddress;
use corelib::ring::{HashRange, RingEntry, RingSnapshot};
use corelib::storage::{PutOutcome, Storage};
use corelib::token::Md5Token;
use parking_lot::RwLock;
use replication::{
    move_range, replicate_range, ReplicaAssignment, ReplicaLink, ReplicaLinks,
    ReplicationStrategy, SimpleStrategy,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use streaming::{is_delete_value, Command, Connection, KvMessage, StatusType};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

/// The ring as seen by one node.
#[derive(Clone, Debug)]
pub struct NodeTopology {
    pub ring: RingSnapshot,
    pub entry: RingEntry,
    pub assignment: Option<ReplicaAssignment>,
}

impl NodeTopology {
    /// `None` when `address` is not on `ring`.
    pub fn for_node(ring: RingSnapshot, address: &NodeAddress) -> Option<Self> {
        let index = ring.position_of(address)?;
        let entry = ring.entries()[index].clone();
        let assignment = ReplicaAssignment::derive(&ring, index);
        Some(Self {
            ring,
            entry,
            assignment,
        })
    }

    fn successors(&self) -> Vec<&NodeAddress> {
        self.assignment
            .as_ref()
            .map(|a| a.successors().to_vec())
            .unwrap_or_default()
    }
}

pub struct NodeState {
    address: NodeAddress,
    active: AtomicBool,
    write_locked: AtomicBool,
    topology: RwLock<Option<Arc<NodeTopology>>>,
    links: RwLock<ReplicaLinks>,
    /// Serializes INIT and UPDATE.
    reconfigure: Mutex<()>,
    storage: Storage,
    strategy: SimpleStrategy,
    shutdown: watch::Sender<bool>,
}

impl NodeState {
    pub fn new(address: NodeAddress) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            address,
            active: AtomicBool::new(false),
            write_locked: AtomicBool::new(false),
            topology: RwLock::new(None),
            links: RwLock::new(ReplicaLinks::none()),
            reconfigure: Mutex::new(()),
            storage: Storage::new(),
            strategy: SimpleStrategy::default(),
            shutdown,
        }
    }

    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn is_write_locked(&self) -> bool {
        self.write_locked.load(Ordering::SeqCst)
    }

    pub fn topology(&self) -> Option<Arc<NodeTopology>> {
        self.topology.read().clone()
    }

    pub fn links(&self) -> ReplicaLinks {
        self.links.read().clone()
    }

    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn request_shutdown(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.shutdown.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Drops the successor links.
    pub fn clear_links(&self) {
        *self.links.write() = ReplicaLinks::none();
    }

    /// Installs `ring` and relinks successors.
    ///
    /// Returns the previous successors and the links opened to new ones, or
    /// `None` when this node is not on `ring`.
    async fn install(
        &self,
        ring: RingSnapshot,
    ) -> Option<(Arc<NodeTopology>, Vec<NodeAddress>, Vec<Arc<ReplicaLink>>)> {
        let _guard = self.reconfigure.lock().await;
        let topology = Arc::new(NodeTopology::for_node(ring, &self.address)?);

        let previous_successors: Vec<NodeAddress> = self
            .topology()
            .map(|old| old.successors().into_iter().cloned().collect())
            .unwrap_or_default();
        let previous = self.links();
        let (links, fresh) = ReplicaLinks::connect(topology.assignment.as_ref(), &previous).await;

        *self.topology.write() = Some(Arc::clone(&topology));
        *self.links.write() = links;
        Some((topology, previous_successors, fresh))
    }

    fn reply(status: StatusType, key: &str, value: impl Into<String>) -> KvMessage {
        KvMessage::new(status, key, value)
    }

    fn not_responsible(key: &str, topology: &NodeTopology) -> KvMessage {
        Self::reply(StatusType::ServerNotResponsible, key, "").with_metadata(topology.ring.clone())
    }

    /// Owner, or a replica holder on rings large enough to replicate.
    fn can_read(&self, topology: &NodeTopology, token: Md5Token) -> bool {
        topology.entry.is_responsible(token)
            || self
                .strategy
                .replicas_for_token(&topology.ring, token)
                .contains(&self.address)
    }

    /// Topology for client traffic, or `None` while not serving clients.
    fn serving_topology(&self) -> Option<Arc<NodeTopology>> {
        if self.is_active() {
            self.topology()
        } else {
            None
        }
    }
}

#[async_trait]
impl ClientStorage for NodeState {
    async fn get(&self, key: &str) -> KvMessage {
        let Some(topology) = self.serving_topology() else {
            return Self::reply(StatusType::ServerStopped, key, "");
        };
        if !self.can_read(&topology, Md5Token::from_key(key)) {
            return Self::not_responsible(key, &topology);
        }
        match self.storage.get(key) {
            Some(value) => Self::reply(StatusType::GetSuccess, key, value),
            None => Self::reply(StatusType::GetError, key, ""),
        }
    }

    async fn put(&self, key: &str, value: &str) -> KvMessage {
        let Some(topology) = self.serving_topology() else {
            return Self::reply(StatusType::ServerStopped, key, "");
        };
        if !topology.entry.is_responsible(Md5Token::from_key(key)) {
            return Self::not_responsible(key, &topology);
        }
        if self.is_write_locked() {
            return Self::reply(StatusType::ServerWriteLock, key, value);
        }

        if is_delete_value(value) {
            if self.storage.delete(key).is_none() {
                return Self::reply(StatusType::DeleteError, key, "");
            }
            self.links().forward_write(key, "").await;
            return Self::reply(StatusType::DeleteSuccess, key, "");
        }

        let status = match self.storage.put(key, value) {
            PutOutcome::Inserted => StatusType::PutSuccess,
            PutOutcome::Updated => StatusType::PutUpdate,
        };
        self.links().forward_write(key, value).await;
        Self::reply(status, key, value)
    }
}

#[async_trait]
impl ReplicationTarget for NodeState {
    async fn replica_put(&self, key: &str, value: &str) -> StatusType {
        if is_delete_value(value) {
            return match self.storage.delete(key) {
                Some(_) => StatusType::ReplicaDeleteSuccess,
                None => StatusType::ReplicaDeleteError,
            };
        }
        match self.storage.put(key, value) {
            PutOutcome::Inserted => StatusType::ReplicaPutSuccess,
            PutOutcome::Updated => StatusType::ReplicaPutUpdate,
        }
    }

    async fn delete_topological(&self) -> StatusType {
        let assignment = self.topology().and_then(|t| t.assignment.clone());
        if let Some(assignment) = assignment {
            let range = assignment.predecessor2.range;
            let purged = self.storage.remove_range(&range);
            info!(node = %self.address, %range, purged, "dropped stale replica range");
        }
        StatusType::DeleteTopological
    }
}

#[async_trait]
impl ClusterControl for NodeState {
    async fn init(&self, ring: RingSnapshot) -> Command {
        match self.install(ring).await {
            Some((topology, _, _)) => {
                info!(node = %self.address, range = %topology.entry.range, nodes = topology.ring.len(), "initialized");
                Command::InitSuccess
            }
            None => {
                warn!(node = %self.address, "INIT ring does not include this node");
                Command::InitFail
            }
        }
    }

    async fn start(&self) -> Command {
        if self.topology().is_none() {
            warn!(node = %self.address, "START before INIT");
            return Command::StartFail;
        }
        self.active.store(true, Ordering::SeqCst);
        info!(node = %self.address, "serving clients");
        Command::StartSuccess
    }

    async fn stop(&self) -> Command {
        self.active.store(false, Ordering::SeqCst);
        info!(node = %self.address, "stopped serving clients");
        Command::StopSuccess
    }

    async fn lock_write(&self) -> Command {
        self.write_locked.store(true, Ordering::SeqCst);
        debug!(node = %self.address, "write lock set");
        Command::LockWriteSuccess
    }

    async fn unlock_write(&self) -> Command {
        self.write_locked.store(false, Ordering::SeqCst);
        debug!(node = %self.address, "write lock released");
        Command::UnlockWriteSuccess
    }

    async fn update(&self, ring: RingSnapshot) -> Command {
        let Some((topology, previous, fresh)) = self.install(ring).await else {
            warn!(node = %self.address, "UPDATE ring does not include this node");
            return Command::UpdateFail;
        };
        info!(node = %self.address, range = %topology.entry.range, nodes = topology.ring.len(), "ring updated");

        for link in fresh {
            if previous.contains(link.address()) {
                continue;
            }
            match link.replicate(&self.storage, &topology.entry.range).await {
                Ok(report) => {
                    info!(node = %self.address, replica = %link.address(), keys = report.transferred, "seeded new replica")
                }
                Err(e) => error!(node = %self.address, replica = %link.address(), error = %e, "seeding replica failed"),
            }
        }
        Command::UpdateSuccess
    }

    async fn move_data(&self, range: HashRange, destination: NodeAddress, keep_local: bool) -> Command {
        let links = self.links();
        match move_range(&self.storage, &range, &destination, keep_local, &links).await {
            Ok(_) => Command::MoveDataSuccess,
            Err(e) => {
                error!(node = %self.address, %range, %destination, error = %e, "move failed");
                Command::MoveDataFail
            }
        }
    }

    async fn replicate(&self, range: HashRange, destination: NodeAddress) -> Command {
        let mut conn = match Connection::connect(&destination).await {
            Ok(conn) => conn,
            Err(e) => {
                error!(node = %self.address, %destination, error = %e, "replication target unreachable");
                return Command::ReplicateFail;
            }
        };
        let result = replicate_range(&self.storage, &range, &mut conn, &destination).await;
        let _ = conn.close().await;
        match result {
            Ok(report) => {
                info!(node = %self.address, %range, %destination, keys = report.transferred, "range replicated");
                Command::ReplicateSuccess
            }
            Err(e) => {
                error!(node = %self.address, %destination, error = %e, "replication failed");
                Command::ReplicateFail
            }
        }
    }

    async fn shutdown(&self) {
        info!(node = %self.address, "shutting down");
        self.clear_links();
        self.request_shutdown();
    }
}
