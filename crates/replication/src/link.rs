//! Live connections from a node to its two successor replicas.

use crate::error::ReplicationError;
use crate::migration::{replicate_range, MigrationReport};
use crate::placement::ReplicaAssignment;
use corelib::node::NodeAddress;
use corelib::ring::HashRange;
use corelib::storage::Storage;
use std::sync::Arc;
use streaming::{Connection, KvMessage, StatusType, StreamingError};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// One open connection to a successor replica.
///
/// Requests are serialized through the mutex so replies stay paired with
/// their requests when many client tasks replicate at once.
#[derive(Debug)]
pub struct ReplicaLink {
    address: NodeAddress,
    conn: Mutex<Connection>,
}

impl ReplicaLink {
    pub async fn open(address: NodeAddress) -> Result<Self, ReplicationError> {
        let conn = Connection::connect(&address)
            .await
            .map_err(|source| ReplicationError::Unreachable {
                address: address.clone(),
                source,
            })?;
        debug!(replica = %address, "replica link open");
        Ok(Self {
            address,
            conn: Mutex::new(conn),
        })
    }

    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    pub async fn send(&self, message: KvMessage) -> Result<KvMessage, StreamingError> {
        self.conn.lock().await.request_kv(message).await
    }

    /// Pushes every key of `range` held in `storage` to this replica.
    pub async fn replicate(
        &self,
        storage: &Storage,
        range: &HashRange,
    ) -> Result<MigrationReport, ReplicationError> {
        let mut conn = self.conn.lock().await;
        replicate_range(storage, range, &mut conn, &self.address).await
    }
}

/// The first and second successor links of a node. Either may be absent.
#[derive(Clone, Debug, Default)]
pub struct ReplicaLinks {
    first: Option<Arc<ReplicaLink>>,
    second: Option<Arc<ReplicaLink>>,
}

impl ReplicaLinks {
    pub fn none() -> Self {
        Self::default()
    }

    /// Opens links for `assignment`, reusing any in `previous` that point
    /// at the same successor.
    ///
    /// # Returns
    /// The new links plus the ones opened to successors `previous` did not
    /// have. Unreachable successors are logged and left unlinked.
    pub async fn connect(
        assignment: Option<&ReplicaAssignment>,
        previous: &ReplicaLinks,
    ) -> (Self, Vec<Arc<ReplicaLink>>) {
        let Some(assignment) = assignment else {
            return (Self::none(), Vec::new());
        };

        let mut fresh = Vec::new();
        let mut slots = [None, None];
        for (slot, address) in slots.iter_mut().zip(assignment.successors()) {
            if let Some(existing) = previous.find(address) {
                *slot = Some(existing);
                continue;
            }
            match ReplicaLink::open(address.clone()).await {
                Ok(link) => {
                    let link = Arc::new(link);
                    fresh.push(Arc::clone(&link));
                    *slot = Some(link);
                }
                Err(e) => warn!(replica = %address, error = %e, "replica unreachable"),
            }
        }
        let [first, second] = slots;
        (Self { first, second }, fresh)
    }

    pub fn first(&self) -> Option<&Arc<ReplicaLink>> {
        self.first.as_ref()
    }

    pub fn second(&self) -> Option<&Arc<ReplicaLink>> {
        self.second.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none() && self.second.is_none()
    }

    fn find(&self, address: &NodeAddress) -> Option<Arc<ReplicaLink>> {
        [&self.first, &self.second]
            .into_iter()
            .flatten()
            .find(|link| link.address() == address)
            .cloned()
    }

    /// Forwards a client write to the first then the second successor.
    ///
    /// An empty `value` forwards a delete. Failures are logged only; the
    /// client's result does not depend on them.
    pub async fn forward_write(&self, key: &str, value: &str) {
        for link in [&self.first, &self.second].into_iter().flatten() {
            match link.send(KvMessage::replica_put(key, value)).await {
                Ok(reply) => match reply.status {
                    StatusType::ReplicaPutSuccess
                    | StatusType::ReplicaPutUpdate
                    | StatusType::ReplicaDeleteSuccess => {}
                    status => debug!(replica = %link.address(), key, ?status, "replica declined write"),
                },
                Err(e) => warn!(replica = %link.address(), key, error = %e, "replica write failed"),
            }
        }
    }
}
