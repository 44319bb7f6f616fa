//! Request routing.
//!
//! Until a node has answered `SERVER_NOT_RESPONSIBLE` the client has no ring
//! and sends everything to the node it connected to. After that every
//! request is pre-routed to the owner the cached ring names, and a stale
//! ring is replaced by the snapshot carried on the next redirect.

use crate::error::{ClientError, Result};
use corelib::node::NodeAddress;
use corelib::ring::RingSnapshot;
use streaming::{is_delete_value, Connection, KvMessage, StatusType};
use tracing::{debug, info, warn};

/// Longest accepted key in bytes.
pub const MAX_KEY_LEN: usize = 20;

/// Redirects followed for one request before giving up.
pub const MAX_REDIRECTS: usize = 2;

/// Tried once when the targeted node cannot be reached.
pub const DEFAULT_FALLBACK: (&str, u16) = ("127.0.0.1", 50000);

/// A routed client session.
///
/// # Example
///
/// ```no_run
/// use client::KvStore;
/// use corelib::node::NodeAddress;
///
/// # async fn demo() -> Result<(), client::ClientError> {
/// let mut store = KvStore::new(NodeAddress::new("127.0.0.1", 50000));
/// store.connect().await?;
/// store.put("color", "blue").await?;
/// let reply = store.get("color").await?;
/// assert_eq!(reply.value, "blue");
/// store.disconnect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct KvStore {
    entry: NodeAddress,
    fallback: NodeAddress,
    conn: Option<(NodeAddress, Connection)>,
    ring: Option<RingSnapshot>,
    connected: bool,
}

impl KvStore {
    pub fn new(entry: NodeAddress) -> Self {
        let (host, port) = DEFAULT_FALLBACK;
        Self::with_fallback(entry, NodeAddress::new(host, port))
    }

    pub fn with_fallback(entry: NodeAddress, fallback: NodeAddress) -> Self {
        Self {
            entry,
            fallback,
            conn: None,
            ring: None,
            connected: false,
        }
    }

    /// Opens the connection to the entry node.
    pub async fn connect(&mut self) -> Result<()> {
        let entry = self.entry.clone();
        let conn = Connection::connect(&entry)
            .await
            .map_err(|source| ClientError::Unreachable {
                address: entry.clone(),
                source,
            })?;
        info!(node = %entry, "connected");
        self.conn = Some((entry, conn));
        self.connected = true;
        Ok(())
    }

    pub async fn disconnect(&mut self) {
        if let Some((address, mut conn)) = self.conn.take() {
            if let Err(e) = conn.close().await {
                debug!(node = %address, error = %e, "close failed");
            }
            info!(node = %address, "disconnected");
        }
        self.connected = false;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Ring learned from the last redirect.
    pub fn cached_ring(&self) -> Option<&RingSnapshot> {
        self.ring.as_ref()
    }

    /// Stores `value` under `key`. An empty value or `null` deletes the key.
    pub async fn put(&mut self, key: &str, value: &str) -> Result<KvMessage> {
        let value = if is_delete_value(value) { "" } else { value };
        self.execute(KvMessage::put(key, value)).await
    }

    pub async fn get(&mut self, key: &str) -> Result<KvMessage> {
        self.execute(KvMessage::get(key)).await
    }

    async fn execute(&mut self, request: KvMessage) -> Result<KvMessage> {
        validate_key(&request.key)?;
        if !self.connected {
            return Err(ClientError::NotConnected);
        }

        let mut target = self.route(&request.key);
        let mut fell_back = false;
        let mut redirects = 0;
        loop {
            let reply = match self.send_to(&target, request.clone()).await {
                Ok(reply) => reply,
                Err(e) if !fell_back && target != self.fallback => {
                    warn!(node = %target, error = %e, fallback = %self.fallback, "node unreachable, trying fallback");
                    fell_back = true;
                    target = self.fallback.clone();
                    continue;
                }
                Err(e) => return Err(e),
            };

            if reply.status != StatusType::ServerNotResponsible {
                return Ok(reply);
            }
            if redirects == MAX_REDIRECTS {
                return Err(ClientError::TooManyRedirects { key: request.key });
            }
            redirects += 1;
            if !reply.metadata.is_empty() {
                self.ring = Some(reply.metadata);
            }
            target = match self.route(&request.key) {
                next if next != target => next,
                _ => return Err(ClientError::TooManyRedirects { key: request.key }),
            };
            debug!(key = %request.key, node = %target, "redirected");
        }
    }

    /// Owner of `key` in the cached ring, else the current node.
    fn route(&self, key: &str) -> NodeAddress {
        self.ring
            .as_ref()
            .and_then(|ring| ring.owner_of(key))
            .map(|entry| entry.address.clone())
            .or_else(|| self.conn.as_ref().map(|(address, _)| address.clone()))
            .unwrap_or_else(|| self.entry.clone())
    }

    async fn send_to(&mut self, target: &NodeAddress, request: KvMessage) -> Result<KvMessage> {
        let reuse = matches!(&self.conn, Some((address, _)) if address == target);
        if !reuse {
            let conn = Connection::connect(target)
                .await
                .map_err(|source| ClientError::Unreachable {
                    address: target.clone(),
                    source,
                })?;
            if let Some((_, mut old)) = self.conn.replace((target.clone(), conn)) {
                let _ = old.close().await;
            }
        }

        let Some((_, conn)) = self.conn.as_mut() else {
            return Err(ClientError::NotConnected);
        };
        match conn.request_kv(request).await {
            Ok(reply) => Ok(reply),
            Err(source) => {
                self.conn = None;
                Err(ClientError::Unreachable {
                    address: target.clone(),
                    source,
                })
            }
        }
    }
}

fn validate_key(key: &str) -> Result<()> {
    let reason = if key.is_empty() {
        "empty"
    } else if key.len() > MAX_KEY_LEN {
        "longer than 20 bytes"
    } else {
        return Ok(());
    };
    Err(ClientError::InvalidKey {
        key: key.to_string(),
        reason,
    })
}
