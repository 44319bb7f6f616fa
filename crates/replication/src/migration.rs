//! Range migration and bulk replication.

use crate::error::ReplicationError;
use crate::link::ReplicaLinks;
use corelib::node::NodeAddress;
use corelib::ring::HashRange;
use corelib::storage::Storage;
use streaming::{Connection, KvMessage};
use tracing::{debug, info, warn};

/// Outcome of a range transfer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Keys the destination confirmed.
    pub transferred: usize,
    /// Keys the destination refused; logged and left behind.
    pub skipped: usize,
}

/// Hands every key of `range` to `destination`.
///
/// With `keep_local` the keys go out as replica writes and stay here;
/// otherwise they go out as plain writes and are deleted locally once the
/// loop finishes. Each confirmed key is pruned from the second successor,
/// which stops covering the split-off range, and the first successor is
/// then told to drop its second predecessor's range.
///
/// # Returns
/// The report, or an error on any connection failure. Refused keys do not
/// fail the transfer.
pub async fn move_range(
    storage: &Storage,
    range: &HashRange,
    destination: &NodeAddress,
    keep_local: bool,
    links: &ReplicaLinks,
) -> Result<MigrationReport, ReplicationError> {
    let pairs = storage.entries_in(range);
    if pairs.is_empty() {
        debug!(%range, %destination, "nothing to move");
        return Ok(MigrationReport::default());
    }

    let mut conn = Connection::connect(destination)
        .await
        .map_err(|source| ReplicationError::Unreachable {
            address: destination.clone(),
            source,
        })?;

    let mut report = MigrationReport::default();
    let mut moved = Vec::with_capacity(pairs.len());
    for (key, value) in &pairs {
        let request = if keep_local {
            KvMessage::replica_put(key.as_str(), value.as_str())
        } else {
            KvMessage::put(key.as_str(), value.as_str())
        };
        let reply = conn
            .request_kv(request)
            .await
            .map_err(|source| ReplicationError::Transfer {
                address: destination.clone(),
                source,
            })?;
        let accepted = if keep_local {
            reply.status.is_replica_put_success()
        } else {
            reply.status.is_put_success()
        };
        if !accepted {
            warn!(key = %key, status = ?reply.status, %destination, "key refused, skipping");
            report.skipped += 1;
            continue;
        }
        report.transferred += 1;
        moved.push(key.as_str());

        if let Some(link) = links.second() {
            link.send(KvMessage::replica_delete(key.as_str()))
                .await
                .map_err(|source| ReplicationError::Prune {
                    address: link.address().clone(),
                    source,
                })?;
        }
    }

    if let Some(link) = links.first() {
        link.send(KvMessage::delete_topological())
            .await
            .map_err(|source| ReplicationError::Prune {
                address: link.address().clone(),
                source,
            })?;
    }

    if !keep_local {
        storage.remove_keys(moved);
    }
    let _ = conn.close().await;

    info!(
        %range,
        %destination,
        transferred = report.transferred,
        skipped = report.skipped,
        keep_local,
        "range moved"
    );
    Ok(report)
}

/// Pushes every key of `range` to the peer on `conn` as replica writes.
///
/// Nothing is deleted on either side.
pub async fn replicate_range(
    storage: &Storage,
    range: &HashRange,
    conn: &mut Connection,
    destination: &NodeAddress,
) -> Result<MigrationReport, ReplicationError> {
    let mut report = MigrationReport::default();
    for (key, value) in storage.entries_in(range) {
        let reply = conn
            .request_kv(KvMessage::replica_put(key.as_str(), value.as_str()))
            .await
            .map_err(|source| ReplicationError::Transfer {
                address: destination.clone(),
                source,
            })?;
        if reply.status.is_replica_put_success() {
            report.transferred += 1;
        } else {
            warn!(key = %key, status = ?reply.status, %destination, "replica refused key");
            report.skipped += 1;
        }
    }
    debug!(%range, %destination, transferred = report.transferred, "range replicated");
    Ok(report)
}
