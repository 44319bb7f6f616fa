//! Node behaviour over real sockets.
//!
//! # Test Strategy
//!
//! 1. **Lifecycle**: INIT/START/STOP gating, write lock, shutdown
//! 2. **Client traffic**: read-your-write, deletes, responsibility
//! 3. **Replication**: successor forwarding, replica reads, topological purge
//! 4. **Migration**: MOVE_DATA and REPLICATE between live nodes

use corelib::node::NodeAddress;
use corelib::ring::RingSnapshot;
use node::{NodeError, NodeServer, NodeState, ShutdownHandle};
use std::sync::Arc;
use std::time::Duration;
use streaming::{AdminMessage, Command, Connection, KvMessage, StatusType};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

struct TestNode {
    address: NodeAddress,
    state: Arc<NodeState>,
    handle: ShutdownHandle,
    task: JoinHandle<Result<(), NodeError>>,
}

async fn spawn_node() -> TestNode {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = NodeAddress::new("127.0.0.1", listener.local_addr().unwrap().port());
    let server = NodeServer::from_listener(listener, address.clone());
    let state = server.state();
    let handle = server.shutdown_handle();
    let task = tokio::spawn(server.run());
    TestNode {
        address,
        state,
        handle,
        task,
    }
}

async fn spawn_ring(n: usize) -> (Vec<TestNode>, RingSnapshot) {
    let mut nodes = Vec::with_capacity(n);
    for _ in 0..n {
        nodes.push(spawn_node().await);
    }
    let addresses: Vec<NodeAddress> = nodes.iter().map(|n| n.address.clone()).collect();
    let ring = RingSnapshot::compute(&addresses, n).unwrap();
    (nodes, ring)
}

async fn admin(address: &NodeAddress, message: AdminMessage) -> Command {
    let mut conn = Connection::connect(address).await.unwrap();
    conn.request_admin(message).await.unwrap().command
}

async fn kv(address: &NodeAddress, message: KvMessage) -> KvMessage {
    let mut conn = Connection::connect(address).await.unwrap();
    conn.request_kv(message).await.unwrap()
}

async fn bring_up(nodes: &[TestNode], ring: &RingSnapshot) {
    for node in nodes {
        assert_eq!(admin(&node.address, AdminMessage::init(ring.clone())).await, Command::InitSuccess);
    }
    for node in nodes {
        assert_eq!(admin(&node.address, AdminMessage::new(Command::Start)).await, Command::StartSuccess);
    }
}

fn node_at<'a>(nodes: &'a [TestNode], address: &NodeAddress) -> &'a TestNode {
    nodes.iter().find(|n| &n.address == address).unwrap()
}

/// First generated key owned by `owner`.
fn key_owned_by(ring: &RingSnapshot, owner: &NodeAddress) -> String {
    (0..10_000)
        .map(|i| format!("key-{}", i))
        .find(|key| &ring.owner_of(key).unwrap().address == owner)
        .unwrap()
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_clients_rejected_until_started() {
    let (nodes, ring) = spawn_ring(1).await;
    let node = &nodes[0];

    assert_eq!(admin(&node.address, AdminMessage::new(Command::Start)).await, Command::StartFail);
    assert_eq!(kv(&node.address, KvMessage::get("foo")).await.status, StatusType::ServerStopped);

    assert_eq!(admin(&node.address, AdminMessage::init(ring)).await, Command::InitSuccess);
    assert_eq!(kv(&node.address, KvMessage::put("foo", "bar")).await.status, StatusType::ServerStopped);

    assert_eq!(admin(&node.address, AdminMessage::new(Command::Start)).await, Command::StartSuccess);
    assert_eq!(kv(&node.address, KvMessage::put("foo", "bar")).await.status, StatusType::PutSuccess);

    assert_eq!(admin(&node.address, AdminMessage::new(Command::Stop)).await, Command::StopSuccess);
    assert_eq!(kv(&node.address, KvMessage::get("foo")).await.status, StatusType::ServerStopped);
}

#[tokio::test]
async fn test_init_without_own_entry_fails() {
    let node = spawn_node().await;
    let other = vec![NodeAddress::new("127.0.0.1", 9)];
    let ring = RingSnapshot::compute(&other, 1).unwrap();
    assert_eq!(admin(&node.address, AdminMessage::init(ring.clone())).await, Command::InitFail);
    assert_eq!(admin(&node.address, AdminMessage::update(ring)).await, Command::UpdateFail);
    assert!(node.state.topology().is_none());
}

#[tokio::test]
async fn test_write_lock_blocks_puts_only() {
    let (nodes, ring) = spawn_ring(1).await;
    bring_up(&nodes, &ring).await;
    let address = &nodes[0].address;

    kv(address, KvMessage::put("foo", "bar")).await;
    assert_eq!(admin(address, AdminMessage::new(Command::LockWrite)).await, Command::LockWriteSuccess);

    assert_eq!(kv(address, KvMessage::put("foo", "baz")).await.status, StatusType::ServerWriteLock);
    assert_eq!(kv(address, KvMessage::put("foo", "null")).await.status, StatusType::ServerWriteLock);
    let read = kv(address, KvMessage::get("foo")).await;
    assert_eq!((read.status, read.value.as_str()), (StatusType::GetSuccess, "bar"));

    assert_eq!(admin(address, AdminMessage::new(Command::UnlockWrite)).await, Command::UnlockWriteSuccess);
    assert_eq!(kv(address, KvMessage::put("foo", "baz")).await.status, StatusType::PutUpdate);
}

#[tokio::test]
async fn test_shutdown_stops_server() {
    let node = spawn_node().await;
    let mut conn = Connection::connect(&node.address).await.unwrap();
    conn.send(AdminMessage::new(Command::Shutdown).into()).await.unwrap();
    assert!(conn.recv().await.map(|f| f.is_none()).unwrap_or(true));

    let finished = tokio::time::timeout(Duration::from_secs(5), node.task).await;
    assert!(matches!(finished, Ok(Ok(Ok(())))));
}

#[tokio::test]
async fn test_bind_on_taken_port_reports_address() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = NodeAddress::new("127.0.0.1", taken.local_addr().unwrap().port());

    match NodeServer::bind(address.clone()).await {
        Err(NodeError::Bind { address: failed, .. }) => assert_eq!(failed, address),
        Ok(_) => panic!("bind on a taken port succeeded"),
    }
}

#[tokio::test]
async fn test_unknown_admin_command() {
    let node = spawn_node().await;
    assert_eq!(admin(&node.address, AdminMessage::new(Command::InitSuccess)).await, Command::Unknown);
    assert_eq!(admin(&node.address, AdminMessage::new(Command::Ping)).await, Command::Echo);
    node.handle.shutdown();
}

// ============================================================================
// Client Traffic Tests
// ============================================================================

#[tokio::test]
async fn test_single_node_read_your_write() {
    let (nodes, ring) = spawn_ring(1).await;
    bring_up(&nodes, &ring).await;
    let address = &nodes[0].address;
    let mut conn = Connection::connect(address).await.unwrap();

    let reply = conn.request_kv(KvMessage::put("foo", "bar")).await.unwrap();
    assert_eq!(reply.status, StatusType::PutSuccess);
    let reply = conn.request_kv(KvMessage::put("foo", "baz")).await.unwrap();
    assert_eq!(reply.status, StatusType::PutUpdate);
    assert_eq!(reply.value, "baz");
    let reply = conn.request_kv(KvMessage::get("foo")).await.unwrap();
    assert_eq!((reply.status, reply.value.as_str()), (StatusType::GetSuccess, "baz"));
    let reply = conn.request_kv(KvMessage::put("foo", "null")).await.unwrap();
    assert_eq!(reply.status, StatusType::DeleteSuccess);
    let reply = conn.request_kv(KvMessage::get("foo")).await.unwrap();
    assert_eq!(reply.status, StatusType::GetError);
    let reply = conn.request_kv(KvMessage::put("foo", "")).await.unwrap();
    assert_eq!(reply.status, StatusType::DeleteError);
}

#[tokio::test]
async fn test_not_responsible_carries_ring() {
    let (nodes, ring) = spawn_ring(2).await;
    bring_up(&nodes, &ring).await;

    let owner = &ring.entries()[0].address;
    let other = &ring.entries()[1].address;
    let key = key_owned_by(&ring, owner);

    assert_eq!(admin(other, AdminMessage::new(Command::LockWrite)).await, Command::LockWriteSuccess);
    let reply = kv(other, KvMessage::put(key.as_str(), "v")).await;
    assert_eq!(reply.status, StatusType::ServerNotResponsible, "ownership is checked before the lock");
    assert_eq!(reply.metadata, ring);

    let reply = kv(other, KvMessage::get(key.as_str())).await;
    assert_eq!(reply.status, StatusType::ServerNotResponsible);
    assert_eq!(kv(owner, KvMessage::put(key.as_str(), "v")).await.status, StatusType::PutSuccess);
}

// ============================================================================
// Replication Tests
// ============================================================================

#[tokio::test]
async fn test_writes_reach_both_successors() {
    let (nodes, ring) = spawn_ring(4).await;
    bring_up(&nodes, &ring).await;

    let owner = &ring.entries()[1];
    let succ1 = &ring.entries()[2].address;
    let succ2 = &ring.entries()[3].address;
    let outsider = &ring.entries()[0].address;
    let key = key_owned_by(&ring, &owner.address);

    let reply = kv(&owner.address, KvMessage::put(key.as_str(), "replicated")).await;
    assert_eq!(reply.status, StatusType::PutSuccess);
    for address in [succ1, succ2] {
        let stored = node_at(&nodes, address).state.storage().get(&key);
        assert_eq!(stored.as_deref(), Some("replicated"), "replica {} missing the write", address);
    }
    assert!(node_at(&nodes, outsider).state.storage().get(&key).is_none());

    let read = kv(succ2, KvMessage::get(key.as_str())).await;
    assert_eq!((read.status, read.value.as_str()), (StatusType::GetSuccess, "replicated"));
    let read = kv(outsider, KvMessage::get(key.as_str())).await;
    assert_eq!(read.status, StatusType::ServerNotResponsible);
    assert_eq!(
        kv(succ1, KvMessage::put(key.as_str(), "nope")).await.status,
        StatusType::ServerNotResponsible,
        "replicas never accept client writes"
    );

    assert_eq!(kv(&owner.address, KvMessage::put(key.as_str(), "null")).await.status, StatusType::DeleteSuccess);
    for address in [succ1, succ2] {
        assert!(node_at(&nodes, address).state.storage().get(&key).is_none());
    }
}

#[tokio::test]
async fn test_two_node_ring_does_not_replicate() {
    let (nodes, ring) = spawn_ring(2).await;
    bring_up(&nodes, &ring).await;
    let owner = &ring.entries()[0].address;
    let other = &ring.entries()[1].address;
    let key = key_owned_by(&ring, owner);

    kv(owner, KvMessage::put(key.as_str(), "solo")).await;
    assert!(node_at(&nodes, other).state.storage().is_empty());
    assert!(node_at(&nodes, owner).state.links().is_empty());
}

#[tokio::test]
async fn test_delete_topological_purges_second_predecessor() {
    let (nodes, ring) = spawn_ring(4).await;
    bring_up(&nodes, &ring).await;

    let target = &ring.entries()[3];
    let pred1 = &ring.entries()[2];
    let pred2 = &ring.entries()[1];
    let k1 = key_owned_by(&ring, &pred1.address);
    let k2 = key_owned_by(&ring, &pred2.address);
    let own = key_owned_by(&ring, &target.address);
    kv(&pred1.address, KvMessage::put(k1.as_str(), "1")).await;
    kv(&pred2.address, KvMessage::put(k2.as_str(), "2")).await;
    kv(&target.address, KvMessage::put(own.as_str(), "3")).await;

    let storage = node_at(&nodes, &target.address).state.storage();
    assert_eq!(storage.len(), 3);

    let reply = kv(&target.address, KvMessage::delete_topological()).await;
    assert_eq!(reply.status, StatusType::DeleteTopological);
    assert!(storage.get(&k2).is_none(), "second predecessor's range is purged");
    assert!(storage.get(&k1).is_some());
    assert!(storage.get(&own).is_some());
}

#[tokio::test]
async fn test_update_seeds_new_successors() {
    let (nodes, ring) = spawn_ring(3).await;
    let first_two = RingSnapshot::compute(
        &[nodes[0].address.clone(), nodes[1].address.clone()],
        2,
    )
    .unwrap();
    bring_up(&nodes[..2], &first_two).await;

    // A key whose owner does not change when the third node joins.
    let key = (0..10_000)
        .map(|i| format!("key-{}", i))
        .find(|key| ring.owner_of(key).map(|e| &e.address) == first_two.owner_of(key).map(|e| &e.address))
        .unwrap();
    let owner = ring.owner_of(&key).unwrap().address.clone();
    kv(&owner, KvMessage::put(key.as_str(), "seed")).await;

    // Replication switches on at three nodes; every node seeds its new
    // successors with its own range.
    assert_eq!(admin(&nodes[2].address, AdminMessage::init(ring.clone())).await, Command::InitSuccess);
    for node in &nodes[..2] {
        assert_eq!(admin(&node.address, AdminMessage::update(ring.clone())).await, Command::UpdateSuccess);
    }

    for node in &nodes {
        assert_eq!(
            node.state.storage().get(&key).as_deref(),
            Some("seed"),
            "{} should hold a copy",
            node.address
        );
    }
}

// ============================================================================
// Migration Tests
// ============================================================================

#[tokio::test]
async fn test_move_data_hands_off_range() {
    let (nodes, ring) = spawn_ring(2).await;
    bring_up(&nodes, &ring).await;
    let source = &ring.entries()[0];
    let destination = &ring.entries()[1];
    let key = key_owned_by(&ring, &source.address);
    kv(&source.address, KvMessage::put(key.as_str(), "moving")).await;

    // Hand the source's range to the destination, as if the source were leaving.
    let survivor = RingSnapshot::compute(&[destination.address.clone()], 1).unwrap();
    assert_eq!(admin(&destination.address, AdminMessage::update(survivor)).await, Command::UpdateSuccess);
    let reply = admin(
        &source.address,
        AdminMessage::move_data(source.range, destination.address.clone(), false),
    )
    .await;
    assert_eq!(reply, Command::MoveDataSuccess);

    assert!(node_at(&nodes, &source.address).state.storage().get(&key).is_none());
    let read = kv(&destination.address, KvMessage::get(key.as_str())).await;
    assert_eq!((read.status, read.value.as_str()), (StatusType::GetSuccess, "moving"));
}

#[tokio::test]
async fn test_move_data_to_dead_destination_fails() {
    let (nodes, ring) = spawn_ring(1).await;
    bring_up(&nodes, &ring).await;
    kv(&nodes[0].address, KvMessage::put("k", "v")).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = NodeAddress::new("127.0.0.1", listener.local_addr().unwrap().port());
    drop(listener);

    let reply = admin(&nodes[0].address, AdminMessage::move_data(ring.entries()[0].range, dead.clone(), false)).await;
    assert_eq!(reply, Command::MoveDataFail);
    let reply = admin(&nodes[0].address, AdminMessage::replicate(ring.entries()[0].range, dead)).await;
    assert_eq!(reply, Command::ReplicateFail);
    assert_eq!(nodes[0].state.storage().len(), 1);
}

#[tokio::test]
async fn test_replicate_copies_without_deleting() {
    let (nodes, ring) = spawn_ring(2).await;
    bring_up(&nodes, &ring).await;
    let source = &ring.entries()[0];
    let target = &ring.entries()[1].address;
    let key = key_owned_by(&ring, &source.address);
    kv(&source.address, KvMessage::put(key.as_str(), "copy")).await;

    let reply = admin(&source.address, AdminMessage::replicate(source.range, target.clone())).await;
    assert_eq!(reply, Command::ReplicateSuccess);
    assert_eq!(node_at(&nodes, target).state.storage().get(&key).as_deref(), Some("copy"));
    assert_eq!(node_at(&nodes, &source.address).state.storage().get(&key).as_deref(), Some("copy"));
}
