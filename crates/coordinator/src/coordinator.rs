//! Cluster lifecycle.
//!
//! `ClusterState` owns the inventory, the current ring and one admin link
//! per node. It sits behind a single async mutex shared with the fault
//! detector; `Coordinator` halts the detector before every topology change
//! and resumes it afterwards.

use crate::admin::AdminLink;
use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorError, Result};
use crate::fault_detector::FaultDetector;
use crate::inventory::Inventory;
use crate::launcher::NodeLauncher;
use corelib::node::{Node, NodeAddress};
use corelib::ring::RingSnapshot;
use corelib::topology::TopologyChange;
use replication::MIN_REPLICATED_RING;
use std::collections::BTreeMap;
use std::sync::Arc;
use streaming::{AdminMessage, Command};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Result of one fault detector sweep.
#[derive(Debug)]
pub enum ProbeOutcome {
    Healthy,
    /// The node failed its probe and the ring was shrunk around it.
    Recovered(NodeAddress),
    /// The node failed its probe and shrinking the ring failed too.
    RecoveryFailed(NodeAddress, CoordinatorError),
}

pub struct ClusterState {
    inventory: Inventory,
    ring: Option<RingSnapshot>,
    links: BTreeMap<NodeAddress, AdminLink>,
    launcher: Arc<dyn NodeLauncher>,
    config: CoordinatorConfig,
}

impl ClusterState {
    pub fn new(inventory: Inventory, launcher: Arc<dyn NodeLauncher>, config: CoordinatorConfig) -> Self {
        Self {
            inventory,
            ring: None,
            links: BTreeMap::new(),
            launcher,
            config,
        }
    }

    pub fn ring(&self) -> Option<&RingSnapshot> {
        self.ring.as_ref()
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn activated_node_count(&self) -> usize {
        self.ring.as_ref().map_or(0, RingSnapshot::len)
    }

    pub fn max_available_node_count(&self) -> usize {
        self.inventory.max_available()
    }

    fn current_ring(&self) -> Result<RingSnapshot> {
        self.ring.clone().ok_or(CoordinatorError::NotInitialized)
    }

    /// Launches `node` and opens its admin link.
    async fn open_node(&mut self, node: &Node) -> Result<()> {
        self.launcher.launch(node).await?;
        tokio::time::sleep(self.config.launch_settle).await;
        let link = AdminLink::connect(node.address.clone(), self.config.connect_retry_backoff).await?;
        self.links.insert(node.address.clone(), link);
        Ok(())
    }

    async fn send_to(&mut self, address: &NodeAddress, message: AdminMessage) -> Result<()> {
        self.links
            .get_mut(address)
            .ok_or_else(|| CoordinatorError::NoLink(address.clone()))?
            .require(message)
            .await
    }

    /// Sends `message` to every node, stopping at the first failure.
    async fn broadcast(&mut self, message: AdminMessage) -> Result<()> {
        for link in self.links.values_mut() {
            link.require(message.clone()).await?;
        }
        Ok(())
    }

    pub async fn init_service(&mut self, count: usize) -> Result<()> {
        if self.ring.is_some() {
            return Err(CoordinatorError::AlreadyInitialized);
        }
        let ring = RingSnapshot::compute(&self.inventory.alive_addresses(), count)?;
        info!(nodes = count, available = self.max_available_node_count(), "initializing service");
        for address in ring.addresses() {
            let node = self.inventory.node(address)?.clone();
            self.open_node(&node).await?;
        }
        tokio::time::sleep(self.config.init_settle).await;
        self.broadcast(AdminMessage::init(ring.clone())).await?;
        self.ring = Some(ring);
        info!(nodes = count, "service initialized");
        Ok(())
    }

    pub async fn start_nodes(&mut self) -> Result<()> {
        self.current_ring()?;
        self.broadcast(AdminMessage::new(Command::Start)).await
    }

    pub async fn stop_nodes(&mut self) -> Result<()> {
        self.current_ring()?;
        self.broadcast(AdminMessage::new(Command::Stop)).await
    }

    /// Best effort: every node is told to shut down and all state is dropped.
    pub async fn shut_down(&mut self) -> Result<()> {
        for link in self.links.values_mut() {
            if let Err(e) = link.notify(AdminMessage::new(Command::Shutdown)).await {
                warn!(node = %link.address(), error = %e, "shutdown not delivered");
            }
        }
        tokio::time::sleep(self.config.shutdown_settle).await;
        self.links.clear();
        self.ring = None;
        info!("service shut down");
        Ok(())
    }

    /// Inserts the next alive inventory node into the ring.
    ///
    /// The joiner is initialized and started, its successor is write-locked
    /// while it hands over the split-off range, then every node gets the
    /// new ring and the successor is unlocked.
    pub async fn add_node(&mut self) -> Result<()> {
        let old = self.current_ring()?;
        let new = RingSnapshot::compute(&self.inventory.alive_addresses(), old.len() + 1)?;
        let change = TopologyChange::joined(&old, &new)?;
        let joiner = change.node.address.clone();
        let successor = change.successor.address.clone();
        info!(node = %joiner, %successor, range = %change.node.range, "adding node");

        let node = self.inventory.node(&joiner)?.clone();
        self.open_node(&node).await?;
        self.send_to(&joiner, AdminMessage::init(new.clone())).await?;
        self.send_to(&joiner, AdminMessage::new(Command::Start)).await?;

        self.send_to(&successor, AdminMessage::new(Command::LockWrite)).await?;
        let handoff = AdminMessage::move_data(change.node.range, joiner.clone(), new.len() > 2);
        self.send_to(&successor, handoff).await?;
        if old.len() < MIN_REPLICATED_RING && new.len() >= MIN_REPLICATED_RING {
            // Nobody held replicas before, so the joiner seeds its second successor.
            let target = second_successor(&new, &joiner)?;
            self.send_to(&joiner, AdminMessage::replicate(change.node.range, target))
                .await?;
        }

        self.ring = Some(new.clone());
        self.broadcast(AdminMessage::update(new)).await?;
        self.send_to(&successor, AdminMessage::new(Command::UnlockWrite)).await?;
        info!(node = %joiner, nodes = self.activated_node_count(), "node added");
        Ok(())
    }

    /// Takes the last active inventory node out of the ring.
    ///
    /// On rings that stay replicated the successor already holds the
    /// departing range, so the departing node only seeds the successor's
    /// second successor. Otherwise the range is moved to the successor
    /// directly. Removing the last node shuts the service down.
    pub async fn remove_node(&mut self) -> Result<()> {
        let old = self.current_ring()?;
        if old.len() == 1 {
            info!("removing the last node");
            return self.shut_down().await;
        }
        let new = RingSnapshot::compute(&self.inventory.alive_addresses(), old.len() - 1)?;
        let change = TopologyChange::left(&old, &new)?;
        let leaving = change.node.address.clone();
        let successor = change.successor.address.clone();
        info!(node = %leaving, %successor, range = %change.node.range, "removing node");

        if new.len() >= MIN_REPLICATED_RING {
            let target = second_successor(&new, &successor)?;
            self.send_to(&leaving, AdminMessage::replicate(change.node.range, target))
                .await?;
        } else {
            self.send_to(&leaving, AdminMessage::new(Command::LockWrite)).await?;
            self.send_to(&successor, AdminMessage::update(new.clone())).await?;
            let handoff = AdminMessage::move_data(change.node.range, successor.clone(), false);
            self.send_to(&leaving, handoff).await?;
            self.send_to(&leaving, AdminMessage::new(Command::UnlockWrite)).await?;
        }

        if let Some(mut link) = self.links.remove(&leaving) {
            if let Err(e) = link.notify(AdminMessage::new(Command::Shutdown)).await {
                warn!(node = %leaving, error = %e, "shutdown not delivered");
            }
        }
        self.ring = Some(new.clone());
        self.broadcast(AdminMessage::update(new)).await?;
        info!(node = %leaving, nodes = self.activated_node_count(), "node removed");
        Ok(())
    }

    /// Drops a node that failed its liveness probe and shrinks the ring.
    ///
    /// Data the node owned is not recovered.
    pub async fn handle_faulty_server(&mut self, address: &NodeAddress) -> Result<()> {
        self.links.remove(address);
        if self.inventory.mark_dead(address) {
            error!(node = %address, dead = self.inventory.dead_count(), "node marked dead");
        }

        let old = self.current_ring()?;
        let remaining = old.addresses().filter(|a| *a != address).count();
        if remaining == 0 {
            warn!("no live nodes remain");
            self.ring = None;
            return Ok(());
        }

        let new = RingSnapshot::compute(&self.inventory.alive_addresses(), remaining)?;
        self.ring = Some(new.clone());
        self.broadcast(AdminMessage::update(new)).await?;
        info!(nodes = remaining, "ring shrunk around failed node");
        Ok(())
    }

    /// Pings every node. The first one that cannot be reached is handled
    /// as faulty and the sweep ends there.
    pub async fn probe(&mut self) -> ProbeOutcome {
        let addresses: Vec<NodeAddress> = self.links.keys().cloned().collect();
        for address in addresses {
            let Some(link) = self.links.get_mut(&address) else {
                continue;
            };
            match link.ping().await {
                Ok(()) => {}
                Err(e) if !e.is_io() => {
                    warn!(node = %address, error = %e, "odd probe reply");
                }
                Err(e) => {
                    warn!(node = %address, error = %e, "node failed liveness probe");
                    return match self.handle_faulty_server(&address).await {
                        Ok(()) => ProbeOutcome::Recovered(address),
                        Err(e) => ProbeOutcome::RecoveryFailed(address, e),
                    };
                }
            }
        }
        ProbeOutcome::Healthy
    }
}

fn second_successor(ring: &RingSnapshot, address: &NodeAddress) -> Result<NodeAddress> {
    ring.position_of(address)
        .and_then(|index| ring.successor_of(index, 2))
        .map(|entry| entry.address.clone())
        .ok_or_else(|| corelib::Error::Topology(format!("{} is not in the ring", address)).into())
}

/// Handle to the cluster; every operation is linearized on the state lock.
pub struct Coordinator {
    state: Arc<Mutex<ClusterState>>,
    detector: parking_lot::Mutex<Option<FaultDetector>>,
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(inventory: Inventory, launcher: Arc<dyn NodeLauncher>, config: CoordinatorConfig) -> Self {
        let state = ClusterState::new(inventory, launcher, config.clone());
        Self {
            state: Arc::new(Mutex::new(state)),
            detector: parking_lot::Mutex::new(None),
            config,
        }
    }

    /// Launches and initializes the first `count` alive nodes.
    pub async fn init_service(&self, count: usize) -> Result<()> {
        self.state.lock().await.init_service(count).await
    }

    /// Opens every node to clients and starts the fault detector.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let result = state.start_nodes().await;
        if state.ring().is_some() {
            self.resume_detector();
        }
        result
    }

    pub async fn stop(&self) -> Result<()> {
        self.halt_detector().await;
        self.state.lock().await.stop_nodes().await
    }

    pub async fn shut_down(&self) -> Result<()> {
        self.halt_detector().await;
        self.state.lock().await.shut_down().await
    }

    pub async fn add_node(&self) -> Result<()> {
        self.halt_detector().await;
        let mut state = self.state.lock().await;
        let result = state.add_node().await;
        if state.ring().is_some() {
            self.resume_detector();
        }
        result
    }

    pub async fn remove_node(&self) -> Result<()> {
        self.halt_detector().await;
        let mut state = self.state.lock().await;
        let result = state.remove_node().await;
        if state.activated_node_count() > 0 {
            self.resume_detector();
        }
        result
    }

    pub async fn activated_node_count(&self) -> usize {
        self.state.lock().await.activated_node_count()
    }

    pub async fn max_available_node_count(&self) -> usize {
        self.state.lock().await.max_available_node_count()
    }

    pub async fn ring(&self) -> Option<RingSnapshot> {
        self.state.lock().await.ring().cloned()
    }

    pub fn is_detector_running(&self) -> bool {
        self.detector
            .lock()
            .as_ref()
            .map_or(false, |detector| !detector.is_finished())
    }

    async fn halt_detector(&self) {
        let detector = self.detector.lock().take();
        if let Some(detector) = detector {
            detector.halt().await;
        }
    }

    /// Spawns a detector unless one is already running.
    fn resume_detector(&self) {
        let mut slot = self.detector.lock();
        if slot.as_ref().map_or(true, FaultDetector::is_finished) {
            *slot = Some(FaultDetector::spawn(
                Arc::clone(&self.state),
                self.config.probe_interval,
            ));
        }
    }
}
