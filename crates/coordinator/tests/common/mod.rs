//! In-process cluster fixture.

use async_trait::async_trait;
use coordinator::error::{CoordinatorError, Result};
use coordinator::{Coordinator, CoordinatorConfig, Inventory, NodeLauncher};
use corelib::node::{Node, NodeAddress};
use node::{NodeServer, NodeState, ShutdownHandle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Runs nodes as tasks on listeners bound up front.
pub struct InProcessLauncher {
    pending: Mutex<HashMap<NodeAddress, TcpListener>>,
    running: Mutex<HashMap<NodeAddress, (Arc<NodeState>, ShutdownHandle)>>,
}

impl InProcessLauncher {
    /// Binds `n` loopback ports and lists them as `node0..node{n-1}`.
    pub async fn reserve(n: usize) -> (Arc<Self>, Inventory) {
        let mut pending = HashMap::new();
        let mut nodes = Vec::new();
        for i in 0..n {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let address = NodeAddress::new("127.0.0.1", listener.local_addr().unwrap().port());
            nodes.push(Node::new(format!("node{}", i), address.clone()));
            pending.insert(address, listener);
        }
        let launcher = Arc::new(Self {
            pending: Mutex::new(pending),
            running: Mutex::new(HashMap::new()),
        });
        (launcher, Inventory::from_nodes(nodes).unwrap())
    }

    pub fn state(&self, address: &NodeAddress) -> Arc<NodeState> {
        Arc::clone(&self.running.lock()[address].0)
    }

    pub fn launched(&self) -> usize {
        self.running.lock().len()
    }

    /// Stops a node without telling the coordinator.
    pub fn kill(&self, address: &NodeAddress) {
        self.running.lock()[address].1.shutdown();
    }
}

#[async_trait]
impl NodeLauncher for InProcessLauncher {
    async fn launch(&self, node: &Node) -> Result<()> {
        let listener = self
            .pending
            .lock()
            .remove(&node.address)
            .ok_or_else(|| CoordinatorError::Launch {
                node: node.to_string(),
                reason: "already launched".into(),
            })?;
        let server = NodeServer::from_listener(listener, node.address.clone());
        self.running
            .lock()
            .insert(node.address.clone(), (server.state(), server.shutdown_handle()));
        tokio::spawn(server.run());
        Ok(())
    }
}

pub async fn cluster(inventory_size: usize, probe_interval: Duration) -> (Coordinator, Arc<InProcessLauncher>) {
    let (launcher, inventory) = InProcessLauncher::reserve(inventory_size).await;
    let coordinator = Coordinator::new(
        inventory,
        launcher.clone(),
        CoordinatorConfig::immediate(probe_interval),
    );
    (coordinator, launcher)
}
