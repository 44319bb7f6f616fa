//! Subcommands.

use anyhow::Context;
use clap::Subcommand;
use client::KvStore;
use coordinator::{
    Coordinator, CoordinatorConfig, ExternalLauncher, Inventory, NodeLauncher, ProcessLauncher,
};
use corelib::node::NodeAddress;
use node::NodeServer;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use streaming::KvMessage;
use tracing::info;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one storage node until the coordinator shuts it down
    Node {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long)]
        port: u16,
    },
    /// Launch the first N inventory nodes and coordinate them until Ctrl-C
    Cluster {
        /// One `name host port` line per candidate node
        #[arg(long)]
        inventory: PathBuf,
        #[arg(long)]
        nodes: usize,
        /// Nodes are started by other means
        #[arg(long)]
        external: bool,
        /// Seconds between liveness probes
        #[arg(long, default_value_t = 10)]
        probe_interval: u64,
    },
    /// Store a value; `null` deletes the key
    Put {
        #[arg(long)]
        server: NodeAddress,
        key: String,
        value: String,
    },
    /// Read a value
    Get {
        #[arg(long)]
        server: NodeAddress,
        key: String,
    },
}

/// What a finished command prints.
#[derive(Debug)]
pub enum CommandResult {
    NodeStopped(NodeAddress),
    ClusterStopped { nodes: usize },
    Reply(KvMessage),
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandResult::NodeStopped(address) => write!(f, "node {} stopped", address),
            CommandResult::ClusterStopped { nodes } => write!(f, "cluster of {} nodes shut down", nodes),
            CommandResult::Reply(reply) if reply.value.is_empty() => {
                write!(f, "{:?} {}", reply.status, reply.key)
            }
            CommandResult::Reply(reply) => write!(f, "{:?} {} = {}", reply.status, reply.key, reply.value),
        }
    }
}

impl Command {
    pub async fn execute(self, log_level: &str) -> anyhow::Result<CommandResult> {
        match self {
            Command::Node { host, port } => {
                let address = NodeAddress::new(host, port);
                let server = NodeServer::bind(address.clone()).await?;
                server.run().await?;
                Ok(CommandResult::NodeStopped(address))
            }
            Command::Cluster {
                inventory,
                nodes,
                external,
                probe_interval,
            } => {
                let inventory = Inventory::load(&inventory)?;
                let launcher: Arc<dyn NodeLauncher> = if external {
                    Arc::new(ExternalLauncher)
                } else {
                    Arc::new(ProcessLauncher::current_exe(log_level).context("locating the kvring binary")?)
                };
                let config = CoordinatorConfig::default().with_probe_interval(Duration::from_secs(probe_interval));
                let coordinator = Coordinator::new(inventory, launcher, config);

                coordinator.init_service(nodes).await?;
                coordinator.start().await?;
                info!(nodes, "cluster running, Ctrl-C to shut down");
                tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;

                let nodes = coordinator.activated_node_count().await;
                coordinator.shut_down().await?;
                Ok(CommandResult::ClusterStopped { nodes })
            }
            Command::Put { server, key, value } => {
                let mut store = KvStore::new(server);
                store.connect().await?;
                let reply = store.put(&key, &value).await;
                store.disconnect().await;
                Ok(CommandResult::Reply(reply?))
            }
            Command::Get { server, key } => {
                let mut store = KvStore::new(server);
                store.connect().await?;
                let reply = store.get(&key).await;
                store.disconnect().await;
                Ok(CommandResult::Reply(reply?))
            }
        }
    }
}
