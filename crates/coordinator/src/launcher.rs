//! Starting node processes.

use crate::error::{CoordinatorError, Result};
use async_trait::async_trait;
use corelib::node::Node;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Brings a node's process up so it listens on its address.
#[async_trait]
pub trait NodeLauncher: Send + Sync + 'static {
    async fn launch(&self, node: &Node) -> Result<()>;
}

/// Spawns `<program> node --host H --port P --log-level L` locally.
#[derive(Debug)]
pub struct ProcessLauncher {
    program: PathBuf,
    log_level: String,
    children: Mutex<Vec<Child>>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, log_level: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            log_level: log_level.into(),
            children: Mutex::new(Vec::new()),
        }
    }

    /// Launches nodes with the running executable.
    pub fn current_exe(log_level: impl Into<String>) -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, log_level))
    }

    /// Number of launched processes that have not exited.
    pub fn running(&self) -> usize {
        self.reap();
        self.children.lock().len()
    }

    /// Drops handles of processes that have exited.
    fn reap(&self) {
        self.children.lock().retain_mut(|child| match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!(pid = ?child.id(), %status, "node process exited");
                false
            }
            Err(e) => {
                warn!(pid = ?child.id(), error = %e, "cannot poll node process");
                false
            }
        });
    }
}

#[async_trait]
impl NodeLauncher for ProcessLauncher {
    async fn launch(&self, node: &Node) -> Result<()> {
        self.reap();
        let child = Command::new(&self.program)
            .arg("node")
            .arg("--host")
            .arg(&node.address.host)
            .arg("--port")
            .arg(node.address.port.to_string())
            .arg("--log-level")
            .arg(&self.log_level)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CoordinatorError::Launch {
                node: node.to_string(),
                reason: e.to_string(),
            })?;
        info!(%node, pid = ?child.id(), "node process started");
        self.children.lock().push(child);
        Ok(())
    }
}

/// For nodes an operator starts by other means.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExternalLauncher;

#[async_trait]
impl NodeLauncher for ExternalLauncher {
    async fn launch(&self, node: &Node) -> Result<()> {
        debug!(%node, "expecting node to be started externally");
        Ok(())
    }
}
