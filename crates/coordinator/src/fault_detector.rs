//! Periodic liveness probing.

use crate::coordinator::{ClusterState, ProbeOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// A running probe task.
///
/// A sweep in progress always completes, so halting never leaves an admin
/// link with an unread reply.
pub struct FaultDetector {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl FaultDetector {
    pub fn spawn(state: Arc<Mutex<ClusterState>>, interval: Duration) -> Self {
        let (stop, stopped) = watch::channel(false);
        let task = tokio::spawn(run(state, interval, stopped));
        debug!(?interval, "fault detector started");
        Self { stop, task }
    }

    /// True once the task has exited on its own or been halted.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the task and waits for it.
    pub async fn halt(self) {
        self.stop.send_replace(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "fault detector task failed");
        }
        debug!("fault detector halted");
    }
}

async fn run(state: Arc<Mutex<ClusterState>>, interval: Duration, mut stop: watch::Receiver<bool>) {
    while !*stop.borrow() {
        let outcome = state.lock().await.probe().await;
        match outcome {
            ProbeOutcome::Healthy => {}
            ProbeOutcome::Recovered(address) => {
                info!(node = %address, "recovered from node failure");
            }
            ProbeOutcome::RecoveryFailed(address, e) => {
                error!(node = %address, error = %e, "recovery failed, fault detector stopping");
                return;
            }
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = stop.changed() => {
                // Owner dropped without halting.
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}
