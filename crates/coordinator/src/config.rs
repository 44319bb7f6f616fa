//! Coordinator timing.

use std::time::Duration;

/// Fixed delays used by the lifecycle protocols.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Pause between fault detector sweeps.
    pub probe_interval: Duration,
    /// Wait after launching a node before connecting to it.
    pub launch_settle: Duration,
    /// Wait after connecting to every node before pushing INIT.
    pub init_settle: Duration,
    /// Backoff before the single connection retry.
    pub connect_retry_backoff: Duration,
    /// Wait after broadcasting SHUTDOWN.
    pub shutdown_settle: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(10),
            launch_settle: Duration::from_secs(3),
            init_settle: Duration::from_secs(1),
            connect_retry_backoff: Duration::from_secs(4),
            shutdown_settle: Duration::from_secs(1),
        }
    }
}

impl CoordinatorConfig {
    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    pub fn with_launch_settle(mut self, delay: Duration) -> Self {
        self.launch_settle = delay;
        self
    }

    pub fn with_init_settle(mut self, delay: Duration) -> Self {
        self.init_settle = delay;
        self
    }

    pub fn with_connect_retry_backoff(mut self, delay: Duration) -> Self {
        self.connect_retry_backoff = delay;
        self
    }

    pub fn with_shutdown_settle(mut self, delay: Duration) -> Self {
        self.shutdown_settle = delay;
        self
    }

    /// No settling delays; probes every `probe_interval`.
    pub fn immediate(probe_interval: Duration) -> Self {
        Self {
            probe_interval,
            launch_settle: Duration::ZERO,
            init_settle: Duration::ZERO,
            connect_retry_backoff: Duration::from_millis(50),
            shutdown_settle: Duration::ZERO,
        }
    }
}
