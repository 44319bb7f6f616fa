//! Cluster coordinator.
//!
//! Reads the static inventory, computes rings, launches and initializes
//! nodes, and runs the multi-step protocols that grow, shrink and heal
//! the ring. A fault detector probes every node on a fixed interval.

pub mod admin;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fault_detector;
pub mod inventory;
pub mod launcher;

pub use admin::AdminLink;
pub use config::CoordinatorConfig;
pub use coordinator::{ClusterState, Coordinator, ProbeOutcome};
pub use error::CoordinatorError;
pub use fault_detector::FaultDetector;
pub use inventory::{Inventory, InventoryEntry};
pub use launcher::{ExternalLauncher, NodeLauncher, ProcessLauncher};
