//! Command-line entry points for the key-value ring.
//!
//! Provides commands for:
//! - Running a storage node
//! - Running the coordinator over an inventory file
//! - Reading and writing keys

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
