//! Top-level arguments and runtime setup.

use crate::commands::Command;
use anyhow::Context;
use clap::Parser;
use std::str::FromStr;
use tracing::Level;

#[derive(Debug, Parser)]
#[command(name = "kvring", version, about = "Partitioned, replicated in-memory key-value ring")]
pub struct CliConfig {
    /// trace, debug, info, warn or error
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    pub fn run(self) -> anyhow::Result<()> {
        init_tracing(&self.log_level)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("building the async runtime")?;
        let result = runtime.block_on(self.command.execute(&self.log_level))?;
        println!("{}", result);
        Ok(())
    }
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let level = Level::from_str(level).with_context(|| format!("unknown log level {:?}", level))?;
    tracing_subscriber::fmt().with_max_level(level).init();
    Ok(())
}
