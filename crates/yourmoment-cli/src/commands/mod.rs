//! CLI subcommand argument definitions and implementations.

pub mod migrate;
pub mod run;

use clap::Args;

/// Arguments for the `run` subcommand.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Print periodic status summary (0 = disabled)
    #[arg(long, default_value = "0")]
    pub status_interval: u64,
}

/// Arguments for the `migrate` subcommand.
#[derive(Debug, Args)]
pub struct MigrateArgs;
