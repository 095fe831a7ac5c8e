//! iamusersync: keep a local group and its members' SSH keys in step with a
//! directory.
//!
//! # Usage
//!
//! ```text
//! iamusersync run    [--config <file>] [overrides...] [--json]
//! iamusersync plan   [--config <file>] [overrides...] [--json]
//! iamusersync config [--config <file>] [overrides...]
//! ```
//!
//! Overrides: `--group`, `--keep-home-dir`, `--logfile`, `--home-root`,
//! `--provider`, `--credentials`, `--gsuiteadmin`, `--oauthdomain`,
//! `--customattributekey`.

mod commands;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{config::ConfigCommandArgs, plan::PlanArgs, run::RunArgs};

#[derive(Parser, Debug)]
#[command(
    name = "iamusersync",
    version,
    about = "Sync a local group and SSH authorized_keys with a user directory",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile local accounts with the directory (needs root).
    Run(RunArgs),

    /// Show what a run would add, repair and remove, without changing anything.
    Plan(PlanArgs),

    /// Print the resolved configuration.
    Config(ConfigCommandArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Plan(args) => args.run(),
        Commands::Config(args) => args.run(),
    }
}
