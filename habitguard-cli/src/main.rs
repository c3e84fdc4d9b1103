//! HabitGuard: blocks distracting sites through the hosts file while habit
//! tasks are overdue.
//!
//! # Usage
//!
//! ```text
//! habitguard init [--force]
//! habitguard status [--json]
//! habitguard diff
//! habitguard restore [--from-backup]
//! habitguard daemon start [--json-logs]
//! habitguard daemon ping|refresh|reset|status
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    daemon::DaemonCommand, diff::DiffArgs, init::InitArgs, restore::RestoreArgs,
    status::StatusArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "habitguard",
    version,
    about = "Block distracting websites until today's habits are done",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default config to ~/.habitguard/config.yaml.
    Init(InitArgs),

    /// Evaluate tasks now and show what should be blocked.
    Status(StatusArgs),

    /// Show a unified diff of what the next evaluation would write.
    Diff(DiffArgs),

    /// Remove the managed block from the hosts file without a daemon.
    Restore(RestoreArgs),

    /// Run or talk to the enforcement daemon.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Restore(args) => args.run(),
        Commands::Daemon { command } => commands::daemon::run(command),
    }
}
